//! # PressOps Common Library
//!
//! Shared code for the PressOps publishing-operations backend:
//! - Database schema initialization and row models
//! - Error types
//! - Typed site settings

pub mod db;
pub mod error;
pub mod settings;

pub use error::{Error, Result};
