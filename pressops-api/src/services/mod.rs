//! Core business services
//!
//! Each service executes against the relational store and is consumed
//! by the HTTP handlers in `crate::api`. The import pipeline calls into
//! the identity and royalty services; nothing else is cross-wired.

pub mod identity;
pub mod import;
pub mod leads;
pub mod royalty;
pub mod stages;
