//! Per-entity database query modules

pub mod books;
pub mod imports;
pub mod leads;
pub mod notifications;
pub mod royalties;
pub mod stages;
pub mod users;
