mod config;

pub mod aggregate;
pub mod builder;
pub mod geography;
pub mod manual;
pub mod modes;
pub mod party;
pub mod store;
pub mod winner;

pub use crate::config::*;
pub use crate::geography::GeographyTables;
pub use crate::store::ResultStore;
