//! Data models for the database facade.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod page;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionConfig, ConnectionConfigError, DatabaseType};
pub use page::PageSpec;
pub use query::{Params, QueryParam, Row, format_params};
