//! Database facade library.
//!
//! Named-parameter SQL over MySQL, PostgreSQL and SQLite pools, callable from
//! async or blocking code, with every statement written to an audit log. Also
//! provides a Redis cache client and a small HTTP surface.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;

pub use cache::CacheClient;
pub use config::Config;
pub use db::{AsyncFacade, AuditLogger, BlockingFacade, Facade};
pub use error::{DbError, DbResult};
