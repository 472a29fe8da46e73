//! # Analytics Database Crate
//!
//! The SQLite-backed record store. It owns the `records` and
//! `custom_field_definitions` tables and answers fetches from the query
//! executor by compiling them to parameterised SQL.
//!
//! ## Public API
//!
//! - `connect` / `connect_from_env`: open the connection pool.
//! - `run_migrations`: apply the embedded schema migrations.
//! - `DbRepository`: implements `RecordStore` and `FieldCatalog`, plus the
//!   write operations used by the `import` command.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;
pub mod sql;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, connect_from_env, connect_with, run_migrations};
pub use error::DbError;
pub use repository::{DbRepository, NewRecord};
