//! # Database Crate
//!
//! The data-access layer of the users/groups service, on top of MariaDB/MySQL.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** This crate encapsulates all SQL. The web layer talks to
//!   `DbRepository` and never sees a query string.
//! - **Bound parameters:** Every value that originates from a request is bound,
//!   never formatted into SQL text. Only fixed table names and the validated
//!   database name are interpolated.
//! - **Asynchronous & Pooled:** All operations are asynchronous and check out a
//!   connection from a bounded `MySqlPool` for the duration of one call.
//!
//! ## Public API
//!
//! - `connect`: builds the lazy connection pool.
//! - `wait_ready` / `bootstrap`: the startup gate and schema bootstrap sequence.
//! - `ensure_schema`: idempotently creates the database and its tables.
//! - `DbRepository`: users, groups and memberships.
//! - `DbError`: the error type returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;
pub mod schema;
pub mod startup;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, ping, select_database, DatabaseName};
pub use error::DbError;
pub use repository::{DbRepository, Entity};
pub use schema::{bootstrap_statements, ensure_schema, SchemaOptions};
pub use startup::{bootstrap, wait_ready};
