//! PostgreSQL persistence adapter using Diesel ORM.
//!
//! Connections come from a `bb8` pool through `diesel-async`. Diesel row
//! structs (`models.rs`) and the schema (`schema.rs`) are internal; only
//! domain types cross the port boundary.
//!
//! # Example
//!
//! ```ignore
//! use tracker_backend::outbound::persistence::{DbPool, DieselDeviceStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/tracker")).await?;
//! let store = DieselDeviceStore::new(pool);
//! ```

mod diesel_device_store;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_device_store::DieselDeviceStore;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
