//! Outbound adapters implementing the device store ports.
//!
//! - **persistence**: PostgreSQL-backed store using Diesel ORM
//! - **memory**: process-local store for tests and database-less runs
//!
//! Adapters translate between domain types and storage representations and
//! hold no business logic beyond the row locking each port requires.

pub mod memory;
pub mod persistence;
