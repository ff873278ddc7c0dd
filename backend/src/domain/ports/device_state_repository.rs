//! Port for the atomic mutations performed by the device protocol.
//!
//! Each method is one atomic unit. Adapters must serialise concurrent calls
//! for the same device (row lock or equivalent) so that two overlapping polls
//! can never both observe the same pending command or dirty flag.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Configuration, DeviceId, Location, LocationReading};

use super::DeviceStoreError;

/// Result of an atomic read-and-clear of the configuration dirty flag.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationSync {
    /// The device already holds its current configuration.
    UpToDate,
    /// The flag was set and has been cleared; deliver this configuration.
    Updated(Configuration),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceStateRepository: Send + Sync {
    /// Insert a location and point the device at it, stamping `last_seen_at`.
    ///
    /// Ownership is re-checked under the lock. Returns `None` when the device
    /// has disappeared or has no owner; nothing is written in that case.
    async fn record_location(
        &self,
        id: &DeviceId,
        reading: LocationReading,
        recorded_at: DateTime<Utc>,
    ) -> Result<Option<Location>, DeviceStoreError>;

    /// Compare-and-clear the pending command, logging it as delivered.
    ///
    /// Returns the command that was pending, if any. History is only
    /// appended when a command was present.
    async fn take_pending_command(
        &self,
        id: &DeviceId,
        delivered_at: DateTime<Utc>,
    ) -> Result<Option<String>, DeviceStoreError>;

    /// Read-and-clear the configuration dirty flag.
    ///
    /// The current configuration pointer is left untouched.
    async fn take_configuration_update(
        &self,
        id: &DeviceId,
    ) -> Result<ConfigurationSync, DeviceStoreError>;
}
