//! Port for administrative mutations of the device store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    AccountId, CommandRecord, ConfigHistoryEntry, Configuration, Device, DeviceCommand, DeviceId,
    DeviceState,
};

use super::DeviceStoreError;

/// Store operations backing fleet administration.
///
/// Mutations addressing an unknown device fail with
/// [`DeviceStoreError::NotFound`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FleetAdministrationRepository: Send + Sync {
    /// Insert a new device, failing with [`DeviceStoreError::Duplicate`] when
    /// the identifier is taken.
    async fn insert_device(&self, state: DeviceState) -> Result<Device, DeviceStoreError>;

    /// Queue a command, replacing any undelivered one.
    async fn set_pending_command(
        &self,
        id: &DeviceId,
        command: DeviceCommand,
    ) -> Result<(), DeviceStoreError>;

    /// Store the configuration, append it to the history, point the device at
    /// it and raise the dirty flag, all in one unit.
    async fn push_configuration(
        &self,
        id: &DeviceId,
        configuration: Configuration,
        pushed_at: DateTime<Utc>,
    ) -> Result<(), DeviceStoreError>;

    /// Set the owning account.
    async fn set_owner(&self, id: &DeviceId, owner: AccountId) -> Result<(), DeviceStoreError>;

    /// Delivered commands, oldest first.
    async fn command_history(&self, id: &DeviceId)
    -> Result<Vec<CommandRecord>, DeviceStoreError>;

    /// Pushed configurations, oldest first.
    async fn config_history(
        &self,
        id: &DeviceId,
    ) -> Result<Vec<ConfigHistoryEntry>, DeviceStoreError>;
}
