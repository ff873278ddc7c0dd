//! Driving port consumed by the fleet administration layer.

use async_trait::async_trait;

use crate::domain::{
    Account, AccountId, CommandRecord, ConfigHistoryEntry, Configuration, ConfigurationDocument,
    Device, DeviceId, DeviceKey, Error,
};

/// Administrative mutations feeding the device protocol.
///
/// Role checks happen here, not in the caller: commands, configuration pushes
/// and history reads need [`Account::can_manage_devices`], owner assignment
/// needs [`Account::can_assign_owners`]. Anything else is `Forbidden`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FleetAdministration: Send + Sync {
    /// Register a device with its out-of-band key. `Conflict` if it exists.
    async fn provision_device(&self, device_id: DeviceId, key: DeviceKey) -> Result<Device, Error>;

    /// Queue a command for the next poll, replacing any undelivered one.
    async fn issue_command(
        &self,
        issuer: &Account,
        device_id: &DeviceId,
        command: String,
    ) -> Result<(), Error>;

    /// Store a new configuration and flag the device for sync.
    async fn push_configuration(
        &self,
        issuer: &Account,
        device_id: &DeviceId,
        document: ConfigurationDocument,
    ) -> Result<Configuration, Error>;

    /// Assign the owning account.
    async fn assign_owner(
        &self,
        issuer: &Account,
        device_id: &DeviceId,
        owner: AccountId,
    ) -> Result<(), Error>;

    /// Delivered commands, oldest first.
    async fn command_history(
        &self,
        issuer: &Account,
        device_id: &DeviceId,
    ) -> Result<Vec<CommandRecord>, Error>;

    /// Pushed configurations, oldest first.
    async fn config_history(
        &self,
        issuer: &Account,
        device_id: &DeviceId,
    ) -> Result<Vec<ConfigHistoryEntry>, Error>;
}
