//! Fleet administration service.
//!
//! Implements the [`FleetAdministration`] driving port consumed by the
//! account-facing admin layer. It owns the role checks and the validation of
//! administrative input; persistence is delegated to the repository port.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{DeviceStoreError, FleetAdministration, FleetAdministrationRepository};
use crate::domain::{
    Account, AccountId, CommandRecord, ConfigHistoryEntry, Configuration, ConfigurationDocument,
    ConfigurationId, Device, DeviceCommand, DeviceId, DeviceKey, DeviceState, Error,
};

/// Service behind the administrative mutators.
#[derive(Clone)]
pub struct FleetAdministrationService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> FleetAdministrationService<R> {
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

impl<R> FleetAdministrationService<R>
where
    R: FleetAdministrationRepository,
{
    fn map_repo_error(error: DeviceStoreError) -> Error {
        match error {
            DeviceStoreError::Connection { message } => {
                Error::service_unavailable(format!("device store unavailable: {message}"))
            }
            DeviceStoreError::NotFound { device_id } => Error::device_not_found("Device Not Found")
                .with_details(json!({ "deviceId": device_id })),
            DeviceStoreError::Duplicate { device_id } => {
                Error::conflict("Device already registered")
                    .with_details(json!({ "deviceId": device_id }))
            }
            DeviceStoreError::Query { message } | DeviceStoreError::Corrupt { message } => {
                Error::internal(format!("device store error: {message}"))
            }
        }
    }

    fn require(allowed: bool, issuer: &Account, action: &'static str) -> Result<(), Error> {
        if allowed {
            return Ok(());
        }
        warn!(issuer = %issuer.id(), role = ?issuer.role(), action, "administrative action refused");
        Err(Error::forbidden("Resource forbidden"))
    }
}

#[async_trait]
impl<R> FleetAdministration for FleetAdministrationService<R>
where
    R: FleetAdministrationRepository,
{
    async fn provision_device(&self, device_id: DeviceId, key: DeviceKey) -> Result<Device, Error> {
        let fingerprint = key.fingerprint();
        let device = self
            .repo
            .insert_device(DeviceState::provisioned(device_id, key))
            .await
            .map_err(Self::map_repo_error)?;
        info!(device_id = %device.id(), key_fingerprint = %fingerprint, "device provisioned");
        Ok(device)
    }

    async fn issue_command(
        &self,
        issuer: &Account,
        device_id: &DeviceId,
        command: String,
    ) -> Result<(), Error> {
        Self::require(issuer.can_manage_devices(), issuer, "issue_command")?;
        let command = DeviceCommand::new(command)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        self.repo
            .set_pending_command(device_id, command)
            .await
            .map_err(Self::map_repo_error)?;
        info!(device_id = %device_id, issuer = %issuer.id(), "command queued");
        Ok(())
    }

    async fn push_configuration(
        &self,
        issuer: &Account,
        device_id: &DeviceId,
        document: ConfigurationDocument,
    ) -> Result<Configuration, Error> {
        Self::require(issuer.can_manage_devices(), issuer, "push_configuration")?;
        document
            .validate()
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        let now = self.clock.utc();
        let configuration = Configuration {
            id: ConfigurationId::random(),
            created_at: now,
            document,
        };
        self.repo
            .push_configuration(device_id, configuration.clone(), now)
            .await
            .map_err(Self::map_repo_error)?;
        info!(
            device_id = %device_id,
            configuration_id = %configuration.id,
            issuer = %issuer.id(),
            "configuration pushed"
        );
        Ok(configuration)
    }

    async fn assign_owner(
        &self,
        issuer: &Account,
        device_id: &DeviceId,
        owner: AccountId,
    ) -> Result<(), Error> {
        Self::require(issuer.can_assign_owners(), issuer, "assign_owner")?;
        self.repo
            .set_owner(device_id, owner)
            .await
            .map_err(Self::map_repo_error)?;
        info!(device_id = %device_id, owner = %owner, "owner assigned");
        Ok(())
    }

    async fn command_history(
        &self,
        issuer: &Account,
        device_id: &DeviceId,
    ) -> Result<Vec<CommandRecord>, Error> {
        Self::require(issuer.can_manage_devices(), issuer, "command_history")?;
        self.repo
            .command_history(device_id)
            .await
            .map_err(Self::map_repo_error)
    }

    async fn config_history(
        &self,
        issuer: &Account,
        device_id: &DeviceId,
    ) -> Result<Vec<ConfigHistoryEntry>, Error> {
        Self::require(issuer.can_manage_devices(), issuer, "config_history")?;
        self.repo
            .config_history(device_id)
            .await
            .map_err(Self::map_repo_error)
    }
}

#[cfg(test)]
#[path = "administration_tests.rs"]
mod tests;
