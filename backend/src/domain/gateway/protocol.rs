//! Protocol handlers for location ingestion, command delivery and
//! configuration synchronisation.
//!
//! Handlers receive an already authenticated device and return a plaintext
//! [`ProtocolResponse`]; they never touch the codec.

use std::sync::Arc;

use mockable::Clock;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::ports::{ConfigurationSync, DeviceStateRepository};
use crate::domain::{ConfigurationDocument, Device, Error, LocationReading};

use super::authentication::AuthenticatedRequest;
use super::{DEVICE_NOT_FOUND, INVALID_DEVICE_REQUEST, map_store_error};

/// Plaintext body handed to the response sealer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProtocolResponse {
    /// `{message}` acknowledgement.
    Message { message: String },
    /// `{lastCommand}`; `null` when nothing was pending.
    Command {
        #[serde(rename = "lastCommand")]
        last_command: Option<String>,
    },
    /// Full configuration content.
    Configuration(ConfigurationDocument),
    /// `{isNewConfig}` check result.
    ConfigurationStatus {
        #[serde(rename = "isNewConfig")]
        is_new_config: bool,
    },
}

impl ProtocolResponse {
    fn message(message: &str) -> Self {
        Self::Message {
            message: message.to_owned(),
        }
    }
}

/// Acknowledgement returned after a stored reading.
pub const LOCATION_ACCEPTED: &str = "ok";
/// Reply to a config poll when nothing changed.
pub const NO_NEW_CONFIGURATION: &str = "no new configuration";

/// Stateful protocol handlers backed by the device state repository.
pub struct DeviceProtocolService<S> {
    state: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> Clone for DeviceProtocolService<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<S> DeviceProtocolService<S>
where
    S: DeviceStateRepository,
{
    pub fn new(state: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { state, clock }
    }

    /// Persist a telemetry reading from an owned device.
    ///
    /// Ownerless devices are answered exactly like unknown ones so a caller
    /// holding only a key learns nothing about registration state.
    pub async fn ingest_location(
        &self,
        request: &AuthenticatedRequest,
    ) -> Result<ProtocolResponse, Error> {
        let device_id = request.device.id();
        if request.device.owner().is_none() {
            info!(device_id = %device_id, "telemetry from ownerless device rejected");
            return Err(Error::device_not_found(DEVICE_NOT_FOUND));
        }
        let reading = LocationReading::from_payload(request.payload.clone()).map_err(|err| {
            info!(device_id = %device_id, reason = %err, "invalid location payload");
            Error::invalid_request(INVALID_DEVICE_REQUEST)
        })?;

        let stored = self
            .state
            .record_location(device_id, reading, self.clock.utc())
            .await
            .map_err(map_store_error)?;
        let Some(location) = stored else {
            info!(device_id = %device_id, "device lost its owner before ingestion");
            return Err(Error::device_not_found(DEVICE_NOT_FOUND));
        };
        debug!(device_id = %device_id, location_id = %location.id, "location stored");
        Ok(ProtocolResponse::message(LOCATION_ACCEPTED))
    }

    /// Deliver the pending command at most once.
    pub async fn deliver_command(&self, device: &Device) -> Result<ProtocolResponse, Error> {
        let command = self
            .state
            .take_pending_command(device.id(), self.clock.utc())
            .await
            .map_err(map_store_error)?;
        match &command {
            Some(command) => debug!(device_id = %device.id(), %command, "command delivered"),
            None => debug!(device_id = %device.id(), "no pending command"),
        }
        Ok(ProtocolResponse::Command {
            last_command: command,
        })
    }

    /// Deliver the current configuration if the device has not fetched it.
    pub async fn synchronise_configuration(
        &self,
        device: &Device,
    ) -> Result<ProtocolResponse, Error> {
        let sync = self
            .state
            .take_configuration_update(device.id())
            .await
            .map_err(map_store_error)?;
        match sync {
            ConfigurationSync::UpToDate => Ok(ProtocolResponse::message(NO_NEW_CONFIGURATION)),
            ConfigurationSync::Updated(configuration) => {
                debug!(
                    device_id = %device.id(),
                    configuration_id = %configuration.id,
                    "configuration delivered"
                );
                Ok(ProtocolResponse::Configuration(configuration.document))
            }
        }
    }

    /// Report whether a configuration sync is pending. Read only.
    pub fn check_configuration(&self, device: &Device) -> ProtocolResponse {
        ProtocolResponse::ConfigurationStatus {
            is_new_config: device.config_dirty(),
        }
    }
}
