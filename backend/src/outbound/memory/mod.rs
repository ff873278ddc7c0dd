//! In-process device store.
//!
//! Backs development runs without a database and the integration tests. One
//! mutex guards the whole store and is held for each complete operation,
//! which gives every port method the same atomicity the PostgreSQL adapter
//! gets from row locks.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    ConfigurationSync, DeviceDirectory, DeviceStateRepository, DeviceStoreError,
    FleetAdministrationRepository, StoreHealth,
};
use crate::domain::{
    AccountId, CommandRecord, ConfigHistoryEntry, Configuration, ConfigurationId, Device,
    DeviceCommand, DeviceId, DeviceState, Location, LocationId, LocationReading,
};

#[derive(Default)]
struct StoreState {
    devices: HashMap<DeviceId, DeviceState>,
    configurations: HashMap<ConfigurationId, Configuration>,
    command_history: HashMap<DeviceId, Vec<CommandRecord>>,
    config_history: HashMap<DeviceId, Vec<ConfigHistoryEntry>>,
    locations: Vec<Location>,
}

impl StoreState {
    fn device_mut(&mut self, id: &DeviceId) -> Result<&mut DeviceState, DeviceStoreError> {
        self.devices
            .get_mut(id)
            .ok_or_else(|| DeviceStoreError::not_found(id.as_str()))
    }
}

/// Mutex-guarded store implementing every device port.
#[derive(Default)]
pub struct InMemoryDeviceStore {
    state: Mutex<StoreState>,
}

impl InMemoryDeviceStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, DeviceStoreError> {
        self.state
            .lock()
            .map_err(|_| DeviceStoreError::query("in-memory device store lock poisoned"))
    }

    /// Locations recorded for a device, oldest first.
    pub fn locations_for(&self, id: &DeviceId) -> Result<Vec<Location>, DeviceStoreError> {
        let state = self.lock()?;
        Ok(state
            .locations
            .iter()
            .filter(|location| &location.device_id == id)
            .cloned()
            .collect())
    }
}

fn to_device(state: &DeviceState) -> Result<Device, DeviceStoreError> {
    Device::try_from(state.clone()).map_err(|err| DeviceStoreError::corrupt(err.to_string()))
}

#[async_trait]
impl StoreHealth for InMemoryDeviceStore {
    async fn ping(&self) -> Result<(), DeviceStoreError> {
        self.lock().map(|_| ())
    }
}

#[async_trait]
impl DeviceDirectory for InMemoryDeviceStore {
    async fn find_by_device_id(&self, id: &DeviceId) -> Result<Option<Device>, DeviceStoreError> {
        let state = self.lock()?;
        state.devices.get(id).map(to_device).transpose()
    }

    async fn find_owned_by_device_id(
        &self,
        id: &DeviceId,
    ) -> Result<Option<Device>, DeviceStoreError> {
        let state = self.lock()?;
        state
            .devices
            .get(id)
            .filter(|device| device.owner.is_some())
            .map(to_device)
            .transpose()
    }
}

#[async_trait]
impl DeviceStateRepository for InMemoryDeviceStore {
    async fn record_location(
        &self,
        id: &DeviceId,
        reading: LocationReading,
        recorded_at: DateTime<Utc>,
    ) -> Result<Option<Location>, DeviceStoreError> {
        let mut state = self.lock()?;
        let Some(device) = state.devices.get_mut(id) else {
            return Ok(None);
        };
        let Some(owner) = device.owner else {
            return Ok(None);
        };
        let location = Location {
            id: LocationId::random(),
            device_id: id.clone(),
            owner,
            reading,
            recorded_at,
        };
        device.last_known_location = Some(location.id);
        device.last_seen_at = Some(recorded_at);
        state.locations.push(location.clone());
        Ok(Some(location))
    }

    async fn take_pending_command(
        &self,
        id: &DeviceId,
        delivered_at: DateTime<Utc>,
    ) -> Result<Option<String>, DeviceStoreError> {
        let mut state = self.lock()?;
        let Some(command) = state.device_mut(id)?.pending_command.take() else {
            return Ok(None);
        };
        state
            .command_history
            .entry(id.clone())
            .or_default()
            .push(CommandRecord {
                command: command.clone(),
                delivered_at,
            });
        Ok(Some(command))
    }

    async fn take_configuration_update(
        &self,
        id: &DeviceId,
    ) -> Result<ConfigurationSync, DeviceStoreError> {
        let mut state = self.lock()?;
        let device = state.device_mut(id)?;
        if !device.config_dirty {
            return Ok(ConfigurationSync::UpToDate);
        }
        let Some(config_id) = device.current_config_id else {
            return Err(DeviceStoreError::corrupt(format!(
                "device {id} is flagged for sync without a configuration"
            )));
        };
        let configuration = state.configurations.get(&config_id).cloned().ok_or_else(|| {
            DeviceStoreError::corrupt(format!("configuration {config_id} is missing"))
        })?;
        state.device_mut(id)?.config_dirty = false;
        Ok(ConfigurationSync::Updated(configuration))
    }
}

#[async_trait]
impl FleetAdministrationRepository for InMemoryDeviceStore {
    async fn insert_device(&self, device: DeviceState) -> Result<Device, DeviceStoreError> {
        let mut state = self.lock()?;
        if state.devices.contains_key(&device.id) {
            return Err(DeviceStoreError::duplicate(device.id.as_str()));
        }
        let created = to_device(&device)?;
        state.devices.insert(device.id.clone(), device);
        Ok(created)
    }

    async fn set_pending_command(
        &self,
        id: &DeviceId,
        command: DeviceCommand,
    ) -> Result<(), DeviceStoreError> {
        let mut state = self.lock()?;
        state.device_mut(id)?.pending_command = Some(command.into());
        Ok(())
    }

    async fn push_configuration(
        &self,
        id: &DeviceId,
        configuration: Configuration,
        pushed_at: DateTime<Utc>,
    ) -> Result<(), DeviceStoreError> {
        let mut state = self.lock()?;
        let device = state.device_mut(id)?;
        device.current_config_id = Some(configuration.id);
        device.config_dirty = true;
        state
            .config_history
            .entry(id.clone())
            .or_default()
            .push(ConfigHistoryEntry {
                configuration_id: configuration.id,
                pushed_at,
            });
        state.configurations.insert(configuration.id, configuration);
        Ok(())
    }

    async fn set_owner(&self, id: &DeviceId, owner: AccountId) -> Result<(), DeviceStoreError> {
        let mut state = self.lock()?;
        state.device_mut(id)?.owner = Some(owner);
        Ok(())
    }

    async fn command_history(
        &self,
        id: &DeviceId,
    ) -> Result<Vec<CommandRecord>, DeviceStoreError> {
        let state = self.lock()?;
        if !state.devices.contains_key(id) {
            return Err(DeviceStoreError::not_found(id.as_str()));
        }
        Ok(state.command_history.get(id).cloned().unwrap_or_default())
    }

    async fn config_history(
        &self,
        id: &DeviceId,
    ) -> Result<Vec<ConfigHistoryEntry>, DeviceStoreError> {
        let state = self.lock()?;
        if !state.devices.contains_key(id) {
            return Err(DeviceStoreError::not_found(id.as_str()));
        }
        Ok(state.config_history.get(id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests;
