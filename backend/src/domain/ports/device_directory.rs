//! Port for read-only device lookups.

use async_trait::async_trait;

use crate::domain::{Device, DeviceId};

use super::DeviceStoreError;

/// Read-only view of device records used by request authentication.
///
/// Lookups never mutate state and may run concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// Fetch a device by identifier.
    async fn find_by_device_id(&self, id: &DeviceId) -> Result<Option<Device>, DeviceStoreError>;

    /// Fetch a device by identifier, only when it has an owner.
    async fn find_owned_by_device_id(
        &self,
        id: &DeviceId,
    ) -> Result<Option<Device>, DeviceStoreError>;
}
