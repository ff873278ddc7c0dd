//! Port for store reachability checks used by the readiness probe.

use async_trait::async_trait;

use super::DeviceStoreError;

/// Cheap round trip to the device store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StoreHealth: Send + Sync {
    /// Succeeds when the store can serve a query right now.
    async fn ping(&self) -> Result<(), DeviceStoreError>;
}
