//! Device gateway pipeline.
//!
//! `decode envelope -> authenticate -> decrypt -> dispatch -> mutate ->
//! encode -> encrypt`. Each stage is its own type so the ordering is visible
//! in [`DeviceGatewayService::handle`](crate::domain::ports::DeviceGateway::handle)
//! and each stage can be tested alone.

mod authentication;
mod protocol;
mod response;
mod service;

pub use authentication::{AuthenticatedDevice, AuthenticatedRequest, RequestAuthenticator};
pub use protocol::{DeviceProtocolService, ProtocolResponse};
pub use response::ResponseSealer;
pub use service::DeviceGatewayService;

use tracing::error;

use crate::domain::Error;
use crate::domain::ports::DeviceStoreError;

pub(crate) const DEVICE_NOT_FOUND: &str = "Device Not Found";
pub(crate) const INVALID_DEVICE_REQUEST: &str = "Invalid device request";

pub(crate) fn map_store_error(error: DeviceStoreError) -> Error {
    match error {
        DeviceStoreError::Connection { message } => {
            error!(%message, "device store unavailable");
            Error::service_unavailable(format!("device store unavailable: {message}"))
        }
        DeviceStoreError::NotFound { .. } => Error::device_not_found(DEVICE_NOT_FOUND),
        other => {
            error!(error = %other, "device store failure");
            Error::internal(format!("device store error: {other}"))
        }
    }
}
