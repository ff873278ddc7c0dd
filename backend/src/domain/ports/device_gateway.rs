//! Driving port for the encrypted device protocol.
//!
//! Inbound adapters translate transport requests into a [`GatewayRequest`]
//! and hand back the sealed envelope. Every response is encrypted under the
//! addressed device's key; only errors travel in the clear.

use async_trait::async_trait;

use crate::domain::Error;
use crate::domain::envelope::WireEnvelope;

/// Envelope fields exactly as received; either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeFields {
    pub iv: Option<String>,
    pub cipher_text: Option<String>,
}

/// Protocol operation requested by a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOperation {
    /// Encrypted `{lat, lon, hdop}` telemetry.
    ReportLocation(EnvelopeFields),
    /// Fetch and acknowledge the pending command.
    PollCommand,
    /// Fetch the current configuration if it changed since the last sync.
    PollConfiguration,
    /// Ask whether a configuration sync is pending without consuming it.
    CheckConfiguration,
}

/// One device call: the raw path identifier plus the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRequest {
    pub device_id: String,
    pub operation: GatewayOperation,
}

impl GatewayRequest {
    pub fn new(device_id: impl Into<String>, operation: GatewayOperation) -> Self {
        Self {
            device_id: device_id.into(),
            operation,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceGateway: Send + Sync {
    /// Authenticate, dispatch and seal one device request.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` for a blank or malformed identifier or envelope.
    /// - `DeviceNotFound` when the device is unknown, keyless, or (for
    ///   telemetry) has no owner.
    /// - `DecryptionFailed` when the envelope does not open under the key.
    /// - `EncodingFailure` when the response cannot be sealed.
    /// - `ServiceUnavailable` or `InternalError` for store failures.
    async fn handle(&self, request: GatewayRequest) -> Result<WireEnvelope, Error>;
}
