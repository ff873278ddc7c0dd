//! Response encryption stage.

use tracing::error;

use crate::domain::envelope::{WireEnvelope, seal_json};
use crate::domain::{DeviceKey, Error};

use super::INVALID_DEVICE_REQUEST;
use super::protocol::ProtocolResponse;

/// Serialises handler output and seals it under the device key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseSealer;

impl ResponseSealer {
    /// Encrypt `response` with a fresh IV.
    ///
    /// A missing key means the pipeline was assembled wrongly and is reported
    /// as `InvalidRequest`. Codec failures surface as an opaque
    /// `EncodingFailure`.
    pub fn seal(
        &self,
        response: &ProtocolResponse,
        key: Option<&DeviceKey>,
    ) -> Result<WireEnvelope, Error> {
        let Some(key) = key else {
            return Err(Error::invalid_request(INVALID_DEVICE_REQUEST));
        };
        seal_json(response, key)
            .map(|envelope| envelope.to_wire())
            .map_err(|err| {
                error!(key_fingerprint = %key.fingerprint(), reason = %err, "failed to seal response");
                Error::encoding_failure(format!("failed to seal response: {err}"))
            })
    }
}
