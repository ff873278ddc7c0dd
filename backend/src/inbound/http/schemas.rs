//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay framework-agnostic by not deriving `ToSchema`. The
//! wrappers here mirror their structure and register under the domain path.

use serde::Serialize;
use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema, Serialize)]
#[schema(as = crate::domain::ErrorCode)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCodeSchema {
    /// The identifier or envelope is missing fields or malformed.
    InvalidRequest,
    /// The envelope did not decrypt under the device key.
    DecryptionFailed,
    /// The issuing account may not perform the action.
    Forbidden,
    /// The device is unknown, keyless, or ownerless for telemetry.
    DeviceNotFound,
    /// The mutation clashes with existing state.
    Conflict,
    /// The response could not be sealed.
    EncodingFailure,
    /// A backing store is unreachable.
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
///
/// Error bodies are always plain JSON, never sealed.
#[derive(ToSchema, Serialize)]
#[schema(as = crate::domain::Error)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code, reason = "Used only for OpenAPI schema generation via utoipa")]
pub struct ErrorSchema {
    /// Human-readable message.
    #[schema(example = "Device Not Found")]
    error: String,
    /// Stable machine-readable error code.
    #[schema(example = "device_not_found")]
    code: ErrorCodeSchema,
    /// Correlation identifier echoed in the `trace-id` header.
    #[schema(example = "3f2504e0-4f89-41d3-9a0c-0305e82c3301")]
    trace_id: Option<String>,
    /// Supplementary error details.
    details: Option<serde_json::Value>,
}

/// OpenAPI schema for [`crate::domain::envelope::WireEnvelope`].
///
/// Every successful device response is one of these, sealed under the
/// device key.
#[derive(ToSchema, Serialize)]
#[schema(as = crate::domain::envelope::WireEnvelope)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code, reason = "Used only for OpenAPI schema generation via utoipa")]
pub struct WireEnvelopeSchema {
    /// Base64 of the 16-byte initialisation vector.
    #[schema(example = "AAECAwQFBgcICQoLDA0ODw==")]
    iv: String,
    /// Base64 of the AES-128-CBC ciphertext.
    cipher_text: String,
}
