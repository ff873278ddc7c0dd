//! Device protocol HTTP handlers.
//!
//! ```text
//! POST /device/{deviceId}/location
//! GET  /device/{deviceId}/command
//! GET  /device/{deviceId}/config
//! GET  /device/{deviceId}/config/check-new-config
//! ```
//!
//! Handlers only translate the transport shape into a
//! [`GatewayRequest`]. Identifier validation, authentication and sealing all
//! happen behind the [`DeviceGateway`](crate::domain::ports::DeviceGateway)
//! port.

use actix_web::{get, post, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::domain::envelope::WireEnvelope;
use crate::domain::ports::{EnvelopeFields, GatewayOperation, GatewayRequest};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::{ErrorSchema, WireEnvelopeSchema};
use crate::inbound::http::state::HttpState;

/// Encrypted request body. Fields are optional here so a missing field is
/// reported as an invalid request rather than a framework parse error.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeRequest {
    /// Base64 of the 16-byte initialisation vector.
    pub iv: Option<String>,
    /// Base64 of the AES-128-CBC ciphertext of `{lat, lon, hdop}`.
    pub cipher_text: Option<String>,
}

impl From<EnvelopeRequest> for EnvelopeFields {
    fn from(value: EnvelopeRequest) -> Self {
        Self {
            iv: value.iv,
            cipher_text: value.cipher_text,
        }
    }
}

async fn dispatch(
    state: &HttpState,
    device_id: String,
    operation: GatewayOperation,
) -> ApiResult<web::Json<WireEnvelope>> {
    state
        .gateway
        .handle(GatewayRequest::new(device_id, operation))
        .await
        .map(web::Json)
}

/// Ingest an encrypted location reading.
#[utoipa::path(
    post,
    path = "/device/{deviceId}/location",
    params(("deviceId" = String, Path, description = "Firmware-reported device identifier")),
    request_body = EnvelopeRequest,
    responses(
        (status = 200, description = "Sealed `{message}` acknowledgement", body = WireEnvelopeSchema),
        (status = 400, description = "Malformed identifier or envelope", body = ErrorSchema),
        (status = 401, description = "Envelope did not decrypt under the device key", body = ErrorSchema),
        (status = 404, description = "Unknown, keyless or ownerless device", body = ErrorSchema),
        (status = 503, description = "Device store unavailable", body = ErrorSchema)
    ),
    tags = ["devices"],
    operation_id = "reportLocation"
)]
#[post("/device/{device_id}/location")]
pub async fn report_location(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: Option<web::Json<EnvelopeRequest>>,
) -> ApiResult<web::Json<WireEnvelope>> {
    let fields = payload
        .map(|body| EnvelopeFields::from(body.into_inner()))
        .unwrap_or_default();
    dispatch(
        &state,
        path.into_inner(),
        GatewayOperation::ReportLocation(fields),
    )
    .await
}

/// Deliver and acknowledge the pending command.
#[utoipa::path(
    get,
    path = "/device/{deviceId}/command",
    params(("deviceId" = String, Path, description = "Firmware-reported device identifier")),
    responses(
        (status = 200, description = "Sealed `{lastCommand}`", body = WireEnvelopeSchema),
        (status = 400, description = "Malformed identifier", body = ErrorSchema),
        (status = 404, description = "Unknown or keyless device", body = ErrorSchema),
        (status = 503, description = "Device store unavailable", body = ErrorSchema)
    ),
    tags = ["devices"],
    operation_id = "pollCommand"
)]
#[get("/device/{device_id}/command")]
pub async fn poll_command(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<WireEnvelope>> {
    dispatch(&state, path.into_inner(), GatewayOperation::PollCommand).await
}

/// Fetch the current configuration when it changed since the last sync.
#[utoipa::path(
    get,
    path = "/device/{deviceId}/config",
    params(("deviceId" = String, Path, description = "Firmware-reported device identifier")),
    responses(
        (status = 200, description = "Sealed configuration fields or `{message}`", body = WireEnvelopeSchema),
        (status = 400, description = "Malformed identifier", body = ErrorSchema),
        (status = 404, description = "Unknown or keyless device", body = ErrorSchema),
        (status = 503, description = "Device store unavailable", body = ErrorSchema)
    ),
    tags = ["devices"],
    operation_id = "pollConfiguration"
)]
#[get("/device/{device_id}/config")]
pub async fn poll_configuration(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<WireEnvelope>> {
    dispatch(&state, path.into_inner(), GatewayOperation::PollConfiguration).await
}

/// Report whether a configuration sync is pending without consuming it.
#[utoipa::path(
    get,
    path = "/device/{deviceId}/config/check-new-config",
    params(("deviceId" = String, Path, description = "Firmware-reported device identifier")),
    responses(
        (status = 200, description = "Sealed `{isNewConfig}`", body = WireEnvelopeSchema),
        (status = 400, description = "Malformed identifier", body = ErrorSchema),
        (status = 404, description = "Unknown or keyless device", body = ErrorSchema),
        (status = 503, description = "Device store unavailable", body = ErrorSchema)
    ),
    tags = ["devices"],
    operation_id = "checkConfiguration"
)]
#[get("/device/{device_id}/config/check-new-config")]
pub async fn check_configuration(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<WireEnvelope>> {
    dispatch(&state, path.into_inner(), GatewayOperation::CheckConfiguration).await
}

/// Register every device route on a service config.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(report_location)
        .service(check_configuration)
        .service(poll_configuration)
        .service(poll_command);
}
