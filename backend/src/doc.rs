//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers the device protocol and health paths together with
//! the schema wrappers from [`crate::inbound::http::schemas`], keeping domain
//! types free of utoipa derives.
//!
//! The document backs Swagger UI in debug builds and is exported via
//! `cargo run --bin openapi-dump` for firmware tooling.

use crate::inbound::http::devices::EnvelopeRequest;
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema, WireEnvelopeSchema};
use utoipa::OpenApi;

/// OpenAPI document for the device gateway.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tracker device gateway",
        description = "Encrypted request/response protocol for GPS tracker firmware. \
            Successful bodies are AES-128-CBC envelopes under the device key; \
            error bodies are plain JSON."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::devices::report_location,
        crate::inbound::http::devices::poll_command,
        crate::inbound::http::devices::poll_configuration,
        crate::inbound::http::devices::check_configuration,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(EnvelopeRequest, WireEnvelopeSchema, ErrorSchema, ErrorCodeSchema)),
    tags(
        (name = "devices", description = "Encrypted device protocol"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated OpenAPI document.

    use super::*;
    use rstest::rstest;
    use utoipa::openapi::RefOr;
    use utoipa::openapi::schema::Schema;

    // utoipa replaces :: with . in schema names
    const ERROR_SCHEMA_NAME: &str = "crate.domain.Error";
    const ENVELOPE_SCHEMA_NAME: &str = "crate.domain.envelope.WireEnvelope";

    fn assert_object_schema_has_field(schema: &RefOr<Schema>, field: &str) {
        match schema {
            RefOr::T(Schema::Object(obj)) => {
                assert!(
                    obj.properties.contains_key(field),
                    "schema should have field '{field}'"
                );
            }
            _ => panic!("expected Object schema"),
        }
    }

    #[rstest]
    #[case(ERROR_SCHEMA_NAME, "error")]
    #[case(ERROR_SCHEMA_NAME, "code")]
    #[case(ERROR_SCHEMA_NAME, "traceId")]
    #[case(ENVELOPE_SCHEMA_NAME, "iv")]
    #[case(ENVELOPE_SCHEMA_NAME, "cipherText")]
    fn schemas_expose_wire_field_names(#[case] schema: &str, #[case] field: &str) {
        let doc = ApiDoc::openapi();
        let schemas = &doc.components.as_ref().expect("components").schemas;
        let found = schemas.get(schema).expect("schema registered");
        assert_object_schema_has_field(found, field);
    }

    #[rstest]
    #[case("/device/{deviceId}/location")]
    #[case("/device/{deviceId}/command")]
    #[case("/device/{deviceId}/config")]
    #[case("/device/{deviceId}/config/check-new-config")]
    #[case("/health/ready")]
    fn device_and_health_paths_are_documented(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }
}
