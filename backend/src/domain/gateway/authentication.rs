//! Request authentication stage.
//!
//! Possession of the device key is the only credential: a request is
//! authentic when its envelope opens under the key stored for the addressed
//! device. Every device route needs an owning account, so lookups go through
//! the owned view of the directory. The stage never mutates state.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::envelope::{Envelope, open_json};
use crate::domain::ports::{DeviceDirectory, EnvelopeFields};
use crate::domain::{Device, DeviceId, DeviceKey, Error};

use super::{DEVICE_NOT_FOUND, INVALID_DEVICE_REQUEST, map_store_error};

/// Device resolved from the path, with a usable key.
#[derive(Debug, Clone)]
pub struct AuthenticatedDevice {
    pub device: Device,
    pub key: DeviceKey,
}

/// Device plus the decrypted JSON payload of its request.
#[derive(Debug, Clone)]
pub struct AuthenticatedRequest {
    pub device: Device,
    pub key: DeviceKey,
    pub payload: Value,
}

/// Resolves devices and opens their envelopes.
pub struct RequestAuthenticator<D> {
    directory: Arc<D>,
}

impl<D> Clone for RequestAuthenticator<D> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
        }
    }
}

impl<D> RequestAuthenticator<D>
where
    D: DeviceDirectory,
{
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// Resolve the device for a body-less poll.
    ///
    /// Fails with `InvalidRequest` for a malformed identifier and
    /// `DeviceNotFound` when the device is absent, ownerless or keyless.
    pub async fn identify(&self, raw_device_id: &str) -> Result<AuthenticatedDevice, Error> {
        let device_id = parse_device_id(raw_device_id)?;
        self.resolve(&device_id).await
    }

    /// Authenticate a request carrying an encrypted body.
    ///
    /// All shape checks run before the directory is consulted, so a malformed
    /// request never costs a lookup.
    pub async fn authenticate(
        &self,
        raw_device_id: &str,
        fields: &EnvelopeFields,
    ) -> Result<AuthenticatedRequest, Error> {
        let device_id = parse_device_id(raw_device_id)?;
        let envelope = decode_envelope(fields)?;
        let AuthenticatedDevice { device, key } = self.resolve(&device_id).await?;

        match open_json(&envelope, &key) {
            Ok(payload) => {
                debug!(device_id = %device_id, key_fingerprint = %key.fingerprint(), "request decrypted");
                Ok(AuthenticatedRequest {
                    device,
                    key,
                    payload,
                })
            }
            Err(err) => {
                warn!(
                    device_id = %device_id,
                    key_fingerprint = %key.fingerprint(),
                    reason = %err,
                    "request decryption failed"
                );
                Err(Error::decryption_failed("Failed to decrypt device request"))
            }
        }
    }

    async fn resolve(&self, device_id: &DeviceId) -> Result<AuthenticatedDevice, Error> {
        let device = self
            .directory
            .find_owned_by_device_id(device_id)
            .await
            .map_err(map_store_error)?;
        let Some(device) = device else {
            info!(device_id = %device_id, "unknown or ownerless device");
            return Err(Error::device_not_found(DEVICE_NOT_FOUND));
        };
        let Some(key) = device.key().cloned() else {
            info!(device_id = %device_id, "device has no provisioned key");
            return Err(Error::device_not_found(DEVICE_NOT_FOUND));
        };
        Ok(AuthenticatedDevice { device, key })
    }
}

fn parse_device_id(raw: &str) -> Result<DeviceId, Error> {
    DeviceId::new(raw).map_err(|err| {
        info!(reason = %err, "rejected device identifier");
        Error::invalid_request(INVALID_DEVICE_REQUEST)
    })
}

fn decode_envelope(fields: &EnvelopeFields) -> Result<Envelope, Error> {
    let (Some(iv), Some(cipher_text)) = (fields.iv.as_deref(), fields.cipher_text.as_deref())
    else {
        return Err(Error::invalid_request(INVALID_DEVICE_REQUEST));
    };
    Envelope::from_base64(iv, cipher_text).map_err(|err| {
        info!(reason = %err, "rejected envelope");
        Error::invalid_request(INVALID_DEVICE_REQUEST)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::envelope::seal_json;
    use crate::domain::ports::{DeviceStoreError, MockDeviceDirectory};
    use crate::domain::{DeviceState, ErrorCode};
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn key() -> DeviceKey {
        DeviceKey::new(vec![0x11; 16]).expect("valid key")
    }

    fn device_with(key: Option<DeviceKey>) -> Device {
        let placeholder = DeviceKey::new(vec![0; 16]).expect("valid key");
        let mut state = DeviceState::provisioned(DeviceId::new("D1").expect("valid id"), placeholder);
        state.key = key;
        Device::try_from(state).expect("valid device")
    }

    fn directory_returning(device: Option<Device>) -> MockDeviceDirectory {
        let mut directory = MockDeviceDirectory::new();
        directory
            .expect_find_owned_by_device_id()
            .times(1)
            .return_once(move |_| Ok(device));
        directory
    }

    fn fields_for(value: &Value, key: &DeviceKey) -> EnvelopeFields {
        let wire = seal_json(value, key).expect("seal").to_wire();
        EnvelopeFields {
            iv: Some(wire.iv),
            cipher_text: Some(wire.cipher_text),
        }
    }

    #[rstest]
    #[case(EnvelopeFields { iv: None, cipher_text: Some("AAAA".into()) })]
    #[case(EnvelopeFields { iv: Some("AAAA".into()), cipher_text: None })]
    #[case(EnvelopeFields { iv: Some("".into()), cipher_text: Some("AAAA".into()) })]
    #[case(EnvelopeFields { iv: Some("AAAA".into()), cipher_text: Some("!!".into()) })]
    #[tokio::test]
    async fn malformed_envelope_is_rejected_before_lookup(#[case] fields: EnvelopeFields) {
        let directory = MockDeviceDirectory::new();
        let authenticator = RequestAuthenticator::new(Arc::new(directory));
        let err = authenticator
            .authenticate("D1", &fields)
            .await
            .expect_err("invalid request");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[case("")]
    #[case("bad id")]
    #[tokio::test]
    async fn malformed_identifier_is_rejected(#[case] raw: &str) {
        let authenticator = RequestAuthenticator::new(Arc::new(MockDeviceDirectory::new()));
        let err = authenticator.identify(raw).await.expect_err("invalid id");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_device_is_not_found(key: DeviceKey) {
        let authenticator = RequestAuthenticator::new(Arc::new(directory_returning(None)));
        let err = authenticator
            .authenticate("D1", &fields_for(&json!({}), &key))
            .await
            .expect_err("not found");
        assert_eq!(err.code(), ErrorCode::DeviceNotFound);
        assert_eq!(err.message(), DEVICE_NOT_FOUND);
    }

    #[rstest]
    #[tokio::test]
    async fn lookups_use_the_owned_view() {
        let mut directory = MockDeviceDirectory::new();
        directory.expect_find_by_device_id().never();
        directory
            .expect_find_owned_by_device_id()
            .withf(|id| id.as_str() == "D1")
            .times(1)
            .return_once(|_| Ok(None));
        let authenticator = RequestAuthenticator::new(Arc::new(directory));
        let err = authenticator.identify("D1").await.expect_err("ownerless");
        assert_eq!(err.code(), ErrorCode::DeviceNotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn keyless_device_is_not_found() {
        let authenticator =
            RequestAuthenticator::new(Arc::new(directory_returning(Some(device_with(None)))));
        let err = authenticator.identify("D1").await.expect_err("not found");
        assert_eq!(err.code(), ErrorCode::DeviceNotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn wrong_key_fails_decryption(key: DeviceKey) {
        let stranger = DeviceKey::new(vec![0x22; 16]).expect("valid key");
        let authenticator =
            RequestAuthenticator::new(Arc::new(directory_returning(Some(device_with(Some(key))))));
        let err = authenticator
            .authenticate("D1", &fields_for(&json!({ "hdop": 1 }), &stranger))
            .await
            .expect_err("decryption failure");
        assert_eq!(err.code(), ErrorCode::DecryptionFailed);
    }

    #[rstest]
    #[tokio::test]
    async fn valid_envelope_yields_payload(key: DeviceKey) {
        let authenticator = RequestAuthenticator::new(Arc::new(directory_returning(Some(
            device_with(Some(key.clone())),
        ))));
        let request = authenticator
            .authenticate("D1", &fields_for(&json!({ "hdop": 1 }), &key))
            .await
            .expect("authenticated");
        assert_eq!(request.payload, json!({ "hdop": 1 }));
        assert_eq!(request.device.id().as_str(), "D1");
    }

    #[rstest]
    #[tokio::test]
    async fn store_outage_is_service_unavailable() {
        let mut directory = MockDeviceDirectory::new();
        directory
            .expect_find_owned_by_device_id()
            .return_once(|_| Err(DeviceStoreError::connection("refused")));
        let authenticator = RequestAuthenticator::new(Arc::new(directory));
        let err = authenticator.identify("D1").await.expect_err("unavailable");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
