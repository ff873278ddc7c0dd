//! Per-device symmetric key material.
//!
//! Keys are provisioned out of band and handed to clients as base64. Inside
//! the process they live in a zeroize-on-drop buffer and only ever surface in
//! logs as a short SHA-256 fingerprint.

use std::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Required key length for AES-128.
pub const KEY_LEN: usize = 16;

/// Number of digest bytes rendered by [`DeviceKey::fingerprint`].
const FINGERPRINT_BYTES: usize = 8;

/// Validation errors raised while constructing a [`DeviceKey`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceKeyError {
    #[error("device key must be valid base64")]
    InvalidEncoding,
    #[error("device key must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

/// Opaque symmetric secret shared with one device.
///
/// Keys built through [`DeviceKey::new`] or [`DeviceKey::from_base64`] are
/// always [`KEY_LEN`] bytes. Stored keys are loaded without validation so a
/// corrupt record fails inside the codec instead of hiding the device.
///
/// # Examples
/// ```
/// use tracker_backend::domain::DeviceKey;
///
/// let key = DeviceKey::from_base64("AAECAwQFBgcICQoLDA0ODw==").expect("valid key");
/// assert_eq!(key.as_bytes().len(), 16);
/// assert_eq!(key.fingerprint().len(), 16);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct DeviceKey(Zeroizing<Vec<u8>>);

impl DeviceKey {
    /// Validate raw key bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, DeviceKeyError> {
        let bytes = Zeroizing::new(bytes.into());
        if bytes.len() != KEY_LEN {
            return Err(DeviceKeyError::InvalidLength {
                expected: KEY_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    /// Decode and validate a base64 key as handed to devices.
    pub fn from_base64(encoded: &str) -> Result<Self, DeviceKeyError> {
        let bytes = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|_| DeviceKeyError::InvalidEncoding)?,
        );
        Self::new(bytes.to_vec())
    }

    /// Rehydrate key bytes from storage without length validation.
    pub(crate) fn from_stored(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Base64 form handed to the device during provisioning.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.as_bytes())
    }

    /// Short hex digest safe to log in place of the key.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.as_bytes());
        hex::encode(&digest[..FINGERPRINT_BYTES])
    }
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}
