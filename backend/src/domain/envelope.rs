//! Symmetric envelope codec.
//!
//! Every device payload travels as `{iv, cipherText}`: AES-128-CBC with
//! PKCS#7 padding under the device key, both halves base64 on the wire. The
//! codec is schema agnostic; [`seal_json`] and [`open_json`] add the JSON
//! layer used by the gateway.

use aes::Aes128;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Pkcs7};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::device_key::{DeviceKey, KEY_LEN};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// AES block and IV length in bytes.
pub const IV_LEN: usize = 16;

/// Failures raised while opening an envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecryptionError {
    #[error("key must be {KEY_LEN} bytes, got {actual}")]
    InvalidKeyLength { actual: usize },
    #[error("iv must be {IV_LEN} bytes, got {actual}")]
    InvalidIvLength { actual: usize },
    #[error("ciphertext length {actual} is not a multiple of the block size")]
    UnalignedCipherText { actual: usize },
    #[error("invalid padding")]
    InvalidPadding,
    #[error("plaintext is not valid JSON")]
    MalformedPlaintext,
}

/// Failures raised while sealing a payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncryptionError {
    #[error("key must be {KEY_LEN} bytes, got {actual}")]
    InvalidKeyLength { actual: usize },
    #[error("payload serialisation failed: {message}")]
    Serialisation { message: String },
}

/// Failures raised while decoding the base64 wire form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeFormatError {
    #[error("{field} must not be blank")]
    Blank { field: &'static str },
    #[error("{field} must be valid base64")]
    InvalidBase64 { field: &'static str },
}

/// Decoded envelope holding raw IV and ciphertext bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    iv: Vec<u8>,
    cipher_text: Vec<u8>,
}

/// Base64 wire representation exchanged with devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEnvelope {
    pub iv: String,
    pub cipher_text: String,
}

impl Envelope {
    /// Assemble an envelope from raw parts. Lengths are checked on decrypt.
    pub fn new(iv: Vec<u8>, cipher_text: Vec<u8>) -> Self {
        Self { iv, cipher_text }
    }

    /// Decode the base64 wire fields.
    ///
    /// # Examples
    /// ```
    /// use tracker_backend::domain::envelope::{Envelope, EnvelopeFormatError};
    ///
    /// assert_eq!(
    ///     Envelope::from_base64("  ", "AAAA"),
    ///     Err(EnvelopeFormatError::Blank { field: "iv" })
    /// );
    /// ```
    pub fn from_base64(iv: &str, cipher_text: &str) -> Result<Self, EnvelopeFormatError> {
        Ok(Self {
            iv: decode_field("iv", iv)?,
            cipher_text: decode_field("cipherText", cipher_text)?,
        })
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn cipher_text(&self) -> &[u8] {
        &self.cipher_text
    }

    /// Encode both halves for the wire.
    pub fn to_wire(&self) -> WireEnvelope {
        WireEnvelope {
            iv: STANDARD.encode(&self.iv),
            cipher_text: STANDARD.encode(&self.cipher_text),
        }
    }
}

impl TryFrom<&WireEnvelope> for Envelope {
    type Error = EnvelopeFormatError;

    fn try_from(value: &WireEnvelope) -> Result<Self, Self::Error> {
        Self::from_base64(&value.iv, &value.cipher_text)
    }
}

fn decode_field(field: &'static str, raw: &str) -> Result<Vec<u8>, EnvelopeFormatError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EnvelopeFormatError::Blank { field });
    }
    STANDARD
        .decode(trimmed)
        .map_err(|_| EnvelopeFormatError::InvalidBase64 { field })
}

/// Encrypt `plaintext` under `key` with a fresh random IV.
pub fn encrypt(plaintext: &[u8], key: &DeviceKey) -> Result<Envelope, EncryptionError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    encrypt_with_iv(plaintext, key, iv)
}

pub(crate) fn encrypt_with_iv(
    plaintext: &[u8],
    key: &DeviceKey,
    iv: [u8; IV_LEN],
) -> Result<Envelope, EncryptionError> {
    let key_bytes = key.as_bytes();
    if key_bytes.len() != KEY_LEN {
        return Err(EncryptionError::InvalidKeyLength {
            actual: key_bytes.len(),
        });
    }
    let cipher = Aes128CbcEnc::new_from_slices(key_bytes, &iv).map_err(|_| {
        EncryptionError::InvalidKeyLength {
            actual: key_bytes.len(),
        }
    })?;
    let cipher_text = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext);
    Ok(Envelope::new(iv.to_vec(), cipher_text))
}

/// Decrypt an envelope under `key`, returning the raw plaintext.
pub fn decrypt(envelope: &Envelope, key: &DeviceKey) -> Result<Vec<u8>, DecryptionError> {
    let key_bytes = key.as_bytes();
    if key_bytes.len() != KEY_LEN {
        return Err(DecryptionError::InvalidKeyLength {
            actual: key_bytes.len(),
        });
    }
    if envelope.iv.len() != IV_LEN {
        return Err(DecryptionError::InvalidIvLength {
            actual: envelope.iv.len(),
        });
    }
    if envelope.cipher_text.is_empty() || envelope.cipher_text.len() % IV_LEN != 0 {
        return Err(DecryptionError::UnalignedCipherText {
            actual: envelope.cipher_text.len(),
        });
    }
    let cipher = Aes128CbcDec::new_from_slices(key_bytes, &envelope.iv).map_err(|_| {
        DecryptionError::InvalidKeyLength {
            actual: key_bytes.len(),
        }
    })?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&envelope.cipher_text)
        .map_err(|_| DecryptionError::InvalidPadding)
}

/// Serialise `value` as JSON and encrypt it.
pub fn seal_json<T: Serialize>(value: &T, key: &DeviceKey) -> Result<Envelope, EncryptionError> {
    let plaintext = serde_json::to_vec(value).map_err(|err| EncryptionError::Serialisation {
        message: err.to_string(),
    })?;
    encrypt(&plaintext, key)
}

/// Decrypt an envelope and parse the plaintext as JSON.
///
/// A wrong key occasionally yields valid padding, so plaintext that is not
/// JSON counts as a decryption failure rather than a malformed request.
pub fn open_json(envelope: &Envelope, key: &DeviceKey) -> Result<Value, DecryptionError> {
    let plaintext = decrypt(envelope, key)?;
    serde_json::from_slice(&plaintext).map_err(|_| DecryptionError::MalformedPlaintext)
}
