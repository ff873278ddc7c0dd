//! Device aggregate and its identifiers.
//!
//! A device is the long-lived root the gateway protocol operates on. Only
//! `pending_command`, `config_dirty` and the telemetry pointers change often;
//! everything else is set by provisioning or administration.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::device_key::DeviceKey;

/// Maximum length of a device identifier.
pub const DEVICE_ID_MAX: usize = 64;
/// Maximum length of a remote command.
pub const COMMAND_MAX: usize = 256;

/// Validation errors raised by device constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceValidationError {
    #[error("device id must not be empty")]
    EmptyId,
    #[error("device id must be at most {max} characters")]
    IdTooLong { max: usize },
    #[error("device id may only contain letters, digits, '-', '_', ':' or '.'")]
    IdInvalidCharacters,
    #[error("command must not be blank")]
    EmptyCommand,
    #[error("command must be at most {max} characters")]
    CommandTooLong { max: usize },
    #[error("a device flagged for configuration sync must reference a configuration")]
    DirtyWithoutConfiguration,
}

/// Globally unique, immutable device identifier taken from the request path.
///
/// # Examples
/// ```
/// use tracker_backend::domain::DeviceId;
///
/// assert!(DeviceId::new("D1").is_ok());
/// assert!(DeviceId::new("bad id").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Result<Self, DeviceValidationError> {
        Self::from_owned(id.into())
    }

    fn from_owned(id: String) -> Result<Self, DeviceValidationError> {
        if id.trim().is_empty() {
            return Err(DeviceValidationError::EmptyId);
        }
        if id.chars().count() > DEVICE_ID_MAX {
            return Err(DeviceValidationError::IdTooLong { max: DEVICE_ID_MAX });
        }
        let valid = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'));
        if !valid {
            return Err(DeviceValidationError::IdInvalidCharacters);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DeviceId> for String {
    fn from(value: DeviceId) -> Self {
        value.0
    }
}

impl TryFrom<String> for DeviceId {
    type Error = DeviceValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            #[must_use]
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            #[must_use]
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Reference to an account held by the identity collaborator.
    AccountId
);
uuid_id!(
    /// Identifier of an immutable configuration document.
    ConfigurationId
);
uuid_id!(
    /// Identifier of a stored location reading.
    LocationId
);

/// Remote command queued for a device, e.g. `"reboot"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceCommand(String);

impl DeviceCommand {
    pub fn new(command: impl Into<String>) -> Result<Self, DeviceValidationError> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(DeviceValidationError::EmptyCommand);
        }
        if command.chars().count() > COMMAND_MAX {
            return Err(DeviceValidationError::CommandTooLong { max: COMMAND_MAX });
        }
        Ok(Self(command))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<DeviceCommand> for String {
    fn from(value: DeviceCommand) -> Self {
        value.0
    }
}

impl TryFrom<String> for DeviceCommand {
    type Error = DeviceValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Entry in the append-only command delivery log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRecord {
    pub command: String,
    pub delivered_at: DateTime<Utc>,
}

/// Entry in the append-only configuration push log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigHistoryEntry {
    pub configuration_id: ConfigurationId,
    pub pushed_at: DateTime<Utc>,
}

/// Field bag used to build or rehydrate a [`Device`].
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub id: DeviceId,
    pub key: Option<DeviceKey>,
    pub owner: Option<AccountId>,
    pub last_known_location: Option<LocationId>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub pending_command: Option<String>,
    pub current_config_id: Option<ConfigurationId>,
    pub config_dirty: bool,
}

impl DeviceState {
    /// State of a freshly provisioned device: no owner, no configuration.
    pub fn provisioned(id: DeviceId, key: DeviceKey) -> Self {
        Self {
            id,
            key: Some(key),
            owner: None,
            last_known_location: None,
            last_seen_at: None,
            pending_command: None,
            current_config_id: None,
            config_dirty: false,
        }
    }
}

/// Device record as seen by the gateway.
///
/// ## Invariants
/// - `config_dirty` implies `current_config_id` is set.
#[derive(Debug, Clone)]
pub struct Device {
    id: DeviceId,
    key: Option<DeviceKey>,
    owner: Option<AccountId>,
    last_known_location: Option<LocationId>,
    last_seen_at: Option<DateTime<Utc>>,
    pending_command: Option<String>,
    current_config_id: Option<ConfigurationId>,
    config_dirty: bool,
}

impl Device {
    pub fn id(&self) -> &DeviceId {
        &self.id
    }

    pub fn key(&self) -> Option<&DeviceKey> {
        self.key.as_ref()
    }

    pub fn owner(&self) -> Option<AccountId> {
        self.owner
    }

    pub fn last_known_location(&self) -> Option<LocationId> {
        self.last_known_location
    }

    pub fn last_seen_at(&self) -> Option<DateTime<Utc>> {
        self.last_seen_at
    }

    pub fn pending_command(&self) -> Option<&str> {
        self.pending_command.as_deref()
    }

    pub fn current_config_id(&self) -> Option<ConfigurationId> {
        self.current_config_id
    }

    pub fn config_dirty(&self) -> bool {
        self.config_dirty
    }

    /// Owned field bag, e.g. for adapters applying a mutation.
    pub fn into_state(self) -> DeviceState {
        DeviceState {
            id: self.id,
            key: self.key,
            owner: self.owner,
            last_known_location: self.last_known_location,
            last_seen_at: self.last_seen_at,
            pending_command: self.pending_command,
            current_config_id: self.current_config_id,
            config_dirty: self.config_dirty,
        }
    }
}

impl TryFrom<DeviceState> for Device {
    type Error = DeviceValidationError;

    fn try_from(state: DeviceState) -> Result<Self, Self::Error> {
        if state.config_dirty && state.current_config_id.is_none() {
            return Err(DeviceValidationError::DirtyWithoutConfiguration);
        }
        Ok(Self {
            id: state.id,
            key: state.key,
            owner: state.owner,
            last_known_location: state.last_known_location,
            last_seen_at: state.last_seen_at,
            pending_command: state.pending_command,
            current_config_id: state.current_config_id,
            config_dirty: state.config_dirty,
        })
    }
}
