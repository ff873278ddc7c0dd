//! Error type shared by the device store ports.

/// Errors raised by device store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceStoreError {
    /// Store connection could not be established.
    #[error("device store connection failed: {message}")]
    Connection { message: String },
    /// Query or mutation failed during execution.
    #[error("device store query failed: {message}")]
    Query { message: String },
    /// A stored record violates a domain invariant.
    #[error("device store holds a corrupt record: {message}")]
    Corrupt { message: String },
    /// The addressed device does not exist.
    #[error("device {device_id} not found")]
    NotFound { device_id: String },
    /// A device with this identifier already exists.
    #[error("device {device_id} already exists")]
    Duplicate { device_id: String },
}

impl DeviceStoreError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }

    pub fn not_found(device_id: impl Into<String>) -> Self {
        Self::NotFound {
            device_id: device_id.into(),
        }
    }

    pub fn duplicate(device_id: impl Into<String>) -> Self {
        Self::Duplicate {
            device_id: device_id.into(),
        }
    }
}
