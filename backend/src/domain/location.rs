//! Location telemetry readings.
//!
//! Firmware reports each axis as a non-negative magnitude plus a hemisphere
//! letter. Any letter is accepted on either axis; the firmware does not
//! always tag longitude with E or W. Older builds send the short field names
//! `coord` and `dir`, which are accepted as aliases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::device::{AccountId, DeviceId, LocationId};

/// Validation errors for telemetry payloads.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationValidationError {
    #[error("location payload is malformed: {message}")]
    Malformed { message: String },
    #[error("{axis} coordinate must be finite and non-negative")]
    InvalidCoordinate { axis: Axis },
    #[error("hdop must be finite and non-negative")]
    InvalidHdop,
}

/// Coordinate axis, used in validation messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Latitude => f.write_str("lat"),
            Self::Longitude => f.write_str("lon"),
        }
    }
}

/// Compass hemisphere letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Hemisphere {
    N,
    S,
    E,
    W,
}

impl Hemisphere {
    pub fn as_char(self) -> char {
        match self {
            Self::N => 'N',
            Self::S => 'S',
            Self::E => 'E',
            Self::W => 'W',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(Self::N),
            'S' => Some(Self::S),
            'E' => Some(Self::E),
            'W' => Some(Self::W),
            _ => None,
        }
    }
}

impl std::fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One axis of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    #[serde(alias = "coord")]
    pub coordinate: f64,
    #[serde(alias = "dir")]
    pub hemisphere: Hemisphere,
}

impl Coordinate {
    fn validate(self, axis: Axis) -> Result<Self, LocationValidationError> {
        if !self.coordinate.is_finite() || self.coordinate < 0.0 {
            return Err(LocationValidationError::InvalidCoordinate { axis });
        }
        Ok(self)
    }

    /// Signed decimal degrees, negative for S and W.
    pub fn signed_degrees(&self) -> f64 {
        match self.hemisphere {
            Hemisphere::S | Hemisphere::W => -self.coordinate,
            Hemisphere::N | Hemisphere::E => self.coordinate,
        }
    }
}

#[derive(Deserialize)]
struct RawReading {
    lat: Coordinate,
    lon: Coordinate,
    hdop: f64,
}

/// Validated telemetry as decrypted from a device envelope.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use tracker_backend::domain::LocationReading;
///
/// let reading = LocationReading::from_payload(json!({
///     "lat": { "coord": 6.2, "dir": "S" },
///     "lon": { "coordinate": 106.8, "hemisphere": "E" },
///     "hdop": 0.9
/// }))
/// .expect("valid reading");
/// assert_eq!(reading.lat().signed_degrees(), -6.2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationReading {
    lat: Coordinate,
    lon: Coordinate,
    hdop: f64,
}

impl LocationReading {
    pub fn new(lat: Coordinate, lon: Coordinate, hdop: f64) -> Result<Self, LocationValidationError> {
        let lat = lat.validate(Axis::Latitude)?;
        let lon = lon.validate(Axis::Longitude)?;
        if !hdop.is_finite() || hdop < 0.0 {
            return Err(LocationValidationError::InvalidHdop);
        }
        Ok(Self { lat, lon, hdop })
    }

    /// Parse and validate a decrypted JSON payload.
    pub fn from_payload(payload: Value) -> Result<Self, LocationValidationError> {
        let raw: RawReading =
            serde_json::from_value(payload).map_err(|err| LocationValidationError::Malformed {
                message: err.to_string(),
            })?;
        Self::new(raw.lat, raw.lon, raw.hdop)
    }

    pub fn lat(&self) -> Coordinate {
        self.lat
    }

    pub fn lon(&self) -> Coordinate {
        self.lon
    }

    pub fn hdop(&self) -> f64 {
        self.hdop
    }
}

/// Immutable stored reading, denormalised with the owner at ingest time.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: LocationId,
    pub device_id: DeviceId,
    pub owner: AccountId,
    pub reading: LocationReading,
    pub recorded_at: DateTime<Utc>,
}
