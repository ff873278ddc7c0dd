//! Domain primitives, the envelope codec and the gateway pipeline.
//!
//! Types here are transport and storage agnostic. Validation lives in
//! fallible constructors so adapters cannot build entities that violate an
//! invariant.

pub mod account;
pub mod administration;
pub mod configuration;
pub mod device;
pub mod device_key;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod location;
pub mod ports;
pub mod trace_id;

pub use self::account::{Account, AccountRole};
pub use self::administration::FleetAdministrationService;
pub use self::configuration::{
    AtCheck, Configuration, ConfigurationDocument, ConfigurationValidationError, EspConfig,
    GpsThreshold, InitCommand, ModuleBaud, NetworkConfig,
};
pub use self::device::{
    AccountId, CommandRecord, ConfigHistoryEntry, ConfigurationId, Device, DeviceCommand, DeviceId,
    DeviceState, DeviceValidationError, LocationId,
};
pub use self::device_key::{DeviceKey, DeviceKeyError};
pub use self::error::{Error, ErrorCode};
pub use self::gateway::DeviceGatewayService;
pub use self::location::{Coordinate, Hemisphere, Location, LocationReading, LocationValidationError};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
