//! Domain ports for the hexagonal boundary.
//!
//! Driven ports (`DeviceDirectory`, `DeviceStateRepository`,
//! `FleetAdministrationRepository`, `StoreHealth`) are implemented by
//! outbound adapters.
//! Driving ports (`DeviceGateway`, `FleetAdministration`) are implemented by
//! domain services and called by inbound adapters.

mod device_directory;
mod device_gateway;
mod device_state_repository;
mod device_store_error;
mod fleet_administration;
mod fleet_administration_repository;
mod store_health;

#[cfg(test)]
pub use device_directory::MockDeviceDirectory;
pub use device_directory::DeviceDirectory;
#[cfg(test)]
pub use device_gateway::MockDeviceGateway;
pub use device_gateway::{DeviceGateway, EnvelopeFields, GatewayOperation, GatewayRequest};
#[cfg(test)]
pub use device_state_repository::MockDeviceStateRepository;
pub use device_state_repository::{ConfigurationSync, DeviceStateRepository};
pub use device_store_error::DeviceStoreError;
#[cfg(test)]
pub use fleet_administration::MockFleetAdministration;
pub use fleet_administration::FleetAdministration;
#[cfg(test)]
pub use fleet_administration_repository::MockFleetAdministrationRepository;
pub use fleet_administration_repository::FleetAdministrationRepository;
#[cfg(test)]
pub use store_health::MockStoreHealth;
pub use store_health::StoreHealth;
