//! HTTP inbound adapter exposing the device protocol and health probes.

pub mod devices;
pub mod error;
pub mod health;
pub mod schemas;
pub mod state;

pub use error::ApiResult;
