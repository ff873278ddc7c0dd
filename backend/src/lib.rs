//! Encrypted device communication gateway.
//!
//! Devices address the gateway by identifier and exchange AES-128-CBC
//! envelopes under a pre-shared key. The crate is laid out hexagonally:
//! [`domain`] holds entities, the envelope codec and the gateway pipeline;
//! [`inbound`] adapts HTTP onto the driving ports; [`outbound`] implements
//! the driven store ports over PostgreSQL or memory.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
#[cfg(test)]
mod test_support;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
