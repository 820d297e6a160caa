//! Shared-vehicle trip scheduling service.
//!
//! The crate follows a hexagonal layout: [`domain`] holds the trip model
//! and its ports, [`inbound`] adapts HTTP onto the driving ports and
//! [`outbound`] provides the driven adapters.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

/// Public OpenAPI surface used by tooling.
pub use doc::ApiDoc;
pub use middleware::Trace;
