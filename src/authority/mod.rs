//! Authority submission subsystem.
//!
//! # Data Flow
//! ```text
//! artifact + record
//!     → endpoints.rs (jurisdiction → URL)
//!     → client.rs (ResilienceGuard around the transport)
//!         → transport.rs (SOAP 1.2 POST, raw envelope back)
//!     → envelope.rs (locate the embedded result document)
//!     → response.rs (status code → AUTHORIZED / REJECTED JSON)
//! ```
//!
//! # Design Decisions
//! - Only the transport call is retried; extraction failures are final
//! - An unknown jurisdiction is a configuration problem and is never attempted

pub mod client;
pub mod endpoints;
pub mod envelope;
pub mod response;
pub mod transport;

pub use client::{AuthorityClient, AuthorityError};
pub use endpoints::EndpointResolver;
pub use envelope::{extract, ExtractionError};
pub use response::parse_result;
pub use transport::{AuthorityTransport, SoapTransport, TransportError};
