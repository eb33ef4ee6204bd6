//! Subscriber notification subsystem.
//!
//! # Data Flow
//! ```text
//! workflow → sender.rs (NotificationSender::notify, resolve URL, enqueue)
//!          → sender.rs (DeliveryWorker, one FIFO lane per record)
//!              → signing.rs (HMAC-SHA256 over the JSON body)
//!              → ResilienceGuard → transport.rs (HTTP POST)
//! ```
//!
//! # Design Decisions
//! - Delivery failures are logged and counted, never returned to the workflow
//! - Each record's events go through their own lane, in order; records deliver concurrently

pub mod sender;
pub mod signing;
pub mod transport;

pub use sender::{channel, DeliveryWorker, NotificationEvent, NotificationSender, NotifyError};
pub use signing::{sign, verify};
pub use transport::{DeliveryError, HttpNotificationTransport, NotificationTransport};
