//! sms-sender - block-list gated SMS dispatch
//!
//! Accepts a request to deliver a short text message, refuses destinations on
//! a shared block list, and otherwise publishes a delivery event to a durable
//! broker, reporting success only after the broker acknowledged the write.
//!
//! ## Pipeline
//! ```text
//! SendRequest -> validate -> BlockListGuard::is_blocked -> EventPublisher::publish_sync
//!                   |                 |                              |
//!                Failed            Blocked                    Success / Failed
//! ```

pub mod blocklist;
pub mod bus;
pub mod config;
pub mod dispatch;
pub mod driver;
pub mod model;
pub mod utils;

pub use blocklist::{BlockListGuard, BlockStore};
pub use bus::{AckPosition, EventBroker, EventPublisher};
pub use dispatch::DispatchOrchestrator;
pub use model::{DeliveryEvent, SendOutcome, SendRequest, SendResponse};
