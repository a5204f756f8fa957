//! Relay connection management.
//!
//! One background task per room owns the transport link, announces
//! membership on every (re)connect, reconnects with exponential backoff, and
//! fans inbound events out to subscribers. Everything else talks to it
//! through the cloneable [`ConnectionManager`] handle.

mod handler;
mod link_loop;
mod manager;
mod registry;
mod types;


pub use manager::ConnectionManager;
pub use registry::SubscriptionId;
pub use types::{ConnectionConfig, EventKind, LinkState, RelayEvent};
