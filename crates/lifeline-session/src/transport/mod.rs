//! Transport seam between the connection loop and the relay.
//!
//! The connection loop only sees [`Connector`] and [`RelayLink`]; the
//! production implementation speaks JSON frames over a WebSocket.

mod ws;

pub use ws::WsConnector;

use async_trait::async_trait;

use crate::protocol::RelayFrame;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("send failed: {0}")]
    Send(String),

    #[error("receive failed: {0}")]
    Receive(String),

    #[error("malformed frame: {0}")]
    Malformed(String),
}

/// Opens links to the relay. Called once per connection attempt.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Box<dyn RelayLink>, TransportError>;
}

/// One live link to the relay.
///
/// `recv` must be cancel-safe: the connection loop polls it inside
/// `tokio::select!` alongside outbound commands.
#[async_trait]
pub trait RelayLink: Send {
    async fn send(&mut self, frame: RelayFrame) -> Result<(), TransportError>;

    /// Next inbound frame. `None` once the relay has closed the link.
    async fn recv(&mut self) -> Option<Result<RelayFrame, TransportError>>;

    async fn close(&mut self);
}
