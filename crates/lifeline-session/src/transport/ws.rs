//! WebSocket transport built on `tokio-tungstenite`.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::protocol::RelayFrame;

use super::{Connector, RelayLink, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to a relay at a `ws://` or `wss://` URL.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> Result<Box<dyn RelayLink>, TransportError> {
        let (ws, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Box::new(WsLink { ws }))
    }
}

struct WsLink {
    ws: WsStream,
}

#[async_trait]
impl RelayLink for WsLink {
    async fn send(&mut self, frame: RelayFrame) -> Result<(), TransportError> {
        let json =
            serde_json::to_string(&frame).map_err(|e| TransportError::Malformed(e.to_string()))?;
        self.ws
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<RelayFrame, TransportError>> {
        loop {
            match self.ws.next().await? {
                Ok(Message::Text(text)) => match serde_json::from_str::<RelayFrame>(&text) {
                    Ok(frame) => return Some(Ok(frame)),
                    Err(e) => {
                        debug!(error = %e, "Unrecognized frame from relay");
                    }
                },
                Ok(Message::Ping(data)) => {
                    let _ = self.ws.send(Message::Pong(data)).await;
                }
                Ok(Message::Close(_)) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}
