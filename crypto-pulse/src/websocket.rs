/// WebSocket transport for the dashboard feed
///
/// [`Connector`] and [`FeedChannel`] are the seam between the connection manager and the network,
/// so the reconnect policy can run against an in-memory channel in tests.
use crate::error::FeedError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use rustls::crypto::ring::default_provider;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info};

/// One open duplex text channel to the feed
#[async_trait]
pub trait FeedChannel: Send {
    /// Send one text frame
    async fn send(&mut self, text: String) -> Result<(), FeedError>;

    /// Next inbound text frame.
    ///
    /// `None` means the peer closed the channel.
    async fn recv(&mut self) -> Option<Result<String, FeedError>>;

    /// Send a keep-alive ping
    async fn ping(&mut self) -> Result<(), FeedError> {
        Ok(())
    }

    /// Close the channel, errors are ignored
    async fn close(&mut self);
}

/// Opens [`FeedChannel`]s
#[async_trait]
pub trait Connector: Send {
    type Channel: FeedChannel;

    async fn connect(&mut self, url: &str) -> Result<Self::Channel, FeedError>;
}

/// [`Connector`] over `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn connect(&mut self, url: &str) -> Result<Self::Channel, FeedError> {
        install_crypto_provider();

        let (stream, _) = connect_async(url).await.map_err(|error| FeedError::Connect {
            url: url.to_string(),
            reason: error.to_string(),
        })?;
        info!("Connected to WebSocket server at {}", url);
        Ok(WsChannel { stream })
    }
}

/// Install the ring rustls provider for `wss` handshakes.
///
/// rustls cannot pick a provider on its own, so without this the first TLS handshake panics.
/// Installing again after the first time is a no-op.
pub fn install_crypto_provider() {
    let _ = default_provider().install_default();
}

/// [`FeedChannel`] over a `tokio-tungstenite` stream
pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedChannel for WsChannel {
    async fn send(&mut self, text: String) -> Result<(), FeedError> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, FeedError>> {
        while let Some(message) = self.stream.next().await {
            match message {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Close(frame)) => {
                    info!("Server closed connection: {:?}", frame);
                    return None;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Heartbeat messages - tungstenite answers pings automatically
                }
                Ok(Message::Binary(bytes)) => {
                    debug!("Ignoring {} byte binary frame", bytes.len());
                }
                Ok(Message::Frame(_)) => {}
                Err(error) => return Some(Err(FeedError::from(error))),
            }
        }
        None
    }

    async fn ping(&mut self) -> Result<(), FeedError> {
        self.stream.send(Message::Ping(Vec::new().into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(error) = self.stream.close(None).await {
            debug!("Error while closing WebSocket: {}", error);
        }
    }
}
