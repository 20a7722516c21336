//! Feed connection lifecycle.
//!
//! [`ConnectionManager`] is an explicit state machine over
//! {Disconnected, Connecting, Connected}. [`ConnectionManager::next_event`] is its single
//! transition function: it waits for whatever the current state is waiting on (the reconnect
//! timer, the connection attempt, or the next frame) and performs the resulting transition.
//! Entering `Connecting` is reported as its own event before the attempt starts.
//!
//! Reconnection uses a fixed delay and never gives up. [`ConnectionManager::disconnect`] is the
//! only way to stop it.

use crate::{
    config::FeedConfig,
    error::FeedError,
    message::FeedRequest,
    websocket::{Connector, FeedChannel},
};
use derive_more::Display;
use std::time::Duration;
use tokio::{sync::watch, time::Instant};
use tracing::{debug, error, info, warn};

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Outcome of one transition
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// Reconnect timer elapsed, the next transition opens the channel
    Connecting,
    /// Channel open and standing subscriptions sent
    Connected,
    /// Inbound text frame
    Frame(String),
    /// Channel lost, a reconnect is scheduled
    Disconnected(FeedError),
}

pub struct ConnectionManager<C: Connector> {
    connector: C,
    url: String,
    reconnect_delay: Duration,
    ping_interval: Duration,
    idle_timeout: Duration,
    /// Sent on every successful connect
    subscriptions: Vec<FeedRequest>,
    channel: Option<C::Channel>,
    /// Pending reconnect timer
    reconnect_at: Option<Instant>,
    /// Set by `disconnect`, stops all further transitions
    closed: bool,
    attempt: u64,
    state_tx: watch::Sender<ConnectionState>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, config: &FeedConfig) -> Self {
        let subscriptions = vec![
            FeedRequest::DashboardData {
                symbols: config.symbols.clone(),
                interval: config.interval,
            },
            FeedRequest::RequestTwitterData,
        ];
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            connector,
            url: config.url.clone(),
            reconnect_delay: config.reconnect_delay,
            ping_interval: config.ping_interval,
            idle_timeout: config.idle_timeout,
            subscriptions,
            channel: None,
            reconnect_at: None,
            closed: false,
            attempt: 0,
            state_tx,
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Standing subscriptions sent after every connect
    pub fn subscriptions(&self) -> &[FeedRequest] {
        &self.subscriptions
    }

    /// Deadline of the pending reconnect, if one is scheduled
    pub fn reconnect_pending(&self) -> Option<Instant> {
        self.reconnect_at
    }

    /// Open the connection now and send the standing subscriptions.
    pub async fn connect(&mut self) -> ConnectionEvent {
        self.closed = false;
        self.reconnect_at = None;
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.open().await
    }

    /// Arm an immediate connection attempt, performed by the next call to `next_event`.
    pub fn start(&mut self) {
        self.closed = false;
        if self.channel.is_none() {
            self.reconnect_at = Some(Instant::now());
        }
    }

    /// Wait for and perform the next transition.
    ///
    /// Returns `None` once `disconnect` was called, or when disconnected with nothing scheduled.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        if self.closed {
            return None;
        }

        match self.state() {
            ConnectionState::Connected => Some(self.read().await),
            ConnectionState::Connecting => Some(self.open().await),
            ConnectionState::Disconnected => {
                let deadline = self.reconnect_at?;
                tokio::time::sleep_until(deadline).await;
                self.reconnect_at = None;
                self.set_state(ConnectionState::Connecting);
                Some(ConnectionEvent::Connecting)
            }
        }
    }

    /// Send a request on the live channel. Fails with `NotConnected` unless connected.
    pub async fn send(&mut self, request: &FeedRequest) -> Result<(), FeedError> {
        let channel = match (self.state(), self.channel.as_mut()) {
            (ConnectionState::Connected, Some(channel)) => channel,
            _ => return Err(FeedError::NotConnected),
        };
        channel.send(request.to_text()?).await
    }

    /// Cancel any pending reconnect and close the channel without scheduling another attempt.
    pub async fn disconnect(&mut self) {
        self.closed = true;
        if let Some(deadline) = self.reconnect_at.take() {
            debug!("Cancelled reconnect scheduled for {:?}", deadline);
        }
        if let Some(mut channel) = self.channel.take() {
            channel.close().await;
        }
        self.set_state(ConnectionState::Disconnected);
        info!("Disconnected from feed at {}", self.url);
    }

    async fn open(&mut self) -> ConnectionEvent {
        self.set_state(ConnectionState::Connecting);
        self.attempt += 1;
        info!("Connecting to feed at {} (attempt {})", self.url, self.attempt);

        let mut channel = match self.connector.connect(&self.url).await {
            Ok(channel) => channel,
            Err(error) => {
                error!("Failed to connect to {}: {}", self.url, error);
                return self.schedule_reconnect(error);
            }
        };

        if let Err(error) = send_all(&mut channel, &self.subscriptions).await {
            warn!("Failed to send subscriptions: {}", error);
            channel.close().await;
            return self.schedule_reconnect(error);
        }

        self.channel = Some(channel);
        self.attempt = 0;
        self.set_state(ConnectionState::Connected);
        ConnectionEvent::Connected
    }

    async fn read(&mut self) -> ConnectionEvent {
        let ping_interval = self.ping_interval;
        let idle_timeout = self.idle_timeout;

        let Some(channel) = self.channel.as_mut() else {
            return self.schedule_reconnect(FeedError::NotConnected);
        };

        let mut ping = tokio::time::interval_at(Instant::now() + ping_interval, ping_interval);
        let idle = tokio::time::sleep(idle_timeout);
        tokio::pin!(idle);

        let outcome = loop {
            tokio::select! {
                frame = channel.recv() => break frame,
                _ = ping.tick() => {
                    if let Err(error) = channel.ping().await {
                        break Some(Err(error));
                    }
                    debug!("Sent keep-alive ping");
                }
                _ = &mut idle => break Some(Err(FeedError::IdleTimeout(idle_timeout))),
            }
        };

        match outcome {
            Some(Ok(text)) => ConnectionEvent::Frame(text),
            Some(Err(error)) => self.drop_connection(error).await,
            None => self.drop_connection(FeedError::Closed).await,
        }
    }

    async fn drop_connection(&mut self, reason: FeedError) -> ConnectionEvent {
        let channel = self.channel.take();
        let event = self.schedule_reconnect(reason);
        if let Some(mut channel) = channel {
            channel.close().await;
        }
        event
    }

    fn schedule_reconnect(&mut self, reason: FeedError) -> ConnectionEvent {
        self.set_state(ConnectionState::Disconnected);
        self.reconnect_at = Some(Instant::now() + self.reconnect_delay);
        warn!(
            "Connection lost ({}), reconnecting in {:?}",
            reason, self.reconnect_delay
        );
        ConnectionEvent::Disconnected(reason)
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Connection state {} -> {}", previous, state);
        }
    }
}

async fn send_all<Ch: FeedChannel>(
    channel: &mut Ch,
    requests: &[FeedRequest],
) -> Result<(), FeedError> {
    for request in requests {
        channel.send(request.to_text()?).await?;
    }
    Ok(())
}
