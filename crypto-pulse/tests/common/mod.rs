#![allow(dead_code)]

use async_trait::async_trait;
use crypto_pulse::{Connector, FeedChannel, FeedConfig, FeedError, FeedRequest};
use serde_json::json;
use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{sync::mpsc, time::Instant};

/// Config pointing at a fake feed, tracking BTC then ETH
pub fn config() -> FeedConfig {
    FeedConfig::new("ws://feed.test:8765")
        .with_symbols(["BTC", "ETH"])
        .with_reconnect_delay(Duration::from_millis(2000))
}

pub fn crypto_frame(prices: &[(&str, f64)]) -> String {
    let data: Vec<serde_json::Value> = prices
        .iter()
        .map(|(symbol, price)| {
            json!({
                "symbol": symbol,
                "name": symbol,
                "current_price": price,
                "market_cap": 1.0e9,
                "volume_24h": 1.0e8,
                "price_change_1h": 0.1,
                "price_change_24h": 2.4,
                "price_change_7d": -1.0,
                "sparkline": [price - 1.0],
                "timestamp": 1_700_000_000_000i64
            })
        })
        .collect();
    json!({"type": "crypto_data", "data": data}).to_string()
}

pub fn twitter_frame(symbol: &str, mindshare: f64) -> String {
    json!({
        "type": "twitter_data",
        "data": {
            "symbol": symbol,
            "total_tweets": 42,
            "avg_engagement": 3.5,
            "avg_impressions": 120.0,
            "sentiment_score": 0.25,
            "mindshare": mindshare,
            "time_distribution": {"0-4h": 12, "4-8h": 30},
            "top_tweets": [],
            "timestamp": "2024-01-01T00:00:00Z"
        }
    })
    .to_string()
}

/// Server side of a [`FakeChannel`]
pub struct FakeServer {
    inbound: Option<mpsc::UnboundedSender<Result<String, FeedError>>>,
    sent: Arc<Mutex<Vec<String>>>,
    pings: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

impl FakeServer {
    /// Queue a text frame for the client
    pub fn push(&self, frame: impl Into<String>) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(Ok(frame.into()));
        }
    }

    /// Queue a transport error for the client
    pub fn fail(&self, error: FeedError) {
        if let Some(inbound) = &self.inbound {
            let _ = inbound.send(Err(error));
        }
    }

    /// Close the connection from the server side once queued frames are read
    pub fn hang_up(&mut self) {
        self.inbound.take();
    }

    /// Raw frames the client sent
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Requests the client sent, decoded
    pub fn requests(&self) -> Vec<FeedRequest> {
        self.sent()
            .iter()
            .map(|frame| serde_json::from_str(frame).unwrap())
            .collect()
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    /// Whether the client closed its side
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory [`FeedChannel`]. Dropping the [`FakeServer`] ends the stream.
pub struct FakeChannel {
    inbound: mpsc::UnboundedReceiver<Result<String, FeedError>>,
    sent: Arc<Mutex<Vec<String>>>,
    pings: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

pub fn fake_channel() -> (FakeChannel, FakeServer) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sent = Arc::new(Mutex::new(Vec::new()));
    let pings = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicBool::new(false));

    let channel = FakeChannel {
        inbound: rx,
        sent: Arc::clone(&sent),
        pings: Arc::clone(&pings),
        closed: Arc::clone(&closed),
    };
    let server = FakeServer {
        inbound: Some(tx),
        sent,
        pings,
        closed,
    };
    (channel, server)
}

#[async_trait]
impl FeedChannel for FakeChannel {
    async fn send(&mut self, text: String) -> Result<(), FeedError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(FeedError::Closed);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, FeedError>> {
        self.inbound.recv().await
    }

    async fn ping(&mut self) -> Result<(), FeedError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct Script {
    channels: VecDeque<FakeChannel>,
    attempts: Vec<Instant>,
}

/// [`Connector`] handing out queued [`FakeChannel`]s, refusing once the queue is empty.
#[derive(Clone, Default)]
pub struct ScriptedConnector {
    script: Arc<Mutex<Script>>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept the next connection attempt, returning the server side of it
    pub fn accept_next(&self) -> FakeServer {
        let (channel, server) = fake_channel();
        self.script.lock().unwrap().channels.push_back(channel);
        server
    }

    /// Times of every connection attempt so far
    pub fn attempts(&self) -> Vec<Instant> {
        self.script.lock().unwrap().attempts.clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Channel = FakeChannel;

    async fn connect(&mut self, url: &str) -> Result<Self::Channel, FeedError> {
        let mut script = self.script.lock().unwrap();
        script.attempts.push(Instant::now());
        script.channels.pop_front().ok_or_else(|| FeedError::Connect {
            url: url.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// [`Connector`] whose attempts take `delay` before resolving through `inner`
#[derive(Clone)]
pub struct SlowConnector {
    inner: ScriptedConnector,
    delay: Duration,
}

impl SlowConnector {
    pub fn new(inner: ScriptedConnector, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl Connector for SlowConnector {
    type Channel = FakeChannel;

    async fn connect(&mut self, url: &str) -> Result<Self::Channel, FeedError> {
        tokio::time::sleep(self.delay).await;
        self.inner.connect(url).await
    }
}
