/// Feed client configuration
///
/// Defaults match the dashboard feed at ws://localhost:8765 tracking BTC once per second.
use crate::error::FeedError;
use std::time::Duration;
use url::Url;

/// Default feed endpoint
pub const DEFAULT_FEED_URL: &str = "ws://localhost:8765";

/// Capacity of the primary instrument's live price series
pub const PRICE_HISTORY_CAPACITY: usize = 300;

/// Capacity of the focused instrument's detail series
pub const DETAIL_HISTORY_CAPACITY: usize = 100;

/// Feed client configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FeedConfig {
    /// Feed WebSocket URL
    pub url: String,
    /// Instruments to subscribe to, the first one is the primary tracked instrument
    pub symbols: Vec<String>,
    /// Push interval requested from the feed, in seconds
    pub interval: u64,
    /// Fixed delay before every reconnection attempt
    pub reconnect_delay: Duration,
    /// Ping interval to keep connection alive
    pub ping_interval: Duration,
    /// A connection that delivers no frame for this long is treated as dropped
    pub idle_timeout: Duration,
    /// Capacity of the primary price series
    pub price_capacity: usize,
    /// Capacity of each detail series
    pub detail_capacity: usize,
    /// Maximum buffered session commands
    pub channel_buffer_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            symbols: vec!["BTC".to_string()],
            interval: 1,
            reconnect_delay: Duration::from_millis(2000),
            ping_interval: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(120),
            price_capacity: PRICE_HISTORY_CAPACITY,
            detail_capacity: DETAIL_HISTORY_CAPACITY,
            channel_buffer_size: 64,
        }
    }
}

impl FeedConfig {
    /// Create a new configuration with custom URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Build a configuration from the process environment.
    ///
    /// Reads `WS_URL`, `TICKERS`, `FEED_INTERVAL_SECS` and `RECONNECT_DELAY_MS`.
    pub fn from_env() -> Result<Self, FeedError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Unparsable numbers fall back to their defaults, an invalid URL is rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FeedError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("WS_URL") {
            config.url = url;
        }

        if let Some(tickers) = lookup("TICKERS") {
            let symbols = parse_symbols(&tickers);
            if !symbols.is_empty() {
                config.symbols = symbols;
            }
        }

        if let Some(interval) = lookup("FEED_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            config.interval = interval;
        }

        if let Some(delay) = lookup("RECONNECT_DELAY_MS").and_then(|v| v.parse().ok()) {
            config.reconnect_delay = Duration::from_millis(delay);
        }

        config.validate()?;
        Ok(config)
    }

    /// Set tracked symbols
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.symbols = symbols
            .into_iter()
            .map(|symbol| symbol.as_ref().trim().to_uppercase())
            .collect();
        self
    }

    /// Set push interval requested from the feed
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }

    /// Set reconnect delay
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set ping interval
    pub fn with_ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set idle timeout
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set history capacities (primary series, detail series)
    pub fn with_capacities(mut self, price: usize, detail: usize) -> Self {
        self.price_capacity = price;
        self.detail_capacity = detail;
        self
    }

    /// Set command channel buffer size
    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    /// The primary tracked instrument
    pub fn primary_symbol(&self) -> Option<&str> {
        self.symbols.first().map(String::as_str)
    }

    /// Check the configuration can drive a session.
    pub fn validate(&self) -> Result<(), FeedError> {
        let url = Url::parse(&self.url)
            .map_err(|error| FeedError::Config(format!("invalid url {}: {error}", self.url)))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(FeedError::Config(format!(
                "unsupported scheme {} in {}",
                url.scheme(),
                self.url
            )));
        }

        if self.symbols.is_empty() {
            return Err(FeedError::Config("no symbols configured".to_string()));
        }

        if self.price_capacity == 0 || self.detail_capacity == 0 {
            return Err(FeedError::Config(
                "history capacities must be non-zero".to_string(),
            ));
        }

        if self.channel_buffer_size == 0 {
            return Err(FeedError::Config(
                "channel buffer size must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
