/// Core data types for feed payloads
///
/// These types match the JSON payloads pushed by the dashboard feed at ws://localhost:8765
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Timestamp as sent by the feed: epoch milliseconds for instruments, ISO-8601 text for social data
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FeedTime {
    Millis(i64),
    Text(String),
}

impl std::fmt::Display for FeedTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedTime::Millis(millis) => write!(f, "{millis}"),
            FeedTime::Text(text) => f.write_str(text),
        }
    }
}

/// Market snapshot of one instrument
///
/// Identity is the symbol, every `crypto_data` frame replaces all of these fields at once
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InstrumentSnapshot {
    /// Ticker symbol (e.g., "BTC")
    pub symbol: String,
    /// Display name (e.g., "Bitcoin")
    #[serde(default)]
    pub name: String,
    /// Last traded price in USD
    pub current_price: f64,
    /// Market capitalisation in USD
    pub market_cap: f64,
    /// 24h traded volume in USD
    pub volume_24h: f64,
    /// Percentage change over the last hour
    pub price_change_1h: f64,
    /// Percentage change over the last 24 hours
    pub price_change_24h: f64,
    /// Percentage change over the last 7 days
    pub price_change_7d: f64,
    /// Short embedded price history, oldest first
    #[serde(default)]
    pub sparkline: Vec<f64>,
    /// Time the feed produced this snapshot
    #[serde(default)]
    pub timestamp: Option<FeedTime>,
    /// Time the upstream source last updated this instrument
    #[serde(default)]
    pub last_updated: Option<FeedTime>,
}

/// Social-media snapshot for one instrument
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SocialSnapshot {
    /// Ticker symbol this snapshot describes
    pub symbol: String,
    /// Number of posts in the sample
    pub total_tweets: u64,
    /// Mean engagement per post
    pub avg_engagement: f64,
    /// Mean impressions per post
    pub avg_impressions: f64,
    /// Signed sentiment score (negative = bearish)
    pub sentiment_score: f64,
    /// Share of attention captured by this instrument, 0-100
    pub mindshare: f64,
    /// Bucket label to post count, in chronological (insertion) order
    #[serde(default)]
    pub time_distribution: IndexMap<String, u64>,
    /// Most engaged posts, best first
    #[serde(default)]
    pub top_tweets: Vec<TopPost>,
    #[serde(default)]
    pub timestamp: Option<FeedTime>,
}

/// One highlighted social post
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopPost {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: String,
    pub author: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub retweets: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub views: u64,
    /// Permalink to the post
    pub url: String,
    #[serde(default)]
    pub profile_image: Option<String>,
}

impl TopPost {
    /// Likes plus retweets, the ranking key used by the feed
    pub fn engagement(&self) -> u64 {
        self.likes.saturating_add(self.retweets)
    }
}
