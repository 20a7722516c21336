//! Feed wire protocol.
//!
//! Inbound frames are classified into [`FeedMessage`], outbound subscriptions are [`FeedRequest`].
//! Both sides use a `type` discriminator field.

use crate::{
    error::FeedError,
    types::{InstrumentSnapshot, SocialSnapshot},
};
use serde::{Deserialize, Serialize};

/// Classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedMessage {
    /// `crypto_data`: ordered instrument snapshots
    CryptoData(Vec<InstrumentSnapshot>),
    /// `twitter_data` carrying a snapshot
    TwitterData(SocialSnapshot),
    /// `twitter_data` carrying an error instead of a snapshot
    TwitterError(String),
    /// Any other `type`, kept for logging only
    Unrecognised { kind: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawMessage {
    CryptoData {
        data: Vec<InstrumentSnapshot>,
    },
    TwitterData {
        #[serde(default)]
        data: Option<SocialSnapshot>,
        #[serde(default)]
        error: Option<String>,
    },
    #[serde(other)]
    Unrecognised,
}

#[derive(Debug, Deserialize)]
struct MessageKind {
    #[serde(rename = "type")]
    kind: String,
}

impl FeedMessage {
    /// Classify a raw text frame.
    ///
    /// Frames that are not JSON, lack a `type`, or carry a known `type` with an invalid body are
    /// errors. Unknown `type` values are not.
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        let raw = serde_json::from_str::<RawMessage>(text)
            .map_err(|error| FeedError::deserialise(error, text))?;

        match raw {
            RawMessage::CryptoData { data } => Ok(Self::CryptoData(data)),
            RawMessage::TwitterData {
                data: Some(snapshot),
                ..
            } => Ok(Self::TwitterData(snapshot)),
            RawMessage::TwitterData {
                data: None,
                error: Some(error),
            } => Ok(Self::TwitterError(error)),
            RawMessage::TwitterData {
                data: None,
                error: None,
            } => Err(FeedError::Malformed {
                kind: "twitter_data",
                reason: "neither data nor error present".to_string(),
            }),
            RawMessage::Unrecognised => {
                let MessageKind { kind } = serde_json::from_str(text)
                    .map_err(|error| FeedError::deserialise(error, text))?;
                Ok(Self::Unrecognised { kind })
            }
        }
    }

    /// Wire name of the frame kind
    pub fn kind(&self) -> &str {
        match self {
            FeedMessage::CryptoData(_) => "crypto_data",
            FeedMessage::TwitterData(_) | FeedMessage::TwitterError(_) => "twitter_data",
            FeedMessage::Unrecognised { kind } => kind,
        }
    }
}

/// Outbound request to the feed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedRequest {
    /// Standing instrument subscription with push interval in seconds
    DashboardData { symbols: Vec<String>, interval: u64 },
    /// Standing request for the dashboard-wide social snapshot
    RequestTwitterData,
    /// Social snapshot for one instrument
    TwitterData { symbol: String },
}

impl FeedRequest {
    pub fn to_text(&self) -> Result<String, FeedError> {
        serde_json::to_string(self).map_err(|error| FeedError::Serialise(error.to_string()))
    }
}
