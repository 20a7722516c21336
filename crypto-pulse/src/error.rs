use std::time::Duration;
use thiserror::Error;

/// All errors generated in `crypto-pulse`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    #[error("failed to connect to feed at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("SocketError: {0}")]
    Socket(String),

    #[error("feed connection closed")]
    Closed,

    #[error("no frame received for {0:?}, assuming the connection is dead")]
    IdleTimeout(Duration),

    #[error("failed to deserialise frame: {error}, payload: {payload}")]
    Deserialise { error: String, payload: String },

    #[error("failed to serialise request: {0}")]
    Serialise(String),

    #[error("malformed {kind} frame: {reason}")]
    Malformed { kind: &'static str, reason: String },

    #[error("cannot send while the feed is not connected")]
    NotConnected,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FeedError {
    /// Determine if an error belongs to the transport and is recovered by reconnecting, as opposed
    /// to a per-frame error that only drops the offending frame.
    #[allow(clippy::match_like_matches_macro)]
    pub fn is_transport(&self) -> bool {
        match self {
            FeedError::Connect { .. }
            | FeedError::Socket(_)
            | FeedError::Closed
            | FeedError::IdleTimeout(_)
            | FeedError::NotConnected => true,
            _ => false,
        }
    }

    pub(crate) fn deserialise(error: serde_json::Error, payload: &str) -> Self {
        Self::Deserialise {
            error: error.to_string(),
            payload: truncate(payload, 256).to_string(),
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for FeedError {
    fn from(value: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Socket(value.to_string())
    }
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_error_is_transport() {
        struct TestCase {
            input: FeedError,
            expected: bool,
        }

        let tests = vec![
            TestCase {
                // TC0: connect failures are recovered by the reconnect policy
                input: FeedError::Connect {
                    url: "ws://localhost:8765".to_string(),
                    reason: "refused".to_string(),
                },
                expected: true,
            },
            TestCase {
                // TC1: silent connection death
                input: FeedError::IdleTimeout(Duration::from_secs(120)),
                expected: true,
            },
            TestCase {
                // TC2: a bad frame only drops that frame
                input: FeedError::Deserialise {
                    error: "expected value".to_string(),
                    payload: "{".to_string(),
                },
                expected: false,
            },
            TestCase {
                // TC3: twitter frame with neither data nor error
                input: FeedError::Malformed {
                    kind: "twitter_data",
                    reason: "missing data".to_string(),
                },
                expected: false,
            },
            TestCase {
                // TC4: bad configuration is never a transport problem
                input: FeedError::Config("bad url".to_string()),
                expected: false,
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = test.input.is_transport();
            assert_eq!(actual, test.expected, "TC{} failed", index);
        }
    }

    #[test]
    fn test_deserialise_truncates_payload() {
        let payload = "x".repeat(1000);
        let error = serde_json::from_str::<u8>(&payload).unwrap_err();

        match FeedError::deserialise(error, &payload) {
            FeedError::Deserialise { payload, .. } => assert_eq!(payload.len(), 256),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
