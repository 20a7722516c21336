//! Canonical in-memory state of the dashboard.
//!
//! Instrument fields and social fields are independent field groups: a `crypto_data` merge never
//! touches social state and a `twitter_data` merge never touches instrument state.

use crate::types::{InstrumentSnapshot, SocialSnapshot};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

/// Social data state for one symbol
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SocialStatus {
    /// Nothing received yet
    #[default]
    Pending,
    /// Latest snapshot from the feed
    Ready(SocialSnapshot),
    /// The feed answered the request with an error
    Failed(String),
}

impl SocialStatus {
    pub fn snapshot(&self) -> Option<&SocialSnapshot> {
        match self {
            SocialStatus::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, SocialStatus::Pending)
    }
}

static PENDING: SocialStatus = SocialStatus::Pending;

/// Canonical symbol key, feed symbols are matched case-insensitively
pub fn symbol_key(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

#[derive(Debug, Clone, Default)]
pub struct StateStore {
    /// Instruments keyed by symbol, in first-arrival order
    instruments: IndexMap<String, InstrumentSnapshot>,
    social: HashMap<String, SocialStatus>,
    last_updated: Option<DateTime<Utc>>,
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a `crypto_data` payload, replacing the instrument fields of every listed symbol.
    ///
    /// Returns the number of snapshots applied; an empty payload is a no-op.
    pub fn apply_instruments(
        &mut self,
        snapshots: Vec<InstrumentSnapshot>,
        received_at: DateTime<Utc>,
    ) -> usize {
        if snapshots.is_empty() {
            return 0;
        }

        let applied = snapshots.len();
        for snapshot in snapshots {
            self.instruments.insert(symbol_key(&snapshot.symbol), snapshot);
        }
        self.last_updated = Some(received_at);
        applied
    }

    /// Merge a `twitter_data` payload for the symbol it names.
    pub fn apply_social(&mut self, snapshot: SocialSnapshot) {
        self.social
            .insert(symbol_key(&snapshot.symbol), SocialStatus::Ready(snapshot));
    }

    /// Record a failed social request. Existing data is kept rather than replaced by the error.
    pub fn apply_social_error(&mut self, symbol: &str, error: String) {
        let status = self.social.entry(symbol_key(symbol)).or_default();
        match status {
            SocialStatus::Ready(_) => {
                debug!("Keeping previous social data for {} after error: {}", symbol, error)
            }
            _ => *status = SocialStatus::Failed(error),
        }
    }

    /// Mark a symbol as awaiting social data, unless data already arrived.
    pub fn mark_social_pending(&mut self, symbol: &str) {
        let status = self.social.entry(symbol_key(symbol)).or_default();
        if matches!(status, SocialStatus::Failed(_)) {
            *status = SocialStatus::Pending;
        }
    }

    pub fn instrument(&self, symbol: &str) -> Option<&InstrumentSnapshot> {
        self.instruments.get(&symbol_key(symbol))
    }

    /// Instruments in first-arrival order
    pub fn instruments(&self) -> impl Iterator<Item = &InstrumentSnapshot> {
        self.instruments.values()
    }

    pub fn social(&self, symbol: &str) -> &SocialStatus {
        self.social.get(&symbol_key(symbol)).unwrap_or(&PENDING)
    }

    /// Wall-clock time of the last applied `crypto_data`
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}
