/// Bounded price history for live sparklines
///
/// Fixed-capacity FIFO of (timestamp, price) points, oldest evicted first
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// One observed price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    pub time: DateTime<Utc>,
    pub price: f64,
}

/// Rolling price window with a fixed capacity
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    /// Maximum number of points to keep
    capacity: usize,
    /// Points in arrival order
    points: VecDeque<HistoryPoint>,
}

impl HistoryBuffer {
    /// Create a new buffer with specified capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            points: VecDeque::with_capacity(capacity),
        }
    }

    /// Add a new point, evicting the oldest points once over capacity.
    ///
    /// A timestamp earlier than the newest point is clamped to it so the series stays
    /// non-decreasing.
    pub fn append(&mut self, time: DateTime<Utc>, price: f64) {
        let time = match self.points.back() {
            Some(last) if time < last.time => {
                debug!(
                    "Clamping out-of-order history point {} to {}",
                    time, last.time
                );
                last.time
            }
            _ => time,
        };

        self.points.push_back(HistoryPoint { time, price });

        while self.points.len() > self.capacity {
            self.points.pop_front();
        }
    }

    /// Seed an empty buffer from an embedded price history (oldest first).
    ///
    /// Points are spaced one second apart ending at `end`. Does nothing when the buffer already
    /// holds data. Returns whether the seed was applied.
    pub fn seed(&mut self, prices: &[f64], end: DateTime<Utc>) -> bool {
        if !self.points.is_empty() || prices.is_empty() {
            return false;
        }

        let last = prices.len() as i64 - 1;
        for (index, price) in prices.iter().enumerate() {
            let offset = ChronoDuration::seconds(last - index as i64);
            self.append(end - offset, *price);
        }
        true
    }

    /// Points in chronological order
    pub fn as_series(&self) -> Vec<HistoryPoint> {
        self.points.iter().copied().collect()
    }

    /// Iterate points in chronological order
    pub fn iter(&self) -> impl Iterator<Item = &HistoryPoint> {
        self.points.iter()
    }

    /// Get the latest price
    pub fn latest_price(&self) -> Option<f64> {
        self.points.back().map(|point| point.price)
    }

    /// Get number of points in the buffer
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Detail-view series for whichever symbol is focused
///
/// Each symbol owns its own buffer; only the focused one receives live prices.
#[derive(Debug, Clone)]
pub struct DetailHistory {
    capacity: usize,
    focus: Option<String>,
    buffers: HashMap<String, HistoryBuffer>,
}

impl DetailHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            focus: None,
            buffers: HashMap::new(),
        }
    }

    /// Focus a symbol, creating its empty buffer the first time it is seen
    pub fn focus(&mut self, symbol: &str) {
        let capacity = self.capacity;
        self.buffers
            .entry(symbol.to_string())
            .or_insert_with(|| HistoryBuffer::new(capacity));
        self.focus = Some(symbol.to_string());
    }

    pub fn unfocus(&mut self) {
        self.focus = None;
    }

    pub fn focused(&self) -> Option<&str> {
        self.focus.as_deref()
    }

    /// Record a live price for `symbol`.
    ///
    /// Ignored unless `symbol` is focused. An empty buffer is first seeded from `sparkline`.
    /// A price equal to the last recorded one is skipped. Returns whether a point was appended.
    pub fn observe(
        &mut self,
        symbol: &str,
        price: f64,
        sparkline: &[f64],
        time: DateTime<Utc>,
    ) -> bool {
        if self.focus.as_deref() != Some(symbol) {
            return false;
        }

        let Some(buffer) = self.buffers.get_mut(symbol) else {
            return false;
        };

        buffer.seed(sparkline, time);

        if buffer.latest_price() == Some(price) {
            return false;
        }

        buffer.append(time, price);
        true
    }

    /// Buffer of the focused symbol
    pub fn focused_buffer(&self) -> Option<&HistoryBuffer> {
        self.focus
            .as_ref()
            .and_then(|symbol| self.buffers.get(symbol))
    }

    pub fn buffer(&self, symbol: &str) -> Option<&HistoryBuffer> {
        self.buffers.get(symbol)
    }
}
