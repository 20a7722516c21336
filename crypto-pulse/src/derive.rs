//! Presentation-ready views computed from the state store.
//!
//! Every function here is pure: it reads snapshots and returns owned values.

use crate::types::{InstrumentSnapshot, SocialSnapshot};
use derive_more::Display;
use itertools::Itertools;

/// Number of instruments in each side of the gainers/losers ranking
pub const RANKING_DEPTH: usize = 4;

/// Binary gain/loss classification, zero counts as a gain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Tone {
    #[display("gain")]
    Gain,
    #[display("loss")]
    Loss,
}

impl Tone {
    pub fn of(change: f64) -> Self {
        if change >= 0.0 { Tone::Gain } else { Tone::Loss }
    }

    /// Chart fill colour
    pub fn color(&self) -> &'static str {
        match self {
            Tone::Gain => "#3DD598",
            Tone::Loss => "#FF5C5C",
        }
    }
}

/// Sub-daily percentage changes extrapolated linearly from the 1h and 24h figures.
///
/// These are approximations and must not be presented as measured values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimatedChanges {
    pub five_minutes: f64,
    pub thirty_minutes: f64,
    pub four_hours: f64,
    pub twelve_hours: f64,
}

impl EstimatedChanges {
    pub fn from_instrument(instrument: &InstrumentSnapshot) -> Self {
        Self {
            five_minutes: instrument.price_change_1h / 12.0,
            thirty_minutes: instrument.price_change_1h / 2.0,
            four_hours: instrument.price_change_24h / 6.0,
            twelve_hours: instrument.price_change_24h / 2.0,
        }
    }
}

/// One card of the gainers/losers ranking
#[derive(Debug, Clone, PartialEq)]
pub struct RankedInstrument {
    pub symbol: String,
    pub name: String,
    pub current_price: f64,
    pub price_change_24h: f64,
    pub estimates: EstimatedChanges,
}

impl From<&InstrumentSnapshot> for RankedInstrument {
    fn from(instrument: &InstrumentSnapshot) -> Self {
        Self {
            symbol: instrument.symbol.clone(),
            name: instrument.name.clone(),
            current_price: instrument.current_price,
            price_change_24h: instrument.price_change_24h,
            estimates: EstimatedChanges::from_instrument(instrument),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GainersLosers {
    /// Best 24h performers, best first
    pub gainers: Vec<RankedInstrument>,
    /// Worst 24h performers, worst first
    pub losers: Vec<RankedInstrument>,
}

/// Rank instruments by 24h change.
///
/// The sort is stable so equal changes keep their input order. With fewer than
/// `2 * RANKING_DEPTH` instruments the two sides overlap.
pub fn rank_gainers_losers<'a, I>(instruments: I) -> GainersLosers
where
    I: IntoIterator<Item = &'a InstrumentSnapshot>,
{
    let sorted = instruments
        .into_iter()
        .sorted_by(|a, b| b.price_change_24h.total_cmp(&a.price_change_24h))
        .collect::<Vec<_>>();

    GainersLosers {
        gainers: sorted
            .iter()
            .take(RANKING_DEPTH)
            .map(|instrument| RankedInstrument::from(*instrument))
            .collect(),
        losers: sorted
            .iter()
            .rev()
            .take(RANKING_DEPTH)
            .map(|instrument| RankedInstrument::from(*instrument))
            .collect(),
    }
}

/// Treemap tile: area from market cap, colour from 24h change
#[derive(Debug, Clone, PartialEq)]
pub struct TreemapEntry {
    pub symbol: String,
    pub name: String,
    pub market_cap: f64,
    pub current_price: f64,
    pub price_change_24h: f64,
    pub tone: Tone,
}

/// Treemap tiles, largest market cap first. Instruments without a positive market cap are
/// left out since they have no area.
pub fn treemap_entries<'a, I>(instruments: I) -> Vec<TreemapEntry>
where
    I: IntoIterator<Item = &'a InstrumentSnapshot>,
{
    instruments
        .into_iter()
        .filter(|instrument| instrument.market_cap.is_finite() && instrument.market_cap > 0.0)
        .sorted_by(|a, b| b.market_cap.total_cmp(&a.market_cap))
        .map(|instrument| TreemapEntry {
            symbol: instrument.symbol.clone(),
            name: instrument.name.clone(),
            market_cap: instrument.market_cap,
            current_price: instrument.current_price,
            price_change_24h: instrument.price_change_24h,
            tone: Tone::of(instrument.price_change_24h),
        })
        .collect()
}

/// Complementary mindshare pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MindshareSplit {
    pub tracked: f64,
    pub other: f64,
}

/// Split 100% between the tracked instrument and everything else.
///
/// Out-of-range input is clamped into [0, 100].
pub fn mindshare_split(mindshare: f64) -> MindshareSplit {
    let tracked = if mindshare.is_nan() {
        0.0
    } else {
        mindshare.clamp(0.0, 100.0)
    };

    MindshareSplit {
        tracked,
        other: 100.0 - tracked,
    }
}

/// One column of the activity chart
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityBucket {
    pub label: String,
    pub count: u64,
}

/// Activity buckets in the order the feed listed them
pub fn activity_buckets(social: &SocialSnapshot) -> Vec<ActivityBucket> {
    social
        .time_distribution
        .iter()
        .map(|(label, count)| ActivityBucket {
            label: label.clone(),
            count: *count,
        })
        .collect()
}

/// One bar of the 1h/24h/7d change chart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChangeBar {
    pub label: &'static str,
    pub change: f64,
    pub tone: Tone,
}

/// Measured percentage changes of one instrument, shortest window first
pub fn change_summary(instrument: &InstrumentSnapshot) -> [ChangeBar; 3] {
    [
        ("1h", instrument.price_change_1h),
        ("24h", instrument.price_change_24h),
        ("7d", instrument.price_change_7d),
    ]
    .map(|(label, change)| ChangeBar {
        label,
        change,
        tone: Tone::of(change),
    })
}

/// Headline social figures of one instrument
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SocialMetrics {
    pub total_posts: u64,
    pub avg_engagement: f64,
    pub avg_impressions: f64,
    pub sentiment_score: f64,
    pub sentiment_tone: Tone,
}

pub fn social_metrics(social: &SocialSnapshot) -> SocialMetrics {
    SocialMetrics {
        total_posts: social.total_tweets,
        avg_engagement: social.avg_engagement,
        avg_impressions: social.avg_impressions,
        sentiment_score: social.sentiment_score,
        sentiment_tone: Tone::of(social.sentiment_score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn instrument(symbol: &str, change_24h: f64, market_cap: f64) -> InstrumentSnapshot {
        InstrumentSnapshot {
            symbol: symbol.to_string(),
            name: format!("{symbol} coin"),
            current_price: 1.0,
            market_cap,
            volume_24h: 0.0,
            price_change_1h: 1.2,
            price_change_24h: change_24h,
            price_change_7d: 0.0,
            sparkline: Vec::new(),
            timestamp: None,
            last_updated: None,
        }
    }

    fn symbols(ranked: &[RankedInstrument]) -> Vec<&str> {
        ranked.iter().map(|r| r.symbol.as_str()).collect()
    }

    #[test]
    fn test_rank_gainers_losers() {
        let instruments = vec![
            instrument("A", 1.0, 1.0),
            instrument("B", -3.0, 1.0),
            instrument("C", 7.5, 1.0),
            instrument("D", -0.5, 1.0),
            instrument("E", 2.0, 1.0),
            instrument("F", -9.0, 1.0),
            instrument("G", 0.0, 1.0),
            instrument("H", 4.0, 1.0),
            instrument("I", -1.0, 1.0),
        ];

        let ranking = rank_gainers_losers(&instruments);
        assert_eq!(symbols(&ranking.gainers), vec!["C", "H", "E", "A"]);
        assert_eq!(symbols(&ranking.losers), vec!["F", "B", "I", "D"]);
    }

    #[test]
    fn test_rank_ties_keep_arrival_order() {
        let instruments = vec![
            instrument("X", 1.0, 1.0),
            instrument("Y", 1.0, 1.0),
            instrument("Z", 1.0, 1.0),
        ];

        let ranking = rank_gainers_losers(&instruments);
        assert_eq!(symbols(&ranking.gainers), vec!["X", "Y", "Z"]);
        assert_eq!(symbols(&ranking.losers), vec!["Z", "Y", "X"]);
    }

    #[test]
    fn test_rank_is_idempotent() {
        let instruments = vec![
            instrument("A", 0.3, 1.0),
            instrument("B", 0.3, 1.0),
            instrument("C", -2.0, 1.0),
            instrument("D", 5.0, 1.0),
        ];

        let first = rank_gainers_losers(&instruments);
        let second = rank_gainers_losers(&instruments);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rank_empty() {
        let ranking = rank_gainers_losers(std::iter::empty());
        assert_eq!(ranking, GainersLosers::default());
    }

    #[test]
    fn test_estimated_changes() {
        let mut btc = instrument("BTC", 6.0, 1.0);
        btc.price_change_1h = 1.2;

        let estimates = EstimatedChanges::from_instrument(&btc);
        assert!((estimates.five_minutes - 0.1).abs() < 1e-12);
        assert!((estimates.thirty_minutes - 0.6).abs() < 1e-12);
        assert!((estimates.four_hours - 1.0).abs() < 1e-12);
        assert!((estimates.twelve_hours - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_treemap_entries() {
        let instruments = vec![
            instrument("SMALL", -0.1, 10.0),
            instrument("ZERO", 1.0, 0.0),
            instrument("BIG", 0.0, 1000.0),
            instrument("NEG", 1.0, -5.0),
        ];

        let entries = treemap_entries(&instruments);
        let tiles: Vec<(&str, Tone)> = entries.iter().map(|e| (e.symbol.as_str(), e.tone)).collect();
        assert_eq!(tiles, vec![("BIG", Tone::Gain), ("SMALL", Tone::Loss)]);
        assert_eq!(entries[0].tone.color(), "#3DD598");
        assert_eq!(entries[1].tone.to_string(), "loss");
    }

    #[test]
    fn test_mindshare_split_sums_to_hundred() {
        for mindshare in [0.0, 12.5, 62.0, 75.0, 100.0] {
            let split = mindshare_split(mindshare);
            assert_eq!(split.tracked, mindshare);
            assert_eq!(split.tracked + split.other, 100.0);
        }

        assert_eq!(mindshare_split(140.0).other, 0.0);
        assert_eq!(mindshare_split(-3.0).tracked, 0.0);
        assert_eq!(mindshare_split(f64::NAN).other, 100.0);
    }

    #[test]
    fn test_activity_buckets_keep_feed_order() {
        let mut time_distribution = IndexMap::new();
        time_distribution.insert("20-24h".to_string(), 3);
        time_distribution.insert("0-4h".to_string(), 9);
        time_distribution.insert("4-8h".to_string(), 1);

        let social = SocialSnapshot {
            symbol: "BTC".to_string(),
            total_tweets: 13,
            avg_engagement: 0.0,
            avg_impressions: 0.0,
            sentiment_score: -0.2,
            mindshare: 50.0,
            time_distribution,
            top_tweets: Vec::new(),
            timestamp: None,
        };

        let labels: Vec<String> = activity_buckets(&social).into_iter().map(|b| b.label).collect();
        assert_eq!(labels, vec!["20-24h", "0-4h", "4-8h"]);
        assert_eq!(social_metrics(&social).sentiment_tone, Tone::Loss);
    }

    #[test]
    fn test_change_summary_tones() {
        let mut eth = instrument("ETH", -2.0, 1.0);
        eth.price_change_1h = 0.0;
        eth.price_change_7d = 4.0;

        let bars = change_summary(&eth);
        let tones: Vec<(&str, Tone)> = bars.iter().map(|b| (b.label, b.tone)).collect();
        assert_eq!(
            tones,
            vec![("1h", Tone::Gain), ("24h", Tone::Loss), ("7d", Tone::Gain)]
        );
    }
}
