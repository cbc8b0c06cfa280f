//! OHLCV bar and time series representation.
//!
//! Data providers deliver bars newest-first; [`TimeSeries`] normalises them to
//! oldest-first on construction so indicator math can walk forward in time.

use chrono::NaiveDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub datetime: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvBar {
    /// Name of the first non-finite field, if any.
    pub fn non_finite_field(&self) -> Option<&'static str> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
        .map(|(name, _)| name)
    }
}

/// Ordered price history for one symbol, oldest bar first.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub symbol: String,
    bars: Vec<OhlcvBar>,
}

impl TimeSeries {
    /// Build a series from bars in any order. Bars are stably sorted by datetime.
    pub fn new(symbol: impl Into<String>, mut bars: Vec<OhlcvBar>) -> Self {
        bars.sort_by_key(|b| b.datetime);
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// Build a series from provider output (newest first) without re-sorting.
    pub fn from_newest_first(symbol: impl Into<String>, mut bars: Vec<OhlcvBar>) -> Self {
        bars.reverse();
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&OhlcvBar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    /// Keep only the newest `limit` bars.
    pub fn truncate_to_latest(&mut self, limit: usize) {
        if self.bars.len() > limit {
            self.bars.drain(..self.bars.len() - limit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(day: u32, close: f64) -> OhlcvBar {
        OhlcvBar {
            datetime: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn new_sorts_oldest_first() {
        let series = TimeSeries::new("AAPL", vec![bar(3, 3.0), bar(1, 1.0), bar(2, 2.0)]);
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.latest().unwrap().close, 3.0);
    }

    #[test]
    fn from_newest_first_reverses() {
        let series = TimeSeries::from_newest_first("AAPL", vec![bar(3, 3.0), bar(2, 2.0), bar(1, 1.0)]);
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn truncate_keeps_newest() {
        let mut series = TimeSeries::new("AAPL", (1..=10).map(|d| bar(d, d as f64)).collect());
        series.truncate_to_latest(3);
        assert_eq!(series.closes(), vec![8.0, 9.0, 10.0]);

        series.truncate_to_latest(50);
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn non_finite_field_detected() {
        let mut b = bar(1, 10.0);
        assert_eq!(b.non_finite_field(), None);
        b.volume = f64::NAN;
        assert_eq!(b.non_finite_field(), Some("volume"));
        b.close = f64::INFINITY;
        assert_eq!(b.non_finite_field(), Some("close"));
    }
}
