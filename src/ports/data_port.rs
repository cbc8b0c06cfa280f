//! Market data access port.

use crate::domain::error::RuletraderError;
use crate::domain::ohlcv::TimeSeries;

/// Source of daily price history.
///
/// Implementations are shared across the per-symbol fetch threads of a batch,
/// hence the `Sync` bound.
pub trait DataPort: Sync {
    /// The most recent `limit` bars for `symbol`, oldest first.
    fn fetch_historical_data(&self, symbol: &str, limit: usize)
        -> Result<TimeSeries, RuletraderError>;
}
