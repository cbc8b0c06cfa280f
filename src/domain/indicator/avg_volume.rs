//! Average volume: mean of the most recent `period` bar volumes.

use crate::domain::indicator::sma::{rolling_mean, sma};
use crate::domain::indicator::{to_points, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn avg_volume(volumes: &[f64], period: usize) -> Option<f64> {
    sma(volumes, period)
}

pub fn calculate_avg_volume(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::AvgVolume(period),
        values: to_points(bars, rolling_mean(&volumes, period)),
    }
}
