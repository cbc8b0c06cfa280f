//! Simple Moving Average.
//!
//! Mean of the most recent `period` closes. Warmup: first (n-1) bars are invalid.

use crate::domain::indicator::{to_points, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Rolling mean for every index; `None` until the window is full.
pub(crate) fn rolling_mean(values: &[f64], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        out.push(if i + 1 >= period {
            Some(sum / period as f64)
        } else {
            None
        });
    }
    out
}

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: to_points(bars, rolling_mean(&closes, period)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_bars(prices: &[f64]) -> Vec<OhlcvBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                datetime: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn sma_of_three() {
        assert_eq!(sma(&[1.0, 2.0, 3.0], 3), Some(2.0));
    }

    #[test]
    fn sma_insufficient_data() {
        assert_eq!(sma(&[1.0, 2.0], 3), None);
        assert_eq!(sma(&[], 1), None);
    }

    #[test]
    fn sma_uses_most_recent_window() {
        assert_eq!(sma(&[100.0, 1.0, 2.0, 3.0], 3), Some(2.0));
    }

    #[test]
    fn sma_zero_period() {
        assert_eq!(sma(&[1.0, 2.0], 0), None);
    }

    #[test]
    fn sma_constant_series() {
        let values = vec![42.5; 30];
        for period in [1, 5, 30] {
            assert_relative_eq!(sma(&values, period).unwrap(), 42.5);
        }
    }

    #[test]
    fn history_warmup_and_values() {
        let bars = make_bars(&[10.0, 20.0, 30.0, 40.0]);
        let series = calculate_sma(&bars, 2);

        assert_eq!(series.indicator_type, IndicatorType::Sma(2));
        assert_eq!(series.values.len(), 4);
        assert!(!series.values[0].valid);
        assert_relative_eq!(series.values[1].value, 15.0);
        assert_relative_eq!(series.values[2].value, 25.0);
        assert_relative_eq!(series.values[3].value, 35.0);
    }

    #[test]
    fn history_matches_scalar_prefixes() {
        let closes = [5.0, 3.0, 8.0, 1.0, 9.0, 2.0];
        let bars = make_bars(&closes);
        let series = calculate_sma(&bars, 3);
        for (i, point) in series.values.iter().enumerate() {
            match sma(&closes[..=i], 3) {
                Some(v) => {
                    assert!(point.valid);
                    assert_relative_eq!(point.value, v, epsilon = 1e-12);
                }
                None => assert!(!point.valid),
            }
        }
    }
}
