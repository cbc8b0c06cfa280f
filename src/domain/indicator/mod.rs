//! Technical indicator implementations.
//!
//! Each indicator has two forms:
//! - a scalar function over an oldest-first `&[f64]`, returning `None` on insufficient data
//! - a history function over bars, producing one [`IndicatorPoint`] per bar
//!
//! The history point at index `i` always equals the scalar over `bars[..=i]`.

pub mod avg_volume;
pub mod ema;
pub mod rsi;
pub mod sma;

use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDateTime;
use std::fmt;

/// Function names accepted in rule expressions.
pub const FUNCTION_NAMES: [&str; 4] = ["RSI", "SMA", "EMA", "avgVolume"];

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPoint {
    pub datetime: NaiveDateTime,
    pub valid: bool,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Rsi(usize),
    Sma(usize),
    Ema(usize),
    AvgVolume(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorType {
    /// Resolve a function name (case-insensitive) and period into an indicator.
    pub fn from_call(name: &str, period: usize) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rsi" => Some(IndicatorType::Rsi(period)),
            "sma" => Some(IndicatorType::Sma(period)),
            "ema" => Some(IndicatorType::Ema(period)),
            "avgvolume" => Some(IndicatorType::AvgVolume(period)),
            _ => None,
        }
    }

    pub fn is_known_function(name: &str) -> bool {
        FUNCTION_NAMES.iter().any(|f| f.eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorType::Rsi(_) => "RSI",
            IndicatorType::Sma(_) => "SMA",
            IndicatorType::Ema(_) => "EMA",
            IndicatorType::AvgVolume(_) => "avgVolume",
        }
    }

    pub fn period(&self) -> usize {
        match self {
            IndicatorType::Rsi(p)
            | IndicatorType::Sma(p)
            | IndicatorType::Ema(p)
            | IndicatorType::AvgVolume(p) => *p,
        }
    }

    /// Warmup factor applied to the period when sizing the fetch window.
    /// Smoothed indicators need extra history to converge.
    pub fn lookback_multiplier(&self) -> usize {
        match self {
            IndicatorType::Rsi(_) | IndicatorType::Ema(_) => 3,
            IndicatorType::Sma(_) | IndicatorType::AvgVolume(_) => 2,
        }
    }

    /// Scalar value over oldest-first closes and volumes.
    pub fn compute(&self, closes: &[f64], volumes: &[f64]) -> Option<f64> {
        match *self {
            IndicatorType::Rsi(p) => rsi::rsi(closes, p),
            IndicatorType::Sma(p) => sma::sma(closes, p),
            IndicatorType::Ema(p) => ema::ema(closes, p),
            IndicatorType::AvgVolume(p) => avg_volume::avg_volume(volumes, p),
        }
    }

    /// Per-bar history over oldest-first bars.
    pub fn history(&self, bars: &[OhlcvBar]) -> IndicatorSeries {
        match *self {
            IndicatorType::Rsi(p) => rsi::calculate_rsi(bars, p),
            IndicatorType::Sma(p) => sma::calculate_sma(bars, p),
            IndicatorType::Ema(p) => ema::calculate_ema(bars, p),
            IndicatorType::AvgVolume(p) => avg_volume::calculate_avg_volume(bars, p),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.period())
    }
}

/// Zip per-bar optional values with bar datetimes.
pub(crate) fn to_points(bars: &[OhlcvBar], values: Vec<Option<f64>>) -> Vec<IndicatorPoint> {
    bars.iter()
        .zip(values)
        .map(|(bar, v)| IndicatorPoint {
            datetime: bar.datetime,
            valid: v.is_some(),
            value: v.unwrap_or(0.0),
        })
        .collect()
}
