//! Evaluation context: a read-only view of one symbol's series as of its latest bar.

use crate::domain::error::ContextError;
use crate::domain::expr::Property;
use crate::domain::indicator::IndicatorType;
use crate::domain::ohlcv::{OhlcvBar, TimeSeries};

#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    series: &'a TimeSeries,
    current: &'a OhlcvBar,
    closes: Vec<f64>,
    volumes: Vec<f64>,
}

impl<'a> EvaluationContext<'a> {
    /// Build a context over `series`. The series must be non-empty and its latest
    /// bar must have finite fields.
    pub fn new(series: &'a TimeSeries) -> Result<Self, ContextError> {
        let current = series.latest().ok_or_else(|| ContextError::EmptySeries {
            symbol: series.symbol.clone(),
        })?;
        if let Some(field) = current.non_finite_field() {
            return Err(ContextError::MalformedBar {
                symbol: series.symbol.clone(),
                field,
            });
        }
        Ok(Self {
            series,
            current,
            closes: series.closes(),
            volumes: series.volumes(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.series.symbol
    }

    pub fn current_bar(&self) -> &OhlcvBar {
        self.current
    }

    pub fn bar_count(&self) -> usize {
        self.series.len()
    }

    pub fn property(&self, property: Property) -> f64 {
        match property {
            Property::Close | Property::Price => self.current.close,
            Property::Open => self.current.open,
            Property::High => self.current.high,
            Property::Low => self.current.low,
            Property::Volume => self.current.volume,
        }
    }

    pub fn price(&self) -> f64 {
        self.current.close
    }

    /// Indicator value over the whole series; `None` when history is too short.
    pub fn indicator(&self, indicator: IndicatorType) -> Option<f64> {
        indicator.compute(&self.closes, &self.volumes)
    }

    pub fn rsi(&self, period: usize) -> Option<f64> {
        self.indicator(IndicatorType::Rsi(period))
    }

    pub fn sma(&self, period: usize) -> Option<f64> {
        self.indicator(IndicatorType::Sma(period))
    }

    pub fn ema(&self, period: usize) -> Option<f64> {
        self.indicator(IndicatorType::Ema(period))
    }

    pub fn avg_volume(&self, period: usize) -> Option<f64> {
        self.indicator(IndicatorType::AvgVolume(period))
    }
}
