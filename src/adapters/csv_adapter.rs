//! CSV file adapters: price history per symbol and rule definitions.

use crate::domain::error::RuletraderError;
use crate::domain::ohlcv::{OhlcvBar, TimeSeries};
use crate::domain::rule::TradingRule;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads `<base_path>/<SYMBOL>.csv` with columns
/// `datetime,open,high,low,close,volume`, rows in any order.
pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Symbols name a file directly under the base path.
    fn csv_path(&self, symbol: &str) -> Result<PathBuf, RuletraderError> {
        if symbol.is_empty() || symbol.contains(['/', '\\']) || symbol.contains("..") {
            return Err(RuletraderError::DataFetch {
                symbol: symbol.to_string(),
                reason: "invalid symbol".to_string(),
            });
        }
        Ok(self.base_path.join(format!("{}.csv", symbol)))
    }

    fn read_bars(&self, symbol: &str) -> Result<Vec<OhlcvBar>, RuletraderError> {
        let path = self.csv_path(symbol)?;
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => RuletraderError::NoData {
                symbol: symbol.to_string(),
            },
            _ => RuletraderError::DataFetch {
                symbol: symbol.to_string(),
                reason: format!("failed to read {}: {}", path.display(), e),
            },
        })?;

        let fetch_error = |reason: String| RuletraderError::DataFetch {
            symbol: symbol.to_string(),
            reason,
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (index, result) in rdr.records().enumerate() {
            let line = index + 2;
            let record = result.map_err(|e| fetch_error(format!("CSV parse error: {}", e)))?;

            let datetime_str = record
                .get(0)
                .ok_or_else(|| fetch_error(format!("line {}: missing datetime column", line)))?;
            let datetime = parse_datetime(datetime_str).ok_or_else(|| {
                fetch_error(format!("line {}: invalid datetime '{}'", line, datetime_str))
            })?;

            let number = |column: usize, name: &str| -> Result<f64, RuletraderError> {
                let raw = record
                    .get(column)
                    .ok_or_else(|| fetch_error(format!("line {}: missing {} column", line, name)))?;
                raw.parse().map_err(|e| {
                    fetch_error(format!("line {}: invalid {} value '{}': {}", line, name, raw, e))
                })
            };

            bars.push(OhlcvBar {
                datetime,
                open: number(1, "open")?,
                high: number(2, "high")?,
                low: number(3, "low")?,
                close: number(4, "close")?,
                volume: number(5, "volume")?,
            });
        }

        Ok(bars)
    }
}

fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

impl DataPort for CsvAdapter {
    fn fetch_historical_data(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<TimeSeries, RuletraderError> {
        let bars = self.read_bars(symbol)?;
        if bars.is_empty() {
            return Err(RuletraderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let mut series = TimeSeries::new(symbol, bars);
        series.truncate_to_latest(limit);
        debug!(%symbol, bars = series.len(), "loaded price history");
        Ok(series)
    }
}

/// Load trading rules from a CSV file with a header row of
/// `id,user_id,symbol,expression,action,quantity_type,quantity_value,is_active`.
pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<Vec<TradingRule>, RuletraderError> {
    let path = path.as_ref();
    let rule_file_error = |reason: String| RuletraderError::RuleFile {
        file: path.display().to_string(),
        reason,
    };

    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| rule_file_error(e.to_string()))?;

    rdr.deserialize()
        .map(|row| row.map_err(|e: csv::Error| rule_file_error(e.to_string())))
        .collect()
}
