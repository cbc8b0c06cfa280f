#![allow(dead_code)]

use chrono::NaiveDate;
pub use ruletrader::domain::ohlcv::{OhlcvBar, TimeSeries};
use ruletrader::domain::error::RuletraderError;
use ruletrader::domain::quantity::QuantityType;
use ruletrader::domain::rule::{TradeAction, TradingRule};
use ruletrader::ports::account_port::AccountPort;
use ruletrader::ports::data_port::DataPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Mutex;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
    pub requests: Mutex<Vec<(String, usize)>>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }

    pub fn requested(&self) -> Vec<(String, usize)> {
        let mut requests = self.requests.lock().unwrap().clone();
        requests.sort();
        requests
    }
}

impl DataPort for MockDataPort {
    fn fetch_historical_data(
        &self,
        symbol: &str,
        limit: usize,
    ) -> Result<TimeSeries, RuletraderError> {
        self.requests
            .lock()
            .unwrap()
            .push((symbol.to_string(), limit));
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RuletraderError::DataFetch {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let mut series = TimeSeries::new(symbol, bars.clone());
                series.truncate_to_latest(limit);
                Ok(series)
            }
            _ => Err(RuletraderError::NoData {
                symbol: symbol.to_string(),
            }),
        }
    }
}

pub struct MockAccountPort {
    pub cash: HashMap<String, f64>,
    pub calls: RefCell<Vec<String>>,
}

impl MockAccountPort {
    pub fn new() -> Self {
        Self {
            cash: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_cash(mut self, user_id: &str, cash: f64) -> Self {
        self.cash.insert(user_id.to_string(), cash);
        self
    }
}

impl AccountPort for MockAccountPort {
    fn available_cash(&self, user_id: &str) -> Result<f64, RuletraderError> {
        self.calls.borrow_mut().push(user_id.to_string());
        self.cash
            .get(user_id)
            .copied()
            .ok_or_else(|| RuletraderError::CashUnavailable {
                user_id: user_id.to_string(),
            })
    }
}

pub fn make_bar(date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        datetime: NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000.0,
    }
}

/// `count` daily bars with closes `start_price + i * step`, oldest first.
pub fn generate_bars(start_date: &str, count: usize, start_price: f64, step: f64) -> Vec<OhlcvBar> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let close = start_price + i as f64 * step;
            OhlcvBar {
                datetime: (start + chrono::Duration::days(i as i64))
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1000.0 + i as f64,
            }
        })
        .collect()
}

pub fn make_rule(id: &str, symbol: &str, expression: &str) -> TradingRule {
    TradingRule {
        id: id.to_string(),
        user_id: "alice".to_string(),
        symbol: symbol.to_string(),
        expression: expression.to_string(),
        action: TradeAction::Buy,
        quantity_type: QuantityType::Fixed,
        quantity_value: "10".to_string(),
        is_active: true,
    }
}

pub fn sized(mut rule: TradingRule, quantity_type: QuantityType, value: &str) -> TradingRule {
    rule.quantity_type = quantity_type;
    rule.quantity_value = value.to_string();
    rule
}
