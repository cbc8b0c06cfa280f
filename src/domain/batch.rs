//! Batch rule evaluation.
//!
//! A batch groups active rules by symbol, fetches each symbol's history once
//! with a window large enough for every rule on it, and evaluates the rules
//! against that history. Failures never abort the batch: a failed fetch marks
//! every rule on the symbol as errored, and a failed rule only marks itself.

use std::collections::HashMap;
use std::thread;

use tracing::{debug, info, warn};

use crate::domain::error::{RuletraderError, SizingError};
use crate::domain::evaluation::{evaluate_rule, evaluate_rule_with_cash, EvaluationResult};
use crate::domain::ohlcv::TimeSeries;
use crate::domain::quantity::QuantityType;
use crate::domain::rule::TradingRule;
use crate::domain::rule_parser::parse;
use crate::domain::rule_validate::{required_lookback_days, DEFAULT_LOOKBACK_DAYS};
use crate::ports::account_port::AccountPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Floor for every per-symbol fetch window, in bars.
    pub min_fetch_days: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            min_fetch_days: DEFAULT_LOOKBACK_DAYS,
        }
    }
}

impl BatchSettings {
    /// Read `[batch]` settings; assumes the config already passed validation.
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let days = config.get_int("batch", "min_fetch_days", DEFAULT_LOOKBACK_DAYS as i64);
        Self {
            min_fetch_days: usize::try_from(days).unwrap_or(DEFAULT_LOOKBACK_DAYS),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub rule: TradingRule,
    pub result: EvaluationResult,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub triggered: usize,
    pub not_triggered: usize,
    pub errors: usize,
}

impl BatchStats {
    pub fn total(&self) -> usize {
        self.triggered + self.not_triggered + self.errors
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<RuleOutcome>,
    pub stats: BatchStats,
}

impl BatchOutcome {
    /// Rules whose condition held and were sized without error.
    pub fn triggered(&self) -> impl Iterator<Item = &RuleOutcome> {
        self.results.iter().filter(|o| o.result.triggered)
    }

    fn record(&mut self, rule: &TradingRule, result: EvaluationResult) {
        if let Some(error) = &result.metadata.error {
            warn!(rule_id = %rule.id, symbol = %rule.symbol, %error, "rule evaluation failed");
            self.stats.errors += 1;
        } else if result.triggered {
            debug!(rule_id = %rule.id, symbol = %rule.symbol, quantity = result.quantity, "rule triggered");
            self.stats.triggered += 1;
        } else {
            debug!(rule_id = %rule.id, symbol = %rule.symbol, "rule not triggered");
            self.stats.not_triggered += 1;
        }
        self.results.push(RuleOutcome {
            rule: rule.clone(),
            result,
        });
    }
}

/// Active rules grouped by symbol, in order of first appearance.
pub fn group_by_symbol(rules: &[TradingRule]) -> Vec<(&str, Vec<&TradingRule>)> {
    let mut groups: Vec<(&str, Vec<&TradingRule>)> = Vec::new();
    for rule in rules.iter().filter(|r| r.is_active) {
        match groups.iter_mut().find(|(symbol, _)| *symbol == rule.symbol) {
            Some((_, members)) => members.push(rule),
            None => groups.push((rule.symbol.as_str(), vec![rule])),
        }
    }
    groups
}

/// Bars of history a single rule needs, counting its quantity expression.
pub fn rule_lookback_days(rule: &TradingRule) -> usize {
    let lookback = |text: &str| {
        parse(text)
            .map(|expr| required_lookback_days(&expr))
            .unwrap_or(DEFAULT_LOOKBACK_DAYS)
    };
    let trigger = lookback(&rule.expression);
    match rule.quantity_type {
        QuantityType::Expression => trigger.max(lookback(&rule.quantity_value)),
        QuantityType::Fixed | QuantityType::Percentage => trigger,
    }
}

/// Fetch window per symbol for the active rules in `rules`.
pub fn plan_fetch(rules: &[TradingRule], settings: &BatchSettings) -> Vec<(String, usize)> {
    group_by_symbol(rules)
        .into_iter()
        .map(|(symbol, members)| {
            let days = members
                .iter()
                .map(|r| rule_lookback_days(r))
                .max()
                .unwrap_or(DEFAULT_LOOKBACK_DAYS)
                .max(settings.min_fetch_days);
            (symbol.to_string(), days)
        })
        .collect()
}

/// Evaluate rules against already-fetched series.
///
/// A symbol missing from `series_by_symbol` errors all of its rules.
/// `available_cash` is shared by every PERCENTAGE rule in the batch.
pub fn evaluate_batch(
    rules: &[TradingRule],
    series_by_symbol: &HashMap<String, TimeSeries>,
    available_cash: Option<f64>,
) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for (symbol, members) in group_by_symbol(rules) {
        let series = series_by_symbol
            .get(symbol)
            .ok_or_else(|| RuletraderError::NoData {
                symbol: symbol.to_string(),
            });
        for rule in members {
            let result = match &series {
                Ok(series) => evaluate_rule(rule, series, available_cash)
                    .unwrap_or_else(EvaluationResult::errored),
                Err(e) => EvaluationResult::errored(e),
            };
            outcome.record(rule, result);
        }
    }
    log_summary(&outcome.stats);
    outcome
}

/// Plan, fetch and evaluate a batch.
///
/// Each symbol is fetched on its own scoped thread. Cash is looked up at most
/// once per user, and only for users whose PERCENTAGE rules fire.
pub fn run_batch(
    rules: &[TradingRule],
    data_port: &dyn DataPort,
    account_port: &dyn AccountPort,
    settings: &BatchSettings,
) -> BatchOutcome {
    let plan = plan_fetch(rules, settings);
    info!(symbols = plan.len(), "fetching price history");

    let fetched: Vec<Result<TimeSeries, RuletraderError>> = thread::scope(|scope| {
        let handles: Vec<_> = plan
            .iter()
            .map(|(symbol, days)| {
                scope.spawn(move || {
                    debug!(%symbol, days = *days, "fetching");
                    data_port.fetch_historical_data(symbol, *days)
                })
            })
            .collect();
        handles
            .into_iter()
            .zip(&plan)
            .map(|(handle, (symbol, _))| {
                handle.join().unwrap_or_else(|_| {
                    Err(RuletraderError::DataFetch {
                        symbol: symbol.clone(),
                        reason: "fetch thread panicked".to_string(),
                    })
                })
            })
            .collect()
    });

    let mut cash = CashLedger::new(account_port);
    let mut outcome = BatchOutcome::default();
    for ((symbol, members), series) in group_by_symbol(rules).into_iter().zip(fetched) {
        let series = match series {
            Ok(series) => series,
            Err(e) => {
                warn!(%symbol, error = %e, "fetch failed");
                for rule in members {
                    outcome.record(rule, EvaluationResult::errored(&e));
                }
                continue;
            }
        };
        for rule in members {
            let result = evaluate_rule_with_cash(rule, &series, || {
                cash.for_rule(rule)
                    .map_err(|reason| SizingError::CashUnavailable { reason })
            })
            .unwrap_or_else(EvaluationResult::errored);
            outcome.record(rule, result);
        }
    }
    log_summary(&outcome.stats);
    outcome
}

fn log_summary(stats: &BatchStats) {
    info!(
        triggered = stats.triggered,
        not_triggered = stats.not_triggered,
        errors = stats.errors,
        "batch complete"
    );
}

/// Memoized per-user cash lookups.
struct CashLedger<'a> {
    port: &'a dyn AccountPort,
    balances: HashMap<String, Result<f64, String>>,
}

impl<'a> CashLedger<'a> {
    fn new(port: &'a dyn AccountPort) -> Self {
        Self {
            port,
            balances: HashMap::new(),
        }
    }

    fn for_rule(&mut self, rule: &TradingRule) -> Result<Option<f64>, String> {
        if rule.quantity_type != QuantityType::Percentage {
            return Ok(None);
        }
        let port = self.port;
        self.balances
            .entry(rule.user_id.clone())
            .or_insert_with(|| port.available_cash(&rule.user_id).map_err(|e| e.to_string()))
            .clone()
            .map(Some)
    }
}
