//! Single-rule evaluation: condition, then sizing when the condition holds.

use crate::domain::context::EvaluationContext;
use crate::domain::error::{RuleError, SizingError};
use crate::domain::ohlcv::TimeSeries;
use crate::domain::quantity::compute_quantity;
use crate::domain::rule::TradingRule;
use crate::domain::rule_eval::evaluate_trigger;
use crate::domain::rule_parser::parse;
use crate::domain::rule_validate::validate;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationMetadata {
    pub evaluated_at: DateTime<Utc>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub triggered: bool,
    /// Whole shares; zero unless triggered.
    pub quantity: u64,
    pub price: f64,
    pub total_amount: f64,
    pub metadata: EvaluationMetadata,
}

impl EvaluationResult {
    fn new(triggered: bool, quantity: u64, price: f64) -> Self {
        Self {
            triggered,
            quantity,
            price,
            total_amount: quantity as f64 * price,
            metadata: EvaluationMetadata {
                evaluated_at: Utc::now(),
                error: None,
            },
        }
    }

    /// A non-triggered result carrying the failure that prevented evaluation.
    pub fn errored(error: impl ToString) -> Self {
        let mut result = Self::new(false, 0, 0.0);
        result.metadata.error = Some(error.to_string());
        result
    }

    pub fn is_error(&self) -> bool {
        self.metadata.error.is_some()
    }
}

/// Evaluate one rule against its symbol's series.
///
/// The rule's `is_active` flag is not consulted here; filtering inactive rules
/// is the caller's job.
pub fn evaluate_rule(
    rule: &TradingRule,
    series: &TimeSeries,
    available_cash: Option<f64>,
) -> Result<EvaluationResult, RuleError> {
    evaluate_rule_with_cash(rule, series, || Ok(available_cash))
}

/// Evaluate one rule, calling `cash` only when the condition holds.
pub fn evaluate_rule_with_cash<F>(
    rule: &TradingRule,
    series: &TimeSeries,
    cash: F,
) -> Result<EvaluationResult, RuleError>
where
    F: FnOnce() -> Result<Option<f64>, SizingError>,
{
    let expr = parse(&rule.expression)?;
    validate(&expr)?;
    let ctx = EvaluationContext::new(series)?;
    let price = ctx.price();

    if !evaluate_trigger(&expr, &ctx)? {
        return Ok(EvaluationResult::new(false, 0, price));
    }

    let raw = compute_quantity(rule.quantity_type, &rule.quantity_value, &ctx, cash()?)?;
    let shares = raw.floor();
    if shares <= 0.0 {
        return Err(SizingError::NonPositive { quantity: shares }.into());
    }
    Ok(EvaluationResult::new(true, shares as u64, price))
}
