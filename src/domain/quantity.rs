//! Position sizing for triggered rules.

use crate::domain::context::EvaluationContext;
use crate::domain::error::{RuleError, SizingError};
use crate::domain::rule_eval::{evaluate, Value};
use crate::domain::rule_parser::parse;
use crate::domain::rule_validate::validate;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuantityType {
    Fixed,
    Percentage,
    Expression,
}

impl QuantityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuantityType::Fixed => "FIXED",
            QuantityType::Percentage => "PERCENTAGE",
            QuantityType::Expression => "EXPRESSION",
        }
    }
}

impl fmt::Display for QuantityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrounded share count for a rule; the caller floors it to whole shares.
pub fn compute_quantity(
    quantity_type: QuantityType,
    value: &str,
    ctx: &EvaluationContext<'_>,
    available_cash: Option<f64>,
) -> Result<f64, RuleError> {
    match quantity_type {
        QuantityType::Fixed => Ok(parse_positive(quantity_type, value)?),
        QuantityType::Percentage => {
            let percent = parse_positive(quantity_type, value)?;
            if percent > 100.0 {
                return Err(SizingError::PercentageOutOfRange { value: percent }.into());
            }
            let cash = available_cash.ok_or(SizingError::MissingCash)?;
            let price = ctx.price();
            if price <= 0.0 {
                return Err(SizingError::NonPositivePrice { price }.into());
            }
            Ok(cash * percent / 100.0 / price)
        }
        QuantityType::Expression => {
            let expr = parse(value)?;
            validate(&expr)?;
            match evaluate(&expr, ctx)? {
                Value::Num(n) if n.is_finite() && n > 0.0 => Ok(n),
                Value::Num(n) if n.is_finite() => {
                    Err(SizingError::NonPositive { quantity: n }.into())
                }
                Value::Num(n) => Err(SizingError::NonNumericResult {
                    found: n.to_string(),
                }
                .into()),
                other => Err(SizingError::NonNumericResult {
                    found: other.type_name().to_string(),
                }
                .into()),
            }
        }
    }
}

fn parse_positive(quantity_type: QuantityType, value: &str) -> Result<f64, SizingError> {
    let invalid = || SizingError::InvalidValue {
        quantity_type: quantity_type.as_str(),
        value: value.to_string(),
    };
    let parsed: f64 = value.trim().parse().map_err(|_| invalid())?;
    if !parsed.is_finite() || parsed <= 0.0 {
        return Err(invalid());
    }
    Ok(parsed)
}
