//! Expression validation and static analysis.
//!
//! Validation walks a parsed [`Expr`] and rejects vocabulary the engine cannot
//! evaluate. The analyses here inspect a tree without evaluating it, so they can
//! run before any market data is fetched.

use crate::domain::error::ValidationError;
use crate::domain::expr::{Expr, Property};
use crate::domain::indicator::IndicatorType;

/// Lookback used when an expression references no indicator.
pub const DEFAULT_LOOKBACK_DAYS: usize = 30;
/// Upper bound on the history requested for any expression.
pub const MAX_LOOKBACK_DAYS: usize = 365;

/// Check that every name and call shape belongs to the grammar.
pub fn validate(expr: &Expr) -> Result<(), ValidationError> {
    match expr {
        Expr::Binary { left, right, .. } => {
            validate(left)?;
            validate(right)
        }
        Expr::Unary { operand, .. } => validate(operand),
        Expr::Call { function, args } => resolve_call(function, args).map(|_| ()),
        Expr::Identifier(name) => match Property::from_name(name) {
            Some(_) => Ok(()),
            None => Err(ValidationError::UnknownIdentifier { name: name.clone() }),
        },
        Expr::Literal(_) => Ok(()),
    }
}

/// Resolve a call node into an indicator, checking name, arity and period.
pub fn resolve_call(function: &str, args: &[Expr]) -> Result<IndicatorType, ValidationError> {
    if !IndicatorType::is_known_function(function) {
        return Err(ValidationError::UnknownFunction {
            name: function.to_string(),
        });
    }

    let [arg] = args else {
        return Err(ValidationError::WrongArity {
            function: function.to_string(),
            expected: 1,
            found: args.len(),
        });
    };

    let Expr::Literal(value) = *arg else {
        return Err(ValidationError::NonLiteralArgument {
            function: function.to_string(),
        });
    };

    if value <= 0.0 {
        return Err(ValidationError::NonPositivePeriod {
            function: function.to_string(),
            value,
        });
    }
    if value.fract() != 0.0 || !value.is_finite() {
        return Err(ValidationError::NonIntegerPeriod {
            function: function.to_string(),
            value,
        });
    }

    IndicatorType::from_call(function, value as usize).ok_or_else(|| {
        ValidationError::UnknownFunction {
            name: function.to_string(),
        }
    })
}

/// Every well-formed indicator call in the tree, in traversal order.
pub fn extract_indicators(expr: &Expr) -> Vec<IndicatorType> {
    let mut indicators = Vec::new();
    expr.walk(&mut |node| {
        if let Expr::Call { function, args } = node {
            if let Ok(indicator) = resolve_call(function, args) {
                indicators.push(indicator);
            }
        }
    });
    indicators
}

/// Days of history needed before every indicator in `expr` can produce a value.
///
/// `max(period * multiplier)` over the referenced indicators, defaulting to
/// [`DEFAULT_LOOKBACK_DAYS`] and capped at [`MAX_LOOKBACK_DAYS`].
pub fn required_lookback_days(expr: &Expr) -> usize {
    extract_indicators(expr)
        .iter()
        .map(|ind| ind.period().saturating_mul(ind.lookback_multiplier()))
        .max()
        .unwrap_or(DEFAULT_LOOKBACK_DAYS)
        .min(MAX_LOOKBACK_DAYS)
}
