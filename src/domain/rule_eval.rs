//! Expression evaluation engine.
//!
//! Evaluates an [`Expr`] against an [`EvaluationContext`] built from the latest bar.
//!
//! # Evaluation Semantics
//!
//! - Indicators with too little history evaluate to [`Value::Absent`]
//! - Comparisons with an absent side are `false`, except `!=`, which is `true`
//!   when exactly one side is absent
//! - `AND` with an absent side is `false`; `OR` falls back to the present side
//! - Arithmetic with an absent side is absent; division by zero is an error
//! - Both sides of a binary node are always evaluated, so errors are never masked
//! - A numeric trigger result is true when non-zero

use crate::domain::context::EvaluationContext;
use crate::domain::error::EvaluationError;
use crate::domain::expr::{BinaryOp, Expr, Property, UnaryOp};
use crate::domain::rule_validate::resolve_call;

const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Bool(bool),
    Num(f64),
    Absent,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Absent => "no value",
        }
    }

    /// Boolean coercion: absent and zero are false.
    pub fn truthy(&self) -> bool {
        match *self {
            Value::Bool(b) => b,
            Value::Num(n) => n != 0.0,
            Value::Absent => false,
        }
    }

    fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }
}

impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Value::Absent, Value::Num)
    }
}

pub fn evaluate(expr: &Expr, ctx: &EvaluationContext<'_>) -> Result<Value, EvaluationError> {
    match expr {
        Expr::Literal(v) => Ok(Value::Num(*v)),
        Expr::Identifier(name) => Property::from_name(name)
            .map(|p| Value::Num(ctx.property(p)))
            .ok_or_else(|| EvaluationError::UnknownIdentifier { name: name.clone() }),
        Expr::Call { function, args } => {
            let indicator =
                resolve_call(function, args).map_err(|e| EvaluationError::InvalidCall {
                    function: function.clone(),
                    reason: e.to_string(),
                })?;
            Ok(ctx.indicator(indicator).into())
        }
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => Ok(Value::Bool(!evaluate(operand, ctx)?.truthy())),
        Expr::Binary { op, left, right } => {
            let l = evaluate(left, ctx)?;
            let r = evaluate(right, ctx)?;
            apply_binary(*op, l, r)
        }
    }
}

/// Evaluate a rule condition to its trigger decision.
pub fn evaluate_trigger(expr: &Expr, ctx: &EvaluationContext<'_>) -> Result<bool, EvaluationError> {
    match evaluate(expr, ctx)? {
        Value::Bool(b) => Ok(b),
        Value::Num(n) => Ok(n != 0.0),
        other @ Value::Absent => Err(EvaluationError::UnsupportedResult {
            found: other.type_name(),
        }),
    }
}

fn apply_binary(op: BinaryOp, l: Value, r: Value) -> Result<Value, EvaluationError> {
    match op {
        BinaryOp::And => {
            if l.is_absent() || r.is_absent() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(l.truthy() && r.truthy()))
        }
        BinaryOp::Or => Ok(Value::Bool(match (l, r) {
            (Value::Absent, Value::Absent) => false,
            (Value::Absent, present) | (present, Value::Absent) => present.truthy(),
            (l, r) => l.truthy() || r.truthy(),
        })),
        BinaryOp::Ne if l.is_absent() || r.is_absent() => {
            Ok(Value::Bool(l.is_absent() != r.is_absent()))
        }
        _ if op.is_comparison() && (l.is_absent() || r.is_absent()) => Ok(Value::Bool(false)),
        BinaryOp::Eq | BinaryOp::Ne => {
            let equal = match (l, r) {
                (Value::Bool(a), Value::Bool(b)) => a == b,
                (Value::Num(a), Value::Num(b)) => (a - b).abs() < EPSILON,
                (a, b) => {
                    return Err(EvaluationError::TypeMismatch {
                        operator: op.symbol(),
                        expected: "operands of the same type",
                        found: if a.type_name() == "boolean" {
                            b.type_name()
                        } else {
                            a.type_name()
                        },
                    });
                }
            };
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            let (a, b) = numbers(op, l, r)?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Gt => a > b,
                BinaryOp::Le => a <= b,
                _ => a >= b,
            }))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            if l.is_absent() || r.is_absent() {
                return Ok(Value::Absent);
            }
            let (a, b) = numbers(op, l, r)?;
            Ok(Value::Num(match op {
                BinaryOp::Add => a + b,
                BinaryOp::Sub => a - b,
                BinaryOp::Mul => a * b,
                _ => {
                    if b == 0.0 {
                        return Err(EvaluationError::DivisionByZero);
                    }
                    a / b
                }
            }))
        }
    }
}

fn numbers(op: BinaryOp, l: Value, r: Value) -> Result<(f64, f64), EvaluationError> {
    match (l, r) {
        (Value::Num(a), Value::Num(b)) => Ok((a, b)),
        (Value::Num(_), other) | (other, _) => Err(EvaluationError::TypeMismatch {
            operator: op.symbol(),
            expected: "numbers",
            found: other.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ohlcv::{OhlcvBar, TimeSeries};
    use crate::domain::rule_parser::parse;
    use chrono::NaiveDate;

    fn make_bar(day: u32, close: f64, volume: f64) -> OhlcvBar {
        OhlcvBar {
            datetime: NaiveDate::from_ymd_opt(2024, 1, day)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            open: close - 1.0,
            high: close + 2.0,
            low: close - 2.0,
            close,
            volume,
        }
    }

    fn series(closes: &[f64]) -> TimeSeries {
        TimeSeries::new(
            "TEST",
            closes
                .iter()
                .enumerate()
                .map(|(i, &c)| make_bar(i as u32 + 1, c, 1000.0 * (i + 1) as f64))
                .collect(),
        )
    }

    fn trigger(input: &str, ts: &TimeSeries) -> Result<bool, EvaluationError> {
        let ctx = EvaluationContext::new(ts).unwrap();
        evaluate_trigger(&parse(input).unwrap(), &ctx)
    }

    fn value(input: &str, ts: &TimeSeries) -> Result<Value, EvaluationError> {
        let ctx = EvaluationContext::new(ts).unwrap();
        evaluate(&parse(input).unwrap(), &ctx)
    }

    #[test]
    fn close_above_constant() {
        assert_eq!(trigger("close > 100", &series(&[101.0])), Ok(true));
        assert_eq!(trigger("close > 100", &series(&[99.0])), Ok(false));
    }

    #[test]
    fn price_is_close_alias() {
        assert_eq!(trigger("price == close", &series(&[42.0])), Ok(true));
    }

    #[test]
    fn bar_fields_resolve() {
        let ts = series(&[50.0]);
        assert_eq!(value("open", &ts), Ok(Value::Num(49.0)));
        assert_eq!(value("high", &ts), Ok(Value::Num(52.0)));
        assert_eq!(value("low", &ts), Ok(Value::Num(48.0)));
        assert_eq!(value("volume", &ts), Ok(Value::Num(1000.0)));
    }

    #[test]
    fn insufficient_data_comparison_is_false() {
        let ts = series(&[10.0; 10]);
        assert_eq!(trigger("RSI(200) < 30", &ts), Ok(false));
        assert_eq!(trigger("RSI(200) > 30", &ts), Ok(false));
        assert_eq!(trigger("RSI(200) == 30", &ts), Ok(false));
    }

    #[test]
    fn absent_not_equal_semantics() {
        let ts = series(&[10.0; 10]);
        assert_eq!(trigger("RSI(200) != 30", &ts), Ok(true));
        assert_eq!(trigger("RSI(200) != SMA(100)", &ts), Ok(false));
    }

    #[test]
    fn absent_logical_semantics() {
        let ts = series(&[10.0; 10]);
        assert_eq!(trigger("SMA(50) AND close > 1", &ts), Ok(false));
        assert_eq!(trigger("SMA(50) OR close > 1", &ts), Ok(true));
        assert_eq!(trigger("close < 1 OR SMA(50)", &ts), Ok(false));
        assert_eq!(trigger("SMA(50) OR SMA(60)", &ts), Ok(false));
        assert_eq!(trigger("NOT SMA(50)", &ts), Ok(true));
    }

    #[test]
    fn absent_arithmetic_propagates() {
        let ts = series(&[10.0; 10]);
        assert_eq!(value("SMA(50) + 1", &ts), Ok(Value::Absent));
        assert_eq!(trigger("SMA(50) * 2 > 1", &ts), Ok(false));
    }

    #[test]
    fn absent_top_level_is_error() {
        let ts = series(&[10.0; 10]);
        assert_eq!(
            trigger("SMA(50)", &ts),
            Err(EvaluationError::UnsupportedResult { found: "no value" })
        );
    }

    #[test]
    fn numeric_trigger_nonzero_is_true() {
        let ts = series(&[10.0]);
        assert_eq!(trigger("close - 10", &ts), Ok(false));
        assert_eq!(trigger("close - 9", &ts), Ok(true));
    }

    #[test]
    fn logical_operators() {
        let ts = series(&[100.0]);
        assert_eq!(trigger("close > 50 AND close < 150", &ts), Ok(true));
        assert_eq!(trigger("close > 150 AND close < 200", &ts), Ok(false));
        assert_eq!(trigger("close > 150 OR close < 200", &ts), Ok(true));
        assert_eq!(trigger("NOT close > 50", &ts), Ok(false));
        assert_eq!(trigger("NOT (close > 150 OR close < 50)", &ts), Ok(true));
    }

    #[test]
    fn comparison_operators() {
        let ts = series(&[100.0]);
        assert_eq!(trigger("close >= 100", &ts), Ok(true));
        assert_eq!(trigger("close <= 100", &ts), Ok(true));
        assert_eq!(trigger("close < 100", &ts), Ok(false));
        assert_eq!(trigger("close == 100", &ts), Ok(true));
        assert_eq!(trigger("close != 100", &ts), Ok(false));
    }

    #[test]
    fn equality_tolerates_float_noise() {
        let ts = series(&[0.3]);
        assert_eq!(trigger("close == 0.1 + 0.2", &ts), Ok(true));
    }

    #[test]
    fn boolean_equality() {
        let ts = series(&[100.0]);
        assert_eq!(trigger("(close > 1) == (open > 1)", &ts), Ok(true));
        assert_eq!(trigger("(close > 1) != (open > 1000)", &ts), Ok(true));
    }

    #[test]
    fn arithmetic() {
        let ts = series(&[100.0]);
        assert_eq!(value("1000 / price", &ts), Ok(Value::Num(10.0)));
        assert_eq!(value("close * 2 - 50", &ts), Ok(Value::Num(150.0)));
        assert_eq!(value("(high - low) / 2", &ts), Ok(Value::Num(2.0)));
    }

    #[test]
    fn division_by_zero_is_error() {
        let ts = series(&[100.0]);
        assert_eq!(
            value("10 / (close - close)", &ts),
            Err(EvaluationError::DivisionByZero)
        );
    }

    #[test]
    fn errors_not_masked_by_logical_operators() {
        let ts = series(&[100.0]);
        assert_eq!(
            trigger("close < 0 AND 1 / 0 > 1", &ts),
            Err(EvaluationError::DivisionByZero)
        );
    }

    #[test]
    fn boolean_in_arithmetic_is_type_mismatch() {
        let ts = series(&[100.0]);
        assert_eq!(
            value("(close > 1) + 1", &ts),
            Err(EvaluationError::TypeMismatch {
                operator: "+",
                expected: "numbers",
                found: "boolean"
            })
        );
        assert!(matches!(
            trigger("(close > 1) < 5", &ts),
            Err(EvaluationError::TypeMismatch { operator: "<", .. })
        ));
        assert!(matches!(
            trigger("(close > 1) == 1", &ts),
            Err(EvaluationError::TypeMismatch { operator: "==", .. })
        ));
    }

    #[test]
    fn unknown_identifier_is_error() {
        let ts = series(&[100.0]);
        assert_eq!(
            trigger("vwap > 1", &ts),
            Err(EvaluationError::UnknownIdentifier {
                name: "vwap".into()
            })
        );
    }

    #[test]
    fn invalid_call_is_error() {
        let ts = series(&[100.0]);
        assert!(matches!(
            trigger("MACD(12) > 0", &ts),
            Err(EvaluationError::InvalidCall { .. })
        ));
        assert!(matches!(
            trigger("RSI(0) > 0", &ts),
            Err(EvaluationError::InvalidCall { .. })
        ));
    }

    #[test]
    fn rsi_on_rising_series_is_100() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let ts = series(&closes);
        assert_eq!(value("RSI(14)", &ts), Ok(Value::Num(100.0)));
        assert_eq!(trigger("RSI(14) > 70", &ts), Ok(true));
    }

    #[test]
    fn volume_above_average() {
        // Volumes 1000, 2000, 3000, 4000; avgVolume(3) = 3000.
        let ts = series(&[10.0, 11.0, 12.0, 13.0]);
        assert_eq!(trigger("volume > avgVolume(3)", &ts), Ok(true));
        assert_eq!(trigger("volume > avgVolume(3) * 2", &ts), Ok(false));
    }

    #[test]
    fn evaluation_does_not_mutate_inputs() {
        let ts = series(&[1.0, 2.0, 3.0]);
        let expr = parse("SMA(2) > 1 AND NOT volume < 0").unwrap();
        let before = expr.clone();
        let ctx = EvaluationContext::new(&ts).unwrap();
        let first = evaluate_trigger(&expr, &ctx);
        let second = evaluate_trigger(&expr, &ctx);
        assert_eq!(first, second);
        assert_eq!(expr, before);
    }
}
