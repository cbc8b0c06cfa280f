//! Core domain types and logic.

pub mod batch;
pub mod config_validation;
pub mod context;
pub mod error;
pub mod evaluation;
pub mod expr;
pub mod indicator;
pub mod ohlcv;
pub mod quantity;
pub mod rule;
pub mod rule_eval;
pub mod rule_parser;
pub mod rule_validate;
