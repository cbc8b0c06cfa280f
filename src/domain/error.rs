//! Domain error types.
//!
//! Each stage of rule evaluation has its own error so callers can tell a
//! syntax problem from a vocabulary problem from a data problem.

/// A parse error with position information for expression parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Well-formed expression that uses vocabulary outside the grammar.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown function '{name}' (expected one of RSI, SMA, EMA, avgVolume)")]
    UnknownFunction { name: String },

    #[error("{function} takes exactly {expected} argument, found {found}")]
    WrongArity {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("{function} argument must be a numeric literal")]
    NonLiteralArgument { function: String },

    #[error("{function} period must be an integer, found {value}")]
    NonIntegerPeriod { function: String, value: f64 },

    #[error("{function} period must be positive, found {value}")]
    NonPositivePeriod { function: String, value: f64 },

    #[error("unknown property '{name}' (expected one of close, open, high, low, volume, price)")]
    UnknownIdentifier { name: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContextError {
    #[error("no price data for {symbol}")]
    EmptySeries { symbol: String },

    #[error("latest bar for {symbol} has a non-numeric {field}")]
    MalformedBar { symbol: String, field: &'static str },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvaluationError {
    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },

    #[error("invalid call {function}: {reason}")]
    InvalidCall { function: String, reason: String },

    #[error("operator {operator} expects {expected}, found {found}")]
    TypeMismatch {
        operator: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("expression produced {found}, expected a boolean or number")]
    UnsupportedResult { found: &'static str },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SizingError {
    #[error("invalid {quantity_type} quantity value '{value}'")]
    InvalidValue {
        quantity_type: &'static str,
        value: String,
    },

    #[error("percentage must be in (0, 100], found {value}")]
    PercentageOutOfRange { value: f64 },

    #[error("PERCENTAGE sizing requires available cash")]
    MissingCash,

    #[error("{reason}")]
    CashUnavailable { reason: String },

    #[error("cannot size against a non-positive price {price}")]
    NonPositivePrice { price: f64 },

    #[error("quantity expression produced {found}, expected a positive number")]
    NonNumericResult { found: String },

    #[error("computed quantity {quantity} is not positive")]
    NonPositive { quantity: f64 },
}

/// Any failure while evaluating a single rule.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("invalid expression: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("evaluation failed: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("sizing failed: {0}")]
    Sizing(#[from] SizingError),
}

/// Top-level error type for ruletrader.
#[derive(Debug, thiserror::Error)]
pub enum RuletraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid rule file {file}: {reason}")]
    RuleFile { file: String, reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("failed to fetch data for {symbol}: {reason}")]
    DataFetch { symbol: String, reason: String },

    #[error("no available cash for user {user_id}")]
    CashUnavailable { user_id: String },

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ParseError> for RuletraderError {
    fn from(err: ParseError) -> Self {
        RuletraderError::Rule(err.into())
    }
}

impl From<ValidationError> for RuletraderError {
    fn from(err: ValidationError) -> Self {
        RuletraderError::Rule(err.into())
    }
}

impl From<&RuletraderError> for std::process::ExitCode {
    fn from(err: &RuletraderError) -> Self {
        let code: u8 = match err {
            RuletraderError::Io(_) => 1,
            RuletraderError::ConfigParse { .. }
            | RuletraderError::ConfigMissing { .. }
            | RuletraderError::ConfigInvalid { .. } => 2,
            RuletraderError::DataFetch { .. } | RuletraderError::CashUnavailable { .. } => 3,
            RuletraderError::Rule(_) | RuletraderError::RuleFile { .. } => 4,
            RuletraderError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
