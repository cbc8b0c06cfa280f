//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use crate::adapters::config_cash_adapter::ConfigCashAdapter;
use crate::adapters::csv_adapter::{load_rules, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::batch::{run_batch, BatchOutcome, BatchSettings};
use crate::domain::config_validation::{validate_batch_config, validate_engine_config};
use crate::domain::error::{RuletraderError, ValidationError};
use crate::domain::expr::Expr;
use crate::domain::indicator::IndicatorType;
use crate::domain::rule_parser;
use crate::domain::rule_validate::{extract_indicators, required_lookback_days, resolve_call, validate};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

#[derive(Parser, Debug)]
#[command(name = "ruletrader", about = "Evaluate trading rules against recent price history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate every active rule in a rules file
    Evaluate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        rules: PathBuf,
        /// Price directory, overriding [data] path
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
    /// Parse and validate a rule expression
    Check {
        #[arg(short, long)]
        expression: String,
    },
    /// Print an indicator's recent history for a symbol
    History {
        #[arg(short, long)]
        data: PathBuf,
        #[arg(short, long)]
        symbol: String,
        /// Indicator call, e.g. "RSI(14)"
        #[arg(short, long)]
        indicator: String,
        #[arg(short, long, default_value_t = 30)]
        limit: usize,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    init_logging();
    match cli.command {
        Command::Evaluate {
            config,
            rules,
            data,
        } => run_evaluate(&config, &rules, data.as_deref()),
        Command::Check { expression } => run_check(&expression),
        Command::History {
            data,
            symbol,
            indicator,
            limit,
        } => run_history(&data, &symbol, &indicator, limit),
    }
}

/// Logs go to stderr; command output goes to stdout.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_evaluate(config_path: &Path, rules_path: &Path, data_override: Option<&Path>) -> ExitCode {
    info!(config = %config_path.display(), "loading config");
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let validated = match data_override {
        Some(_) => validate_batch_config(&config),
        None => validate_engine_config(&config),
    };
    if let Err(e) = validated {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let data_dir = match data_override {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from(config.get_string("data", "path").unwrap_or_default().trim()),
    };

    let rules = match load_rules(rules_path) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    info!(rules = rules.len(), data = %data_dir.display(), "evaluating rules");

    let data_port = CsvAdapter::new(data_dir);
    let account_port = ConfigCashAdapter::new(&config);
    let settings = BatchSettings::from_config(&config);
    let outcome = run_batch(&rules, &data_port, &account_port, &settings);

    print_outcome(&outcome);
    ExitCode::SUCCESS
}

fn print_outcome(outcome: &BatchOutcome) {
    for entry in &outcome.results {
        let rule = &entry.rule;
        let result = &entry.result;
        let status = match &result.metadata.error {
            Some(error) => format!("ERROR {}", error),
            None if result.triggered => format!(
                "TRIGGERED {} {} @ {:.2} = {:.2} (cash {:+.2})",
                rule.action,
                result.quantity,
                result.price,
                result.total_amount,
                rule.action.cash_delta(result.total_amount)
            ),
            None => format!("not triggered @ {:.2}", result.price),
        };
        println!("{:<12} {:<8} {}", rule.id, rule.symbol, status);
    }
    println!(
        "\ntriggered: {}, not triggered: {}, errors: {}",
        outcome.stats.triggered, outcome.stats.not_triggered, outcome.stats.errors
    );
}

fn run_check(expression: &str) -> ExitCode {
    let expr = match rule_parser::parse(expression) {
        Ok(expr) => expr,
        Err(e) => {
            eprintln!("error: {}", e.display_with_context(expression));
            return (&RuletraderError::from(e)).into();
        }
    };
    if let Err(e) = validate(&expr) {
        eprintln!("error: {e}");
        return (&RuletraderError::from(e)).into();
    }

    let functions: Vec<String> = extract_indicators(&expr)
        .iter()
        .map(|ind| ind.to_string())
        .collect();
    println!("Parsed:    {}", expr);
    println!(
        "Functions: {}",
        if functions.is_empty() {
            "none".to_string()
        } else {
            functions.join(", ")
        }
    );
    println!("Lookback:  {} days", required_lookback_days(&expr));
    ExitCode::SUCCESS
}

/// Parse a single indicator call such as `SMA(20)`.
fn parse_indicator(text: &str) -> Result<IndicatorType, RuletraderError> {
    match rule_parser::parse(text)? {
        Expr::Call { function, args } => Ok(resolve_call(&function, &args)?),
        other => Err(ValidationError::UnknownFunction {
            name: other.to_string(),
        }
        .into()),
    }
}

fn run_history(data_dir: &Path, symbol: &str, indicator: &str, limit: usize) -> ExitCode {
    let indicator = match parse_indicator(indicator) {
        Ok(ind) => ind,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Fetch enough extra bars for the first printed point to be warmed up.
    let warmup = indicator
        .period()
        .saturating_mul(indicator.lookback_multiplier());
    let adapter = CsvAdapter::new(data_dir.to_path_buf());
    let series = match adapter.fetch_historical_data(symbol, limit.saturating_add(warmup)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let history = indicator.history(series.bars());
    let skip = history.values.len().saturating_sub(limit);
    println!("{} {}", symbol, history.indicator_type);
    for point in &history.values[skip..] {
        if point.valid {
            println!("{}  {:.4}", point.datetime.format("%Y-%m-%d %H:%M"), point.value);
        } else {
            println!("{}  -", point.datetime.format("%Y-%m-%d %H:%M"));
        }
    }
    ExitCode::SUCCESS
}
