//! Available cash from the `[cash]` config section.

use crate::domain::error::RuletraderError;
use crate::ports::account_port::AccountPort;
use crate::ports::config_port::ConfigPort;

/// Per-user cash keyed by user id, falling back to `default`.
pub struct ConfigCashAdapter<'a> {
    config: &'a dyn ConfigPort,
}

impl<'a> ConfigCashAdapter<'a> {
    pub fn new(config: &'a dyn ConfigPort) -> Self {
        Self { config }
    }
}

impl AccountPort for ConfigCashAdapter<'_> {
    fn available_cash(&self, user_id: &str) -> Result<f64, RuletraderError> {
        [user_id, "default"]
            .into_iter()
            .find_map(|key| self.config.get_string("cash", key))
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|cash| cash.is_finite() && *cash >= 0.0)
            .ok_or_else(|| RuletraderError::CashUnavailable {
                user_id: user_id.to_string(),
            })
    }
}
