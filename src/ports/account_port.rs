//! Account balance port.

use crate::domain::error::RuletraderError;

pub trait AccountPort {
    fn available_cash(&self, user_id: &str) -> Result<f64, RuletraderError>;
}
