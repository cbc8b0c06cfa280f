//! Trading rule definitions.
//!
//! A `TradingRule` pairs a condition expression with the order to place when it
//! holds. Rules are plain input data; parsing happens at evaluation time.

use crate::domain::quantity::QuantityType;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    /// Signed cash movement for a fill of `total`: buying spends, selling receives.
    pub fn cash_delta(&self, total: f64) -> f64 {
        match self {
            TradeAction::Buy => -total,
            TradeAction::Sell => total,
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => f.write_str("BUY"),
            TradeAction::Sell => f.write_str("SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradingRule {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub expression: String,
    pub action: TradeAction,
    pub quantity_type: QuantityType,
    pub quantity_value: String,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cash_delta_sign_follows_action() {
        assert_eq!(TradeAction::Buy.cash_delta(500.0), -500.0);
        assert_eq!(TradeAction::Sell.cash_delta(500.0), 500.0);
    }

    #[test]
    fn action_display() {
        assert_eq!(TradeAction::Buy.to_string(), "BUY");
        assert_eq!(TradeAction::Sell.to_string(), "SELL");
    }
}
