//! Numeric risk and allocation constraints derived from a profile.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Risk policy. All percentages are fractions of portfolio value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Target annualized portfolio volatility
    pub vol_target: f64,

    /// Minimum fraction held as cash, always within [0, 0.25]
    pub cash_floor_pct: f64,

    /// Maximum weight for a single name
    pub name_cap_pct: f64,

    /// Maximum weight for a single sector
    pub sector_cap_pct: f64,

    /// Maximum fraction of the portfolio moved by one trade
    pub per_trade_max_pct: f64,

    /// Smallest position worth opening
    pub position_min_pct: f64,

    /// Maximum fraction of the portfolio that may change per rebalance
    pub turnover_budget: f64,

    pub prefer_etfs: bool,

    /// Per-sector cap overrides
    #[serde(default)]
    pub sector_overrides: BTreeMap<String, f64>,

    /// Candidates with annualized volatility above this are dropped
    pub exclude_high_vol: Option<f64>,

    /// Candidates with market cap (USD) below this are dropped
    pub min_market_cap: Option<Decimal>,
}

impl Policy {
    /// Effective cap for a sector: the override when present, else the default cap.
    pub fn sector_cap_for(&self, sector: &str) -> f64 {
        self.sector_overrides
            .get(sector)
            .copied()
            .unwrap_or(self.sector_cap_pct)
    }

    /// Whether the current cash ratio sits below the cash floor.
    pub fn below_cash_floor(&self, cash_ratio: f64) -> bool {
        cash_ratio < self.cash_floor_pct
    }
}
