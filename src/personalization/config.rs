//! Engine configuration: every tunable constant behind policy, tilts and blending.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::models::{FactorVector, IncomeBracket};

/// Base policy parameters for one income band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandParams {
    pub vol_target: f64,
    pub cash_floor: f64,
    pub name_cap: f64,
    pub sector_cap: f64,
    pub per_trade_max: f64,
    pub position_min: f64,
    pub prefer_etfs: bool,
    pub exclude_high_vol: Option<f64>,
    pub min_market_cap: Option<Decimal>,
    pub turnover_budget: f64,
}

/// A goal keyword that lifts one sector's cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSectorOverride {
    pub keywords: Vec<String>,
    pub sector: String,
    /// Added to the default sector cap
    pub bump: f64,
    /// Upper bound on the overridden cap
    pub ceiling: f64,
}

/// A goal keyword that nudges factor weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalTiltNudge {
    pub keywords: Vec<String>,
    pub nudge: FactorVector,
}

/// Rules for turning a profile into a [`crate::models::Policy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyRules {
    pub bands: BTreeMap<IncomeBracket, BandParams>,

    /// Used when the bracket is missing or unrecognized
    pub default_band: BandParams,

    pub conservative_vol_mult: f64,
    pub moderate_vol_mult: f64,
    pub aggressive_vol_mult: f64,

    pub short_horizon_vol_mult: f64,
    pub short_horizon_cash_add: f64,
    pub long_horizon_vol_mult: f64,
    pub long_horizon_cash_add: f64,

    pub sector_overrides: Vec<GoalSectorOverride>,

    pub emergency_fund_keywords: Vec<String>,
    pub emergency_fund_cash_floor: f64,

    /// Portfolios below this value (USD) get ETF-first, no-dust settings
    pub small_account_threshold: Decimal,
    pub small_account_name_cap: f64,
    pub small_account_position_min: f64,

    pub max_cash_floor: f64,
}

impl Default for PolicyRules {
    fn default() -> Self {
        let band = |vol: f64,
                    cash: f64,
                    name: f64,
                    sector: f64,
                    per_trade: f64,
                    pos_min: f64,
                    etfs: bool,
                    high_vol: f64,
                    mcap: Decimal,
                    turnover: f64| BandParams {
            vol_target: vol,
            cash_floor: cash,
            name_cap: name,
            sector_cap: sector,
            per_trade_max: per_trade,
            position_min: pos_min,
            prefer_etfs: etfs,
            exclude_high_vol: Some(high_vol),
            min_market_cap: Some(mcap),
            turnover_budget: turnover,
        };

        let bands = BTreeMap::from([
            (
                IncomeBracket::Under30k,
                band(0.09, 0.12, 0.05, 0.20, 0.03, 0.01, true, 0.45, dec!(2000000000), 0.10),
            ),
            (
                IncomeBracket::From30kTo50k,
                band(0.11, 0.10, 0.06, 0.25, 0.04, 0.01, true, 0.50, dec!(1000000000), 0.12),
            ),
            (
                IncomeBracket::From50kTo75k,
                band(0.12, 0.08, 0.07, 0.27, 0.05, 0.0075, false, 0.55, dec!(1000000000), 0.15),
            ),
            (
                IncomeBracket::From75kTo100k,
                band(0.14, 0.06, 0.08, 0.30, 0.06, 0.005, false, 0.60, dec!(500000000), 0.18),
            ),
            (
                IncomeBracket::From100kTo150k,
                band(0.16, 0.05, 0.10, 0.30, 0.07, 0.005, false, 0.70, dec!(300000000), 0.20),
            ),
            (
                IncomeBracket::Over150k,
                band(0.18, 0.04, 0.12, 0.35, 0.08, 0.005, false, 0.80, dec!(300000000), 0.25),
            ),
        ]);

        // Middle-income band doubles as the fallback
        let default_band = bands[&IncomeBracket::From50kTo75k].clone();

        Self {
            bands,
            default_band,
            conservative_vol_mult: 0.8,
            moderate_vol_mult: 1.0,
            aggressive_vol_mult: 1.2,
            short_horizon_vol_mult: 0.85,
            short_horizon_cash_add: 0.02,
            long_horizon_vol_mult: 1.1,
            long_horizon_cash_add: -0.01,
            sector_overrides: vec![GoalSectorOverride {
                keywords: vec!["wealth".to_string()],
                sector: "Technology".to_string(),
                bump: 0.05,
                ceiling: 0.35,
            }],
            emergency_fund_keywords: vec!["emergency".to_string()],
            emergency_fund_cash_floor: 0.15,
            small_account_threshold: dec!(3000),
            small_account_name_cap: 0.05,
            small_account_position_min: 0.02,
            max_cash_floor: 0.25,
        }
    }
}

fn words(ws: &[&str]) -> Vec<String> {
    ws.iter().map(|w| w.to_string()).collect()
}

/// Rules for turning a profile into factor tilts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TiltRules {
    pub base: FactorVector,
    pub conservative: FactorVector,
    pub aggressive: FactorVector,
    pub goal_nudges: Vec<GoalTiltNudge>,
    pub short_horizon: FactorVector,
}

impl Default for TiltRules {
    fn default() -> Self {
        let v = |value, quality, momentum, low_vol, yield_| FactorVector {
            value,
            quality,
            momentum,
            low_vol,
            yield_,
        };
        Self {
            base: v(0.22, 0.22, 0.22, 0.18, 0.16),
            conservative: v(0.0, 0.0, -0.06, 0.06, 0.04),
            aggressive: v(0.02, 0.0, 0.08, -0.06, 0.0),
            goal_nudges: vec![
                GoalTiltNudge {
                    keywords: words(&["dividend", "passive income"]),
                    nudge: v(0.0, 0.0, 0.0, 0.02, 0.06),
                },
                GoalTiltNudge {
                    keywords: words(&["wealth", "growth"]),
                    nudge: v(0.0, 0.02, 0.04, 0.0, 0.0),
                },
                GoalTiltNudge {
                    keywords: words(&["retire"]),
                    nudge: v(0.0, 0.02, 0.0, 0.04, 0.0),
                },
            ],
            short_horizon: v(0.0, 0.0, 0.02, 0.0, 0.0),
        }
    }
}

/// Mixing weights between factor score and AI signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlendConfig {
    /// Weight on the factor score for short horizons
    pub alpha_short: f64,
    /// Weight on the factor score otherwise
    pub alpha_long: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            alpha_short: 0.45,
            alpha_long: 0.65,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub policy: PolicyRules,
    pub tilts: TiltRules,
    pub blend: BlendConfig,

    /// Floor on sector standard deviation
    pub zscore_epsilon: f64,

    /// Recommendation text that pauses buy output
    pub cash_gate_phrase: String,

    /// Smallest weight increase reported as a buy
    pub min_buy_delta: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: PolicyRules::default(),
            tilts: TiltRules::default(),
            blend: BlendConfig::default(),
            zscore_epsilon: 1e-9,
            cash_gate_phrase: "emergency cash".to_string(),
            min_buy_delta: 1e-4,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file, or defaults when no path is given.
    /// Keys missing from the file keep their default values.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_bracket_has_a_band() {
        let rules = PolicyRules::default();
        for bracket in IncomeBracket::ALL {
            assert!(rules.bands.contains_key(&bracket), "missing {bracket}");
        }
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"blend": {"alphaShort": 0.5}, "zscoreEpsilon": 1e-6}"#)
                .unwrap();

        assert_eq!(config.blend.alpha_short, 0.5);
        assert_eq!(config.blend.alpha_long, 0.65);
        assert_eq!(config.zscore_epsilon, 1e-6);
        assert_eq!(config.cash_gate_phrase, "emergency cash");
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let json = serde_json::to_string(&EngineConfig::default()).unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.policy.bands, PolicyRules::default().bands);
    }

    #[test]
    fn test_load_without_path_is_default() {
        let config = EngineConfig::load(None).unwrap();
        assert_eq!(config.min_buy_delta, 1e-4);
    }
}
