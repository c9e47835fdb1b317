//! Wire types for the portfolio optimizer service.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{PersonalizedCandidate, Policy};

/// One ranked ticker as sent to the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerTicker {
    pub symbol: String,
    pub score: f64,
    pub sector: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vol: Option<f64>,
}

impl From<&PersonalizedCandidate> for OptimizerTicker {
    fn from(c: &PersonalizedCandidate) -> Self {
        Self {
            symbol: c.candidate.symbol.clone(),
            score: c.personalized_score,
            sector: c.sector().to_string(),
            vol: c.candidate.annualized_volatility,
        }
    }
}

/// Constraint subset of [`Policy`], passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerPolicy {
    pub vol_target: f64,
    pub name_cap_pct: f64,
    pub sector_cap_pct: f64,
    pub turnover_budget: f64,
    pub sector_overrides: BTreeMap<String, f64>,
}

impl From<&Policy> for OptimizerPolicy {
    fn from(p: &Policy) -> Self {
        Self {
            vol_target: p.vol_target,
            name_cap_pct: p.name_cap_pct,
            sector_cap_pct: p.sector_cap_pct,
            turnover_budget: p.turnover_budget,
            sector_overrides: p.sector_overrides.clone(),
        }
    }
}

/// POST body for the optimize endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerRequest {
    pub tickers: Vec<OptimizerTicker>,
    pub policy: OptimizerPolicy,
    #[serde(default)]
    pub prev_weights: BTreeMap<String, f64>,
}

impl OptimizerRequest {
    pub fn new(
        ranked: &[PersonalizedCandidate],
        policy: &Policy,
        prev_weights: &BTreeMap<String, f64>,
    ) -> Self {
        Self {
            tickers: ranked.iter().map(OptimizerTicker::from).collect(),
            policy: OptimizerPolicy::from(policy),
            prev_weights: prev_weights.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub symbol: String,
    pub weight: f64,
}

/// Response body from the optimize endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerResponse {
    pub weights: Vec<WeightEntry>,
    pub portfolio_vol: f64,
}

/// Parsed optimizer result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetWeights {
    pub weights: BTreeMap<String, f64>,
    pub portfolio_vol: f64,
}

impl From<OptimizerResponse> for TargetWeights {
    fn from(r: OptimizerResponse) -> Self {
        Self {
            weights: r.weights.into_iter().map(|w| (w.symbol, w.weight)).collect(),
            portfolio_vol: r.portfolio_vol,
        }
    }
}

impl TargetWeights {
    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }
}
