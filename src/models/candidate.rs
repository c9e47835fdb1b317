//! AI-sourced buy candidates and their personalized form.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::factors::FactorVector;
use super::screener::FactorExposure;

/// One upstream buy idea.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub symbol: String,

    /// Decimal units, 0.05 = 5%
    #[serde(default)]
    pub expected_return: Option<f64>,

    /// 0.0 to 1.0
    #[serde(default)]
    pub confidence: Option<f64>,

    /// USD
    #[serde(default)]
    pub market_cap: Option<Decimal>,

    #[serde(default)]
    pub annualized_volatility: Option<f64>,

    #[serde(default)]
    pub sector: Option<String>,

    /// Everything else the producer sent, carried through untouched
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A candidate after filtering and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalizedCandidate {
    #[serde(flatten)]
    pub candidate: Candidate,

    #[serde(rename = "_personalizedScore")]
    pub personalized_score: f64,

    #[serde(rename = "_factors", default)]
    pub factors: Option<FactorExposure>,

    /// Per-factor `z * tilt`
    #[serde(rename = "_factorContrib")]
    pub factor_contrib: FactorVector,
}

impl PersonalizedCandidate {
    /// Sector for the optimizer: candidate field, then screen, then "Other".
    pub fn sector(&self) -> &str {
        self.candidate
            .sector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| self.factors.as_ref().map(|f| f.sector.as_str()))
            .unwrap_or(super::screener::DEFAULT_SECTOR)
    }
}
