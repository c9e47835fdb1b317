//! Cross-sectional screen rows and the sector-relative exposures derived from them.

use serde::{Deserialize, Serialize};

use super::factors::FactorVector;

pub const DEFAULT_SECTOR: &str = "Other";

/// One screened symbol. Every numeric field is optional; absence means
/// "unknown", never zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenerRow {
    pub symbol: String,

    #[serde(default)]
    pub sector: Option<String>,

    #[serde(default)]
    pub pe_ratio: Option<f64>,

    #[serde(default)]
    pub dividend_yield: Option<f64>,

    /// Annualized volatility
    #[serde(default)]
    pub volatility: Option<f64>,

    #[serde(default)]
    pub debt_ratio: Option<f64>,

    /// Model momentum score, preferred over `score`
    #[serde(default)]
    pub ml_score: Option<f64>,

    #[serde(default)]
    pub score: Option<f64>,
}

impl ScreenerRow {
    /// Sector bucket, "Other" when absent or blank.
    pub fn sector_or_default(&self) -> &str {
        match self.sector.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => s,
            _ => DEFAULT_SECTOR,
        }
    }
}

/// Sector-relative z-scores for one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorExposure {
    pub symbol: String,
    pub sector: String,
    #[serde(flatten)]
    pub z: FactorVector,
}
