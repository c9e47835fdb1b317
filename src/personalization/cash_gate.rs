//! Cash safety gate: pauses equity-buy output while emergency cash is short.
//!
//! The preferred input is a structured [`RiskSignal`] from the risk
//! assessment producer. Free-text recommendations are still accepted for
//! producers that only emit display strings; they are matched against a
//! configurable phrase, case-insensitively.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::Policy;

/// Structured signal from the upstream risk assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "camelCase")]
pub enum RiskSignal {
    EmergencyCashShortfall,
    Other(String),
}

/// Everything the gate may look at. All parts are optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateInput {
    #[serde(default)]
    pub signals: Vec<RiskSignal>,

    #[serde(default)]
    pub recommendations: Vec<String>,

    /// Current cash as a fraction of portfolio value, when known
    #[serde(default)]
    pub cash_ratio: Option<f64>,
}

/// Why the gate closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PauseReason {
    Signal,
    Recommendation,
    BelowCashFloor,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateDecision {
    pub paused: bool,
    pub reason: Option<PauseReason>,
}

pub struct CashSafetyGate {
    phrase: String,
}

impl CashSafetyGate {
    pub fn new(phrase: &str) -> Self {
        Self {
            phrase: phrase.to_lowercase(),
        }
    }

    /// True when any recommendation mentions the gate phrase.
    pub fn flagged_by_text(&self, recommendations: &[String]) -> bool {
        recommendations
            .iter()
            .any(|r| r.to_lowercase().contains(&self.phrase))
    }

    /// Evaluate all inputs. Pure: the same input always gives the same answer.
    pub fn evaluate(&self, input: &GateInput, policy: &Policy) -> GateDecision {
        let reason = if input.signals.contains(&RiskSignal::EmergencyCashShortfall) {
            Some(PauseReason::Signal)
        } else if self.flagged_by_text(&input.recommendations) {
            Some(PauseReason::Recommendation)
        } else if input
            .cash_ratio
            .is_some_and(|ratio| policy.below_cash_floor(ratio))
        {
            Some(PauseReason::BelowCashFloor)
        } else {
            None
        };

        if let Some(reason) = reason {
            info!(reason = ?reason, cash_floor = policy.cash_floor_pct, "Equity buys paused");
        }

        GateDecision {
            paused: reason.is_some(),
            reason,
        }
    }
}
