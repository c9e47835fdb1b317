//! Profile to factor tilts: base weights plus additive nudges, normalized.

use tracing::debug;

use crate::models::{Factor, FactorTilts, FactorVector, Profile, RiskTolerance};

use super::config::TiltRules;

/// Derives [`FactorTilts`] from a [`Profile`].
pub struct TiltBuilder<'a> {
    rules: &'a TiltRules,
}

impl<'a> TiltBuilder<'a> {
    pub fn new(rules: &'a TiltRules) -> Self {
        Self { rules }
    }

    /// Weights are non-negative and sum to one.
    pub fn build(&self, profile: &Profile) -> FactorTilts {
        let mut raw = self.rules.base;

        match profile.risk_tolerance {
            RiskTolerance::Conservative => add(&mut raw, &self.rules.conservative),
            RiskTolerance::Aggressive => add(&mut raw, &self.rules.aggressive),
            RiskTolerance::Moderate => {}
        }

        // Each goal family applies at most once, however many goals match it
        for rule in &self.rules.goal_nudges {
            let keywords: Vec<&str> = rule.keywords.iter().map(String::as_str).collect();
            if profile.has_goal_matching(&keywords) {
                add(&mut raw, &rule.nudge);
            }
        }

        if profile.horizon().is_short() {
            add(&mut raw, &self.rules.short_horizon);
        }

        let tilts = FactorTilts::normalize(raw);
        debug!(
            value = tilts.weight(Factor::Value),
            quality = tilts.weight(Factor::Quality),
            momentum = tilts.weight(Factor::Momentum),
            low_vol = tilts.weight(Factor::LowVol),
            yield_ = tilts.weight(Factor::Yield),
            "Derived factor tilts"
        );
        tilts
    }
}

fn add(target: &mut FactorVector, nudge: &FactorVector) {
    for f in Factor::ALL {
        *target.get_mut(f) += nudge.get(f);
    }
}
