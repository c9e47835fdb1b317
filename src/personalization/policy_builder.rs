//! Profile to policy: income band base tuple, then risk, horizon, goal and
//! account-size adjustments, then a final cash-floor clamp.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{Horizon, Policy, Profile, RiskTolerance};

use super::config::{BandParams, PolicyRules};

/// Derives a [`Policy`] from a [`Profile`].
pub struct PolicyBuilder<'a> {
    rules: &'a PolicyRules,
}

impl<'a> PolicyBuilder<'a> {
    pub fn new(rules: &'a PolicyRules) -> Self {
        Self { rules }
    }

    /// Build the policy. Never fails: unknown inputs fall back to defaults.
    pub fn build(&self, profile: &Profile) -> Policy {
        let base = self.base_params(profile);

        let mut policy = Policy {
            vol_target: base.vol_target,
            cash_floor_pct: base.cash_floor,
            name_cap_pct: base.name_cap,
            sector_cap_pct: base.sector_cap,
            per_trade_max_pct: base.per_trade_max,
            position_min_pct: base.position_min,
            turnover_budget: base.turnover_budget,
            prefer_etfs: base.prefer_etfs,
            sector_overrides: BTreeMap::new(),
            exclude_high_vol: base.exclude_high_vol,
            min_market_cap: base.min_market_cap,
        };

        self.apply_risk_tolerance(&mut policy, profile.risk_tolerance);
        self.apply_horizon(&mut policy, profile.horizon());
        self.apply_goals(&mut policy, profile);
        self.apply_account_size(&mut policy, profile);

        policy.cash_floor_pct = policy.cash_floor_pct.clamp(0.0, self.rules.max_cash_floor);

        debug!(
            bracket = %profile.income_bracket,
            risk = profile.risk_tolerance.as_str(),
            vol_target = policy.vol_target,
            cash_floor = policy.cash_floor_pct,
            name_cap = policy.name_cap_pct,
            sector_cap = policy.sector_cap_pct,
            prefer_etfs = policy.prefer_etfs,
            "Derived policy"
        );

        policy
    }

    fn base_params(&self, profile: &Profile) -> &BandParams {
        self.rules
            .bands
            .get(&profile.income_bracket)
            .unwrap_or(&self.rules.default_band)
    }

    fn apply_risk_tolerance(&self, policy: &mut Policy, risk: RiskTolerance) {
        policy.vol_target *= match risk {
            RiskTolerance::Conservative => self.rules.conservative_vol_mult,
            RiskTolerance::Moderate => self.rules.moderate_vol_mult,
            RiskTolerance::Aggressive => self.rules.aggressive_vol_mult,
        };
    }

    fn apply_horizon(&self, policy: &mut Policy, horizon: Horizon) {
        match horizon {
            Horizon::Short => {
                policy.vol_target *= self.rules.short_horizon_vol_mult;
                policy.cash_floor_pct += self.rules.short_horizon_cash_add;
            }
            Horizon::Long => {
                policy.vol_target *= self.rules.long_horizon_vol_mult;
                policy.cash_floor_pct += self.rules.long_horizon_cash_add;
            }
            Horizon::Medium => {}
        }
    }

    fn apply_goals(&self, policy: &mut Policy, profile: &Profile) {
        for rule in &self.rules.sector_overrides {
            let keywords: Vec<&str> = rule.keywords.iter().map(String::as_str).collect();
            if profile.has_goal_matching(&keywords) {
                let cap = rule.ceiling.min(policy.sector_cap_pct + rule.bump);
                policy.sector_overrides.insert(rule.sector.clone(), cap);
            }
        }

        let emergency: Vec<&str> = self
            .rules
            .emergency_fund_keywords
            .iter()
            .map(String::as_str)
            .collect();
        if profile.has_goal_matching(&emergency) {
            policy.cash_floor_pct = policy.cash_floor_pct.max(self.rules.emergency_fund_cash_floor);
        }
    }

    fn apply_account_size(&self, policy: &mut Policy, profile: &Profile) {
        let Some(value) = profile.portfolio_value else {
            return;
        };
        if value >= self.rules.small_account_threshold {
            return;
        }

        debug!(portfolio_value = %value, "Small account: ETF-first, no dust positions");
        policy.prefer_etfs = true;
        policy.name_cap_pct = policy.name_cap_pct.min(self.rules.small_account_name_cap);
        policy.position_min_pct = policy
            .position_min_pct
            .max(self.rules.small_account_position_min);
    }
}
