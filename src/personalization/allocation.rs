//! Post-processing of optimizer weights into a buy list and explanations.
//!
//! Returned weights are reported as-is. Cap breaches are flagged and logged
//! but weights are never adjusted here.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::api::TargetWeights;
use crate::models::{FactorVector, PersonalizedCandidate, Policy, DEFAULT_SECTOR};

/// One name whose target weight grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRecommendation {
    pub symbol: String,
    pub sector: String,
    pub previous_weight: f64,
    pub target_weight: f64,
    pub delta: f64,
    pub score: f64,
    pub factor_contrib: FactorVector,
    pub why_this_size: String,
}

/// Portfolio-level expected return of the target weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedImpact {
    /// Decimal units
    pub ev_pct: f64,
    /// Expected gain per USD 10,000; unset when not representable
    pub per10k: Option<Decimal>,
    /// Expected gain on the actual portfolio, when its value is known
    pub ev_abs: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CapKind {
    Name,
    Sector,
}

/// A returned weight above the requested cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapBreach {
    pub kind: CapKind,
    pub key: String,
    pub weight: f64,
    pub cap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationPlan {
    pub target: TargetWeights,
    pub buys: Vec<BuyRecommendation>,
    pub sector_breakdown: BTreeMap<String, f64>,
    pub expected_impact: ExpectedImpact,
    pub cap_breaches: Vec<CapBreach>,
}

/// Tolerance for cap comparisons on solver output.
const CAP_TOLERANCE: f64 = 1e-6;

pub struct AllocationPlanner<'a> {
    policy: &'a Policy,
    min_buy_delta: f64,
}

impl<'a> AllocationPlanner<'a> {
    pub fn new(policy: &'a Policy, min_buy_delta: f64) -> Self {
        Self {
            policy,
            min_buy_delta,
        }
    }

    pub fn plan(
        &self,
        ranked: &[PersonalizedCandidate],
        target: TargetWeights,
        prev_weights: &BTreeMap<String, f64>,
        portfolio_value: Option<Decimal>,
    ) -> AllocationPlan {
        let by_symbol: HashMap<&str, &PersonalizedCandidate> = ranked
            .iter()
            .map(|c| (c.candidate.symbol.as_str(), c))
            .collect();

        let sector_of = |symbol: &str| -> String {
            by_symbol
                .get(symbol)
                .map(|c| c.sector().to_string())
                .unwrap_or_else(|| DEFAULT_SECTOR.to_string())
        };

        let mut sector_breakdown: BTreeMap<String, f64> = BTreeMap::new();
        for (symbol, weight) in &target.weights {
            *sector_breakdown.entry(sector_of(symbol)).or_default() += weight;
        }

        let buys = self.buys(&target, prev_weights, &by_symbol, &sector_of);
        let expected_impact = expected_impact(&target, &by_symbol, portfolio_value);
        let cap_breaches = self.cap_breaches(&target, &sector_breakdown);

        AllocationPlan {
            target,
            buys,
            sector_breakdown,
            expected_impact,
            cap_breaches,
        }
    }

    fn buys(
        &self,
        target: &TargetWeights,
        prev_weights: &BTreeMap<String, f64>,
        by_symbol: &HashMap<&str, &PersonalizedCandidate>,
        sector_of: &dyn Fn(&str) -> String,
    ) -> Vec<BuyRecommendation> {
        let mut buys: Vec<BuyRecommendation> = target
            .weights
            .iter()
            .filter_map(|(symbol, &weight)| {
                let previous = prev_weights.get(symbol).copied().unwrap_or(0.0);
                let delta = weight - previous;
                if delta <= self.min_buy_delta {
                    return None;
                }

                let ranked = by_symbol.get(symbol.as_str());
                let score = ranked.map(|c| c.personalized_score).unwrap_or(0.0);
                Some(BuyRecommendation {
                    symbol: symbol.clone(),
                    sector: sector_of(symbol),
                    previous_weight: previous,
                    target_weight: weight,
                    delta,
                    score,
                    factor_contrib: ranked.map(|c| c.factor_contrib).unwrap_or_default(),
                    why_this_size: format!(
                        "Score {:.2}, name cap {:.0}%, turnover budget {:.0}%.",
                        score,
                        self.policy.name_cap_pct * 100.0,
                        self.policy.turnover_budget * 100.0
                    ),
                })
            })
            .collect();

        buys.sort_by(|a, b| b.delta.total_cmp(&a.delta));
        buys
    }

    fn cap_breaches(
        &self,
        target: &TargetWeights,
        sector_breakdown: &BTreeMap<String, f64>,
    ) -> Vec<CapBreach> {
        let mut breaches = Vec::new();

        for (symbol, &weight) in &target.weights {
            if weight > self.policy.name_cap_pct + CAP_TOLERANCE {
                breaches.push(CapBreach {
                    kind: CapKind::Name,
                    key: symbol.clone(),
                    weight,
                    cap: self.policy.name_cap_pct,
                });
            }
        }

        for (sector, &weight) in sector_breakdown {
            let cap = self.policy.sector_cap_for(sector);
            if weight > cap + CAP_TOLERANCE {
                breaches.push(CapBreach {
                    kind: CapKind::Sector,
                    key: sector.clone(),
                    weight,
                    cap,
                });
            }
        }

        for b in &breaches {
            warn!(kind = ?b.kind, key = %b.key, weight = b.weight, cap = b.cap, "Optimizer weight exceeds cap");
        }
        breaches
    }
}

fn expected_impact(
    target: &TargetWeights,
    by_symbol: &HashMap<&str, &PersonalizedCandidate>,
    portfolio_value: Option<Decimal>,
) -> ExpectedImpact {
    let ev_pct: f64 = target
        .weights
        .iter()
        .map(|(symbol, w)| {
            let er = by_symbol
                .get(symbol.as_str())
                .and_then(|c| c.candidate.expected_return)
                .filter(|r| r.is_finite())
                .unwrap_or(0.0);
            w * er
        })
        .sum();

    let ev = Decimal::try_from(ev_pct).ok();
    let usd = |amount: Decimal| ev.and_then(|ev| amount.checked_mul(ev)).map(|x| x.round_dp(2));

    ExpectedImpact {
        ev_pct,
        per10k: usd(Decimal::from(10_000)),
        ev_abs: portfolio_value.and_then(usd),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candidate;
    use rust_decimal_macros::dec;

    fn policy() -> Policy {
        Policy {
            vol_target: 0.12,
            cash_floor_pct: 0.08,
            name_cap_pct: 0.10,
            sector_cap_pct: 0.30,
            per_trade_max_pct: 0.05,
            position_min_pct: 0.0075,
            turnover_budget: 0.15,
            prefer_etfs: false,
            sector_overrides: BTreeMap::from([("Technology".to_string(), 0.35)]),
            exclude_high_vol: None,
            min_market_cap: None,
        }
    }

    fn ranked(symbol: &str, sector: &str, er: f64, score: f64) -> PersonalizedCandidate {
        PersonalizedCandidate {
            candidate: Candidate {
                symbol: symbol.to_string(),
                expected_return: Some(er),
                sector: Some(sector.to_string()),
                ..Default::default()
            },
            personalized_score: score,
            factors: None,
            factor_contrib: FactorVector::ZERO,
        }
    }

    fn target(pairs: &[(&str, f64)]) -> TargetWeights {
        TargetWeights {
            weights: pairs.iter().map(|(s, w)| (s.to_string(), *w)).collect(),
            portfolio_vol: 0.1,
        }
    }

    #[test]
    fn test_buys_are_positive_deltas_largest_first() {
        let p = policy();
        let planner = AllocationPlanner::new(&p, 1e-4);
        let ranked = vec![
            ranked("AAA", "Technology", 0.08, 0.6),
            ranked("BBB", "Energy", 0.05, 0.3),
            ranked("CCC", "Energy", 0.04, 0.2),
        ];
        let prev = BTreeMap::from([("BBB".to_string(), 0.08), ("CCC".to_string(), 0.05)]);
        let plan = planner.plan(
            &ranked,
            target(&[("AAA", 0.04), ("BBB", 0.10), ("CCC", 0.05)]),
            &prev,
            None,
        );

        let buys: Vec<&str> = plan.buys.iter().map(|b| b.symbol.as_str()).collect();
        assert_eq!(buys, vec!["AAA", "BBB"]);
        assert_eq!(plan.buys[0].why_this_size, "Score 0.60, name cap 10%, turnover budget 15%.");
        assert!((plan.sector_breakdown["Energy"] - 0.15).abs() < 1e-12);
        assert!(plan.cap_breaches.is_empty());
    }

    #[test]
    fn test_expected_impact() {
        let p = policy();
        let planner = AllocationPlanner::new(&p, 1e-4);
        let ranked = vec![ranked("AAA", "Technology", 0.10, 0.5), ranked("BBB", "Energy", 0.05, 0.4)];
        let plan = planner.plan(
            &ranked,
            target(&[("AAA", 0.10), ("BBB", 0.10), ("VTI", 0.5)]),
            &BTreeMap::new(),
            Some(dec!(20000)),
        );

        assert!((plan.expected_impact.ev_pct - 0.015).abs() < 1e-12);
        assert_eq!(plan.expected_impact.per10k, Some(dec!(150)));
        assert_eq!(plan.expected_impact.ev_abs, Some(dec!(300)));
        assert_eq!(plan.sector_breakdown["Other"], 0.5);
    }

    #[test]
    fn test_expected_impact_overflow_left_unset() {
        let p = policy();
        let planner = AllocationPlanner::new(&p, 1e-4);
        let ranked = vec![ranked("AAA", "Technology", 2.0, 0.5)];
        let plan = planner.plan(
            &ranked,
            target(&[("AAA", 1.0)]),
            &BTreeMap::new(),
            Some(Decimal::MAX / dec!(2)),
        );

        assert!((plan.expected_impact.ev_pct - 2.0).abs() < 1e-12);
        assert_eq!(plan.expected_impact.per10k, Some(dec!(20000)));
        assert_eq!(plan.expected_impact.ev_abs, None);
    }

    #[test]
    fn test_expected_impact_out_of_range_ev_left_unset() {
        let p = policy();
        let planner = AllocationPlanner::new(&p, 1e-4);
        let ranked = vec![ranked("AAA", "Technology", 1e30, 0.5)];
        let plan = planner.plan(&ranked, target(&[("AAA", 1.0)]), &BTreeMap::new(), Some(dec!(5000)));

        assert_eq!(plan.expected_impact.per10k, None);
        assert_eq!(plan.expected_impact.ev_abs, None);
    }

    #[test]
    fn test_breaches_reported_not_fixed() {
        let p = policy();
        let planner = AllocationPlanner::new(&p, 1e-4);
        let ranked = vec![
            ranked("AAA", "Technology", 0.1, 0.5),
            ranked("BBB", "Energy", 0.1, 0.4),
            ranked("CCC", "Energy", 0.1, 0.3),
            ranked("DDD", "Energy", 0.1, 0.3),
            ranked("EEE", "Energy", 0.1, 0.3),
        ];
        let plan = planner.plan(
            &ranked,
            target(&[("AAA", 0.25), ("BBB", 0.1), ("CCC", 0.1), ("DDD", 0.1), ("EEE", 0.1)]),
            &BTreeMap::new(),
            None,
        );

        assert_eq!(plan.target.weights["AAA"], 0.25);
        assert!(plan
            .cap_breaches
            .iter()
            .any(|b| b.kind == CapKind::Name && b.key == "AAA"));
        assert!(plan
            .cap_breaches
            .iter()
            .any(|b| b.kind == CapKind::Sector && b.key == "Energy"));
        // Technology override of 35% is respected
        assert!(!plan
            .cap_breaches
            .iter()
            .any(|b| b.kind == CapKind::Sector && b.key == "Technology"));
    }
}
