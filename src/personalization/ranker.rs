//! Universe filter and ranker.

use std::collections::HashMap;

use tracing::debug;

use crate::models::{Candidate, FactorExposure, PersonalizedCandidate, Policy};

use super::blender::ScoreBlender;

/// Why a candidate was dropped from the universe.
#[derive(Debug, Clone, PartialEq)]
pub enum Exclusion {
    BelowMinMarketCap,
    AboveVolatilityLimit,
}

/// Decide whether a candidate passes the policy filters.
///
/// A missing market cap or volatility is not grounds for exclusion.
pub fn check_universe(candidate: &Candidate, policy: &Policy) -> Result<(), Exclusion> {
    if let (Some(min), Some(cap)) = (policy.min_market_cap, candidate.market_cap) {
        if cap < min {
            return Err(Exclusion::BelowMinMarketCap);
        }
    }

    if let (Some(limit), Some(vol)) = (policy.exclude_high_vol, candidate.annualized_volatility) {
        if vol > limit {
            return Err(Exclusion::AboveVolatilityLimit);
        }
    }

    Ok(())
}

/// Filter, score and rank candidates, best first.
///
/// The sort is stable: candidates with equal scores keep their input order.
pub fn rank_candidates(
    candidates: &[Candidate],
    policy: &Policy,
    exposures: &HashMap<String, FactorExposure>,
    blender: &ScoreBlender<'_>,
) -> Vec<PersonalizedCandidate> {
    let mut ranked: Vec<PersonalizedCandidate> = candidates
        .iter()
        .filter(|c| match check_universe(c, policy) {
            Ok(()) => true,
            Err(reason) => {
                debug!(symbol = %c.symbol, reason = ?reason, "Candidate filtered out");
                false
            }
        })
        .map(|c| {
            let exposure = exposures.get(&c.symbol);
            let score = blender.score(c, exposure);
            PersonalizedCandidate {
                candidate: c.clone(),
                personalized_score: score.blended,
                factors: exposure.cloned(),
                factor_contrib: score.contributions,
            }
        })
        .collect();

    // slice::sort_by is stable
    ranked.sort_by(|a, b| b.personalized_score.total_cmp(&a.personalized_score));

    debug!(
        input = candidates.len(),
        ranked = ranked.len(),
        "Ranked candidate universe"
    );
    ranked
}
