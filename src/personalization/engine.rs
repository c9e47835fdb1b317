//! Personalization engine: profile and screen in, ranked list and target
//! allocation out.
//!
//! Everything except [`Personalizer::optimize`] is pure. Each call builds
//! its own sector statistics; nothing is cached between calls, so
//! concurrent evaluations of different profiles never interfere.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{OptimizerClient, OptimizerError};
use crate::factors::ExposureCalculator;
use crate::models::{
    Candidate, FactorExposure, FactorTilts, PersonalizedCandidate, Policy, Profile, ScreenerRow,
};

use super::allocation::{AllocationPlan, AllocationPlanner};
use super::blender::ScoreBlender;
use super::cash_gate::{CashSafetyGate, GateInput, PauseReason};
use super::config::EngineConfig;
use super::policy_builder::PolicyBuilder;
use super::ranker::rank_candidates;
use super::tilts::TiltBuilder;

/// Caller-supplied identifier for one personalization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunToken(pub Uuid);

impl RunToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Caller-owned record of runs already generated.
#[derive(Debug, Default)]
pub struct GenerationGuard {
    generated: HashSet<RunToken>,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a token is seen, false afterwards.
    pub fn begin(&mut self, token: RunToken) -> bool {
        self.generated.insert(token)
    }
}

/// Inputs for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalizationRequest {
    #[serde(default)]
    pub run_token: RunToken,

    #[serde(default)]
    pub profile: Profile,

    #[serde(default)]
    pub candidates: Vec<Candidate>,

    #[serde(default)]
    pub screen: Vec<ScreenerRow>,

    #[serde(default)]
    pub risk: GateInput,
}

/// Result of one run. When paused, `ranked` is empty and `suppressed`
/// counts the candidates that were withheld.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personalization {
    pub run_token: RunToken,
    pub generated_at: DateTime<Utc>,
    pub policy: Policy,
    pub tilts: FactorTilts,
    pub paused: bool,
    pub pause_reason: Option<PauseReason>,
    pub ranked: Vec<PersonalizedCandidate>,
    pub suppressed: usize,
    #[serde(default)]
    pub portfolio_value: Option<Decimal>,
}

/// Stateless personalization engine.
pub struct Personalizer {
    config: EngineConfig,
}

impl Personalizer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self, profile: &Profile) -> Policy {
        PolicyBuilder::new(&self.config.policy).build(profile)
    }

    pub fn tilts(&self, profile: &Profile) -> FactorTilts {
        TiltBuilder::new(&self.config.tilts).build(profile)
    }

    pub fn exposures(&self, screen: &[ScreenerRow]) -> HashMap<String, FactorExposure> {
        ExposureCalculator::new(self.config.zscore_epsilon).compute(screen)
    }

    /// Run the full pure pipeline for one request.
    pub fn personalize(&self, request: &PersonalizationRequest) -> Personalization {
        let profile = &request.profile;
        let policy = self.policy(profile);
        let tilts = self.tilts(profile);
        let exposures = self.exposures(&request.screen);

        let blender = ScoreBlender::new(&self.config.blend, &tilts, profile.horizon());
        let ranked = rank_candidates(&request.candidates, &policy, &exposures, &blender);

        let decision =
            CashSafetyGate::new(&self.config.cash_gate_phrase).evaluate(&request.risk, &policy);

        let (ranked, suppressed) = if decision.paused {
            (Vec::new(), ranked.len())
        } else {
            (ranked, 0)
        };

        info!(
            run = %request.run_token.0,
            candidates = request.candidates.len(),
            screened = request.screen.len(),
            ranked = ranked.len(),
            paused = decision.paused,
            "Personalization complete"
        );

        Personalization {
            run_token: request.run_token,
            generated_at: Utc::now(),
            policy,
            tilts,
            paused: decision.paused,
            pause_reason: decision.reason,
            ranked,
            suppressed,
            portfolio_value: profile.portfolio_value,
        }
    }

    /// Personalize a batch, skipping runs whose token the guard has already seen.
    pub fn personalize_batch(
        &self,
        requests: &[PersonalizationRequest],
        guard: &mut GenerationGuard,
    ) -> Vec<Personalization> {
        requests
            .iter()
            .filter(|request| {
                let fresh = guard.begin(request.run_token);
                if !fresh {
                    warn!(run = %request.run_token.0, "Run already generated, skipping");
                }
                fresh
            })
            .map(|request| self.personalize(request))
            .collect()
    }

    /// Hand the ranked list to the optimizer and explain the result.
    ///
    /// Returns `Ok(None)` without calling out when buys are paused or
    /// nothing survived ranking. Optimizer failures are returned unchanged.
    pub async fn optimize(
        &self,
        client: &OptimizerClient,
        personalization: &Personalization,
        prev_weights: &BTreeMap<String, f64>,
    ) -> Result<Option<AllocationPlan>, OptimizerError> {
        if personalization.paused || personalization.ranked.is_empty() {
            info!(
                run = %personalization.run_token.0,
                paused = personalization.paused,
                "Skipping optimizer: nothing to allocate"
            );
            return Ok(None);
        }

        let target = client
            .optimize(&personalization.ranked, &personalization.policy, prev_weights)
            .await?;

        let plan = AllocationPlanner::new(&personalization.policy, self.config.min_buy_delta).plan(
            &personalization.ranked,
            target,
            prev_weights,
            personalization.portfolio_value,
        );

        info!(
            run = %personalization.run_token.0,
            buys = plan.buys.len(),
            portfolio_vol = plan.target.portfolio_vol,
            breaches = plan.cap_breaches.len(),
            "Allocation plan ready"
        );

        Ok(Some(plan))
    }
}

impl Default for Personalizer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
