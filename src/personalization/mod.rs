//! Personalization logic: policy, tilts, scoring, ranking, cash gate, allocation.

mod allocation;
mod blender;
mod cash_gate;
mod config;
mod engine;
mod policy_builder;
mod ranker;
mod tilts;

pub use allocation::{AllocationPlan, AllocationPlanner, BuyRecommendation, CapBreach, CapKind, ExpectedImpact};
pub use blender::{BlendedScore, ScoreBlender};
pub use cash_gate::{CashSafetyGate, GateDecision, GateInput, PauseReason, RiskSignal};
pub use config::{BandParams, BlendConfig, EngineConfig, GoalSectorOverride, GoalTiltNudge, PolicyRules, TiltRules};
pub use engine::{GenerationGuard, Personalization, PersonalizationRequest, Personalizer, RunToken};
pub use policy_builder::PolicyBuilder;
pub use ranker::{check_universe, rank_candidates, Exclusion};
pub use tilts::TiltBuilder;
