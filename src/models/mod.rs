//! Data models for profiles, policies, screens, factors and candidates.

mod candidate;
mod factors;
mod policy;
mod profile;
mod screener;

pub use candidate::{Candidate, PersonalizedCandidate};
pub use factors::{Factor, FactorTilts, FactorVector};
pub use policy::Policy;
pub use profile::{Horizon, IncomeBracket, Profile, RiskTolerance};
pub use screener::{FactorExposure, ScreenerRow, DEFAULT_SECTOR};
