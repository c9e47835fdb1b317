//! Blends sector-relative factor exposure with the upstream AI signal.
//!
//! `blended = alpha * factor_score + (1 - alpha) * ai_score`, where
//! `factor_score = sum(z_f * tilt_f)` and `ai_score = expected_return * confidence`.
//! Short horizons lean on the AI point estimate, longer ones on factors.

use crate::models::{Candidate, FactorExposure, FactorTilts, FactorVector, Horizon};

use super::config::BlendConfig;

/// Score breakdown for one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendedScore {
    pub factor_score: f64,
    pub ai_score: f64,
    pub alpha: f64,
    pub blended: f64,
    /// Per-factor `z * tilt`; sums to `factor_score`
    pub contributions: FactorVector,
}

pub struct ScoreBlender<'a> {
    config: &'a BlendConfig,
    tilts: &'a FactorTilts,
    horizon: Horizon,
}

impl<'a> ScoreBlender<'a> {
    pub fn new(config: &'a BlendConfig, tilts: &'a FactorTilts, horizon: Horizon) -> Self {
        Self {
            config,
            tilts,
            horizon,
        }
    }

    /// Weight on the factor score.
    pub fn alpha(&self) -> f64 {
        if self.horizon.is_short() {
            self.config.alpha_short
        } else {
            self.config.alpha_long
        }
    }

    /// Score a candidate. A missing exposure contributes nothing.
    pub fn score(&self, candidate: &Candidate, exposure: Option<&FactorExposure>) -> BlendedScore {
        let z = exposure.map(|e| e.z).unwrap_or(FactorVector::ZERO);
        let contributions = z.hadamard(self.tilts.as_vector());
        let factor_score = contributions.sum();

        let ai_score = finite_or_zero(candidate.expected_return) * finite_or_zero(candidate.confidence);

        let alpha = self.alpha();
        BlendedScore {
            factor_score,
            ai_score,
            alpha,
            blended: alpha * factor_score + (1.0 - alpha) * ai_score,
            contributions,
        }
    }
}

fn finite_or_zero(v: Option<f64>) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Factor;

    fn candidate(er: Option<f64>, conf: Option<f64>) -> Candidate {
        Candidate {
            symbol: "TEST".to_string(),
            expected_return: er,
            confidence: conf,
            ..Default::default()
        }
    }

    fn equal_tilts() -> FactorTilts {
        FactorTilts::normalize(FactorVector {
            value: 1.0,
            quality: 1.0,
            momentum: 1.0,
            low_vol: 1.0,
            yield_: 1.0,
        })
    }

    #[test]
    fn test_long_horizon_zero_exposure() {
        let config = BlendConfig::default();
        let tilts = equal_tilts();
        let blender = ScoreBlender::new(&config, &tilts, Horizon::classify(Some("10+ years")));

        let exposure = FactorExposure {
            symbol: "TEST".to_string(),
            sector: "Technology".to_string(),
            z: FactorVector::ZERO,
        };
        let score = blender.score(&candidate(Some(0.10), Some(0.8)), Some(&exposure));

        assert!((score.blended - 0.028).abs() < 1e-12);
        assert_eq!(score.alpha, 0.65);
    }

    #[test]
    fn test_short_horizon_alpha() {
        let config = BlendConfig::default();
        let tilts = equal_tilts();
        for h in ["1-3 years", "3-5 years"] {
            let blender = ScoreBlender::new(&config, &tilts, Horizon::classify(Some(h)));
            assert_eq!(blender.alpha(), 0.45);
        }
        let blender = ScoreBlender::new(&config, &tilts, Horizon::classify(None));
        assert_eq!(blender.alpha(), 0.65);
    }

    #[test]
    fn test_missing_fields_are_neutral() {
        let config = BlendConfig::default();
        let tilts = equal_tilts();
        let blender = ScoreBlender::new(&config, &tilts, Horizon::Medium);

        let score = blender.score(&candidate(None, Some(0.9)), None);
        assert_eq!(score.blended, 0.0);
        assert_eq!(score.factor_score, 0.0);
    }

    #[test]
    fn test_contributions_sum_to_factor_score() {
        let config = BlendConfig::default();
        let tilts = equal_tilts();
        let blender = ScoreBlender::new(&config, &tilts, Horizon::Long);

        let exposure = FactorExposure {
            symbol: "TEST".to_string(),
            sector: "Energy".to_string(),
            z: FactorVector {
                value: 1.0,
                quality: -0.5,
                momentum: 2.0,
                low_vol: 0.0,
                yield_: 0.5,
            },
        };
        let score = blender.score(&candidate(Some(0.05), Some(0.5)), Some(&exposure));

        assert!((score.contributions.sum() - score.factor_score).abs() < 1e-12);
        assert!((score.contributions.get(Factor::Momentum) - 0.4).abs() < 1e-12);
        let expected = 0.65 * 0.6 + 0.35 * 0.025;
        assert!((score.blended - expected).abs() < 1e-12);
    }
}
