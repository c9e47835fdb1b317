//! Style factors and per-factor vectors (tilts, z-scores, contributions).

use serde::{Deserialize, Serialize};

/// The five style factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Factor {
    Value,
    Quality,
    Momentum,
    LowVol,
    Yield,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::Value,
        Factor::Quality,
        Factor::Momentum,
        Factor::LowVol,
        Factor::Yield,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Factor::Value => "value",
            Factor::Quality => "quality",
            Factor::Momentum => "momentum",
            Factor::LowVol => "lowVol",
            Factor::Yield => "yield",
        }
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One number per factor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactorVector {
    pub value: f64,
    pub quality: f64,
    pub momentum: f64,
    pub low_vol: f64,
    #[serde(rename = "yield")]
    pub yield_: f64,
}

impl FactorVector {
    pub const ZERO: FactorVector = FactorVector {
        value: 0.0,
        quality: 0.0,
        momentum: 0.0,
        low_vol: 0.0,
        yield_: 0.0,
    };

    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::Value => self.value,
            Factor::Quality => self.quality,
            Factor::Momentum => self.momentum,
            Factor::LowVol => self.low_vol,
            Factor::Yield => self.yield_,
        }
    }

    pub fn get_mut(&mut self, factor: Factor) -> &mut f64 {
        match factor {
            Factor::Value => &mut self.value,
            Factor::Quality => &mut self.quality,
            Factor::Momentum => &mut self.momentum,
            Factor::LowVol => &mut self.low_vol,
            Factor::Yield => &mut self.yield_,
        }
    }

    pub fn sum(&self) -> f64 {
        Factor::ALL.iter().map(|f| self.get(*f)).sum()
    }

    /// Element-wise product.
    pub fn hadamard(&self, other: &FactorVector) -> FactorVector {
        let mut out = FactorVector::ZERO;
        for f in Factor::ALL {
            *out.get_mut(f) = self.get(f) * other.get(f);
        }
        out
    }
}

/// Normalized, non-negative factor weights summing to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactorTilts(FactorVector);

impl FactorTilts {
    /// Clamp each raw weight at zero and rescale to sum to one.
    /// A degenerate all-zero input falls back to equal weights.
    pub fn normalize(raw: FactorVector) -> Self {
        let mut clamped = FactorVector::ZERO;
        for f in Factor::ALL {
            let w = raw.get(f);
            *clamped.get_mut(f) = if w.is_finite() { w.max(0.0) } else { 0.0 };
        }

        let total = clamped.sum();
        let mut out = FactorVector::ZERO;
        for f in Factor::ALL {
            *out.get_mut(f) = if total > 0.0 {
                clamped.get(f) / total
            } else {
                1.0 / Factor::ALL.len() as f64
            };
        }
        Self(out)
    }

    pub fn weight(&self, factor: Factor) -> f64 {
        self.0.get(factor)
    }

    pub fn as_vector(&self) -> &FactorVector {
        &self.0
    }
}
