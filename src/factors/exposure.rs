//! Sector-relative factor exposures from a raw cross-sectional screen.
//!
//! Each row is turned into five raw proxies (value, quality, momentum,
//! low volatility, yield). Proxies are then z-scored against the other
//! symbols in the same sector bucket, so a symbol is only ever compared
//! with its sector peers. A proxy that could not be computed gets a z-score
//! of exactly zero.

use std::collections::{BTreeMap, HashMap};

use statrs::statistics::Statistics;
use tracing::debug;

use crate::models::{Factor, FactorExposure, FactorVector, ScreenerRow};

/// P/E ratios closer to zero than this produce no value proxy.
const MIN_ABS_PE: f64 = 1e-6;

/// Mean and floored standard deviation of one factor within one sector.
#[derive(Debug, Clone, Copy)]
struct BucketStats {
    mean: f64,
    std_dev: f64,
}

impl BucketStats {
    fn from_values(values: &[f64], epsilon: f64) -> Self {
        let mean = values.iter().copied().mean();
        let std_dev = if values.len() > 1 {
            values.iter().copied().population_std_dev()
        } else {
            0.0
        };

        Self {
            mean,
            std_dev: if std_dev.is_finite() { std_dev.max(epsilon) } else { epsilon },
        }
    }

    fn z_score(&self, value: f64) -> f64 {
        (value - self.mean) / self.std_dev
    }
}

/// Raw proxy for one factor, `None` when the input is missing or unusable.
fn raw_proxy(row: &ScreenerRow, factor: Factor) -> Option<f64> {
    let raw = match factor {
        Factor::Value => row
            .pe_ratio
            .filter(|pe| pe.abs() > MIN_ABS_PE)
            .map(|pe| 1.0 / pe),
        Factor::Quality => row.debt_ratio.map(|d| -d),
        Factor::Momentum => row.ml_score.or(row.score),
        Factor::LowVol => row.volatility.map(|v| -v),
        Factor::Yield => row.dividend_yield,
    };
    raw.filter(|v| v.is_finite())
}

/// Computes sector-relative z-scores for a screen snapshot.
///
/// Holds no state between calls; every snapshot is normalized on its own.
#[derive(Debug, Clone, Copy)]
pub struct ExposureCalculator {
    epsilon: f64,
}

impl ExposureCalculator {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Map each symbol to its sector-relative exposure.
    ///
    /// If a symbol appears more than once, every row takes part in the
    /// sector statistics and the last row's exposure is returned.
    pub fn compute(&self, rows: &[ScreenerRow]) -> HashMap<String, FactorExposure> {
        let mut buckets: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, row) in rows.iter().enumerate() {
            buckets.entry(row.sector_or_default()).or_default().push(i);
        }

        let mut scores = vec![FactorVector::ZERO; rows.len()];

        for (sector, members) in &buckets {
            for factor in Factor::ALL {
                let present: Vec<(usize, f64)> = members
                    .iter()
                    .filter_map(|&i| raw_proxy(&rows[i], factor).map(|v| (i, v)))
                    .collect();

                if present.is_empty() {
                    continue;
                }

                let values: Vec<f64> = present.iter().map(|(_, v)| *v).collect();
                let stats = BucketStats::from_values(&values, self.epsilon);

                debug!(
                    sector = %sector,
                    factor = %factor,
                    samples = values.len(),
                    mean = stats.mean,
                    std_dev = stats.std_dev,
                    "Sector bucket statistics"
                );

                for (i, value) in present {
                    *scores[i].get_mut(factor) = stats.z_score(value);
                }
            }
        }

        rows.iter()
            .zip(scores)
            .map(|(row, z)| {
                (
                    row.symbol.clone(),
                    FactorExposure {
                        symbol: row.symbol.clone(),
                        sector: row.sector_or_default().to_string(),
                        z,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn row(symbol: &str, sector: &str, pe: Option<f64>) -> ScreenerRow {
        ScreenerRow {
            symbol: symbol.to_string(),
            sector: Some(sector.to_string()),
            pe_ratio: pe,
            dividend_yield: Some(0.01),
            volatility: Some(0.25),
            debt_ratio: Some(0.4),
            ml_score: Some(0.5),
            score: None,
        }
    }

    #[test]
    fn test_lower_pe_scores_higher_value() {
        let rows = vec![
            row("CHEAP", "Technology", Some(10.0)),
            row("RICH", "Technology", Some(20.0)),
        ];
        let exposures = ExposureCalculator::new(EPS).compute(&rows);

        assert!(exposures["CHEAP"].z.value > exposures["RICH"].z.value);
        // Identical inputs elsewhere: no spread, no signal
        assert_eq!(exposures["CHEAP"].z.quality, 0.0);
        assert_eq!(exposures["RICH"].z.low_vol, 0.0);
    }

    #[test]
    fn test_missing_inputs_are_neutral() {
        let mut gap = row("GAP", "Energy", None);
        gap.dividend_yield = None;
        let rows = vec![
            row("A", "Energy", Some(8.0)),
            row("B", "Energy", Some(12.0)),
            row("C", "Energy", Some(30.0)),
            gap,
        ];
        let exposures = ExposureCalculator::new(EPS).compute(&rows);

        assert_eq!(exposures["GAP"].z.value, 0.0);
        assert_eq!(exposures["GAP"].z.yield_, 0.0);
        // Neighbours are not dragged by an imputed zero P/E
        let sum: f64 = ["A", "B", "C"].iter().map(|s| exposures[*s].z.value).sum();
        assert!(sum.abs() < 1e-9);
    }

    #[test]
    fn test_zero_pe_has_no_value_proxy() {
        let rows = vec![
            row("ZERO", "Utilities", Some(0.0)),
            row("X", "Utilities", Some(15.0)),
            row("Y", "Utilities", Some(25.0)),
        ];
        let exposures = ExposureCalculator::new(EPS).compute(&rows);
        assert_eq!(exposures["ZERO"].z.value, 0.0);
    }

    #[test]
    fn test_single_member_sector_is_neutral() {
        let rows = vec![row("ONLY", "Materials", Some(14.0))];
        let exposures = ExposureCalculator::new(EPS).compute(&rows);
        assert_eq!(exposures["ONLY"].z, FactorVector::ZERO);
    }

    #[test]
    fn test_sectors_are_normalized_separately() {
        // Banks trade on low multiples, software on high ones; the cheapest
        // name in each sector should lead its own sector.
        let rows = vec![
            row("BANK1", "Financials", Some(8.0)),
            row("BANK2", "Financials", Some(12.0)),
            row("SOFT1", "Technology", Some(30.0)),
            row("SOFT2", "Technology", Some(60.0)),
        ];
        let exposures = ExposureCalculator::new(EPS).compute(&rows);

        assert!((exposures["BANK1"].z.value - exposures["SOFT1"].z.value).abs() < 1e-9);
        assert!(exposures["SOFT1"].z.value > 0.0);
        assert_eq!(exposures["SOFT1"].sector, "Technology");
    }

    #[test]
    fn test_momentum_prefers_ml_score() {
        let mut a = row("A", "Health", Some(10.0));
        a.ml_score = None;
        a.score = Some(0.9);
        let mut b = row("B", "Health", Some(10.0));
        b.ml_score = Some(0.1);
        b.score = Some(5.0);
        let exposures = ExposureCalculator::new(EPS).compute(&[a, b]);
        assert!(exposures["A"].z.momentum > exposures["B"].z.momentum);
    }

    proptest! {
        #[test]
        fn sector_buckets_have_zero_mean_unit_std(
            inputs in prop::collection::vec(
                (
                    prop::option::of(1.0..80.0_f64),
                    prop::option::of(0.0..2.0_f64),
                    prop::option::of(-1.0..1.0_f64),
                    prop::option::of(0.05..0.9_f64),
                    prop::option::of(0.0..0.08_f64),
                ),
                2..20,
            ),
        ) {
            let rows: Vec<ScreenerRow> = inputs
                .iter()
                .enumerate()
                .map(|(i, (pe, debt, ml, vol, dy))| ScreenerRow {
                    symbol: format!("S{i}"),
                    sector: Some(if i % 2 == 0 { "Even" } else { "Odd" }.to_string()),
                    pe_ratio: *pe,
                    dividend_yield: *dy,
                    volatility: *vol,
                    debt_ratio: *debt,
                    ml_score: *ml,
                    score: None,
                })
                .collect();
            let exposures = ExposureCalculator::new(EPS).compute(&rows);

            for factor in Factor::ALL {
                for sector in ["Even", "Odd"] {
                    let members: Vec<(f64, f64)> = rows
                        .iter()
                        .filter(|r| r.sector_or_default() == sector)
                        .filter_map(|r| {
                            raw_proxy(r, factor).map(|raw| (raw, exposures[&r.symbol].z.get(factor)))
                        })
                        .collect();

                    let spread = members.iter().map(|m| m.0).fold(f64::MIN, f64::max)
                        - members.iter().map(|m| m.0).fold(f64::MAX, f64::min);
                    if members.len() > 1 && spread > 1e-6 {
                        let n = members.len() as f64;
                        let mean = members.iter().map(|m| m.1).sum::<f64>() / n;
                        let var = members.iter().map(|m| (m.1 - mean).powi(2)).sum::<f64>() / n;
                        prop_assert!(mean.abs() < 1e-6, "{factor} mean {mean} in {sector}");
                        prop_assert!((var.sqrt() - 1.0).abs() < 1e-6, "{factor} std {} in {sector}", var.sqrt());
                    }
                }

                for r in rows.iter().filter(|r| raw_proxy(r, factor).is_none()) {
                    prop_assert_eq!(exposures[&r.symbol].z.get(factor), 0.0);
                }
            }
        }
    }
}
