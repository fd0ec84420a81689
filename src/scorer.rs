//! Guild scoring orchestration.
//!
//! Validates the requested guild, fans the seven metric calculators out
//! across the thread pool, normalizes each raw value against the calibration
//! stratum, and aggregates. Direction correction (inverting risk-framed
//! metrics so higher is uniformly better) happens exactly once, here, so each
//! calculator's raw/normalized pair stays comparable to calibration data.

use crate::calibration::{CalibrationTable, CsrCalibration};
use crate::data::ReferenceData;
use crate::error::{Result, ScoreError};
use crate::metrics::{
    calculate_m1, calculate_m2, calculate_m3, calculate_m4, calculate_m5, calculate_m6,
    calculate_m7, M1Result, M2Result, M3Result, M4Result, M5Result, M6Result, M7Result,
};
use crate::phylo::PhyloTree;
use crate::types::{ClimateTier, MetricId, RawScore};
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub const MIN_GUILD_SIZE: usize = 1;
pub const MAX_GUILD_SIZE: usize = 10;

/// One metric's scores for a guild.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MetricResult {
    pub metric: MetricId,
    pub raw: f64,
    /// Percentile within the calibration stratum, [0, 100].
    pub normalized: f64,
    /// Direction-corrected score: risk-framed metrics are inverted so that
    /// higher is always better.
    pub display: f64,
}

/// Per-metric intermediate detail, kept for the explanation layer.
#[derive(Debug, Clone)]
pub struct MetricDetails {
    pub m1: M1Result,
    pub m2: M2Result,
    pub m3: M3Result,
    pub m4: M4Result,
    pub m5: M5Result,
    pub m6: M6Result,
    pub m7: M7Result,
}

#[derive(Debug, Clone, Serialize)]
pub struct GuildScore {
    /// Canonically sorted member identities.
    pub plant_ids: Vec<String>,
    pub tier: ClimateTier,
    /// In MetricId::ALL order.
    pub metrics: [MetricResult; 7],
    /// Mean of the seven display scores.
    pub overall: f64,
    #[serde(skip)]
    pub details: MetricDetails,
}

impl GuildScore {
    pub fn metric(&self, id: MetricId) -> &MetricResult {
        // metrics is stored in MetricId::ALL order
        &self.metrics[id as usize]
    }
}

/// Scoring facade over the immutable reference snapshots.
#[derive(Clone)]
pub struct GuildScorer {
    data: Arc<ReferenceData>,
    tree: Arc<PhyloTree>,
    calibration: Arc<CalibrationTable>,
    csr_calibration: Option<Arc<CsrCalibration>>,
}

impl GuildScorer {
    pub fn new(
        data: Arc<ReferenceData>,
        tree: Arc<PhyloTree>,
        calibration: Arc<CalibrationTable>,
        csr_calibration: Option<Arc<CsrCalibration>>,
    ) -> Self {
        Self {
            data,
            tree,
            calibration,
            csr_calibration,
        }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.data
    }

    /// Score a guild against a climate tier.
    pub fn score_guild(&self, plant_ids: &[String], tier: ClimateTier) -> Result<GuildScore> {
        let ids = self.validate(plant_ids, tier)?;
        let n_plants = ids.len();
        let guild = self.data.guild_view(&ids)?;
        let csr_calibration = self.csr_calibration.as_deref();

        debug!(%tier, n_plants, "scoring guild");

        // The seven calculators are independent; run them as a parallel
        // join tree and rejoin before aggregation
        let ((m1, m2), ((m3, m4), (m5, (m6, m7)))) = rayon::join(
            || {
                rayon::join(
                    || calculate_m1(&ids, &self.tree),
                    || calculate_m2(&guild, csr_calibration),
                )
            },
            || {
                rayon::join(
                    || {
                        rayon::join(
                            || calculate_m3(&guild, &self.data.lookups),
                            || calculate_m4(&guild, &self.data.lookups),
                        )
                    },
                    || {
                        rayon::join(
                            || calculate_m5(&guild),
                            || rayon::join(|| calculate_m6(&guild), || calculate_m7(&guild)),
                        )
                    },
                )
            },
        );
        let details = MetricDetails {
            m1: m1?,
            m2: m2?,
            m3,
            m4,
            m5,
            m6,
            m7,
        };

        let raws = [
            details.m1.raw,
            details.m2.raw,
            details.m3.raw,
            details.m4.raw,
            details.m5.raw,
            details.m6.raw,
            details.m7.raw,
        ];

        let mut metrics = [MetricResult {
            metric: MetricId::M1,
            raw: 0.0,
            normalized: 0.0,
            display: 0.0,
        }; 7];
        for (slot, raw) in raws.into_iter().enumerate() {
            // Single-plant M1 has a pre-assigned percentile: no peer
            // comparison exists, so no calibration lookup either
            let normalized = if raw.metric == MetricId::M1 && n_plants < 2 {
                0.0
            } else {
                self.calibration.normalize(tier, n_plants, raw)?
            };
            let display = if raw.metric.is_risk_framed() {
                100.0 - normalized
            } else {
                normalized
            };
            metrics[slot] = MetricResult {
                metric: raw.metric,
                raw: raw.value,
                normalized,
                display,
            };
        }

        let overall = metrics.iter().map(|m| m.display).sum::<f64>() / metrics.len() as f64;

        Ok(GuildScore {
            plant_ids: ids,
            tier,
            metrics,
            overall,
            details,
        })
    }

    fn validate(&self, plant_ids: &[String], tier: ClimateTier) -> Result<Vec<String>> {
        if plant_ids.len() < MIN_GUILD_SIZE || plant_ids.len() > MAX_GUILD_SIZE {
            return Err(ScoreError::GuildSize {
                got: plant_ids.len(),
                min: MIN_GUILD_SIZE,
                max: MAX_GUILD_SIZE,
            });
        }

        let mut seen: FxHashSet<&str> = FxHashSet::default();
        for id in plant_ids {
            if !seen.insert(id.as_str()) {
                return Err(ScoreError::DuplicatePlant(id.clone()));
            }
        }

        for id in plant_ids {
            let record = self.data.plant(id)?;
            if !record.in_tier(tier) {
                return Err(ScoreError::TierMismatch {
                    id: id.clone(),
                    tier,
                });
            }
        }

        // Canonical member order: scoring must not depend on caller ordering
        let mut ids = plant_ids.to_vec();
        ids.sort_unstable();
        Ok(ids)
    }
}

/// Compute the seven raw scores for a guild, without normalization.
///
/// This is the calibration path: called once per sampled guild inside the
/// Monte-Carlo batch, where thousands of concurrent draws make the per-guild
/// join tree counterproductive.
pub fn compute_raw_scores(
    data: &ReferenceData,
    tree: &PhyloTree,
    csr_calibration: Option<&CsrCalibration>,
    plant_ids: &[String],
) -> Result<[RawScore; 7]> {
    let guild = data.guild_view(plant_ids)?;
    let m1 = calculate_m1(plant_ids, tree)?;
    let m2 = calculate_m2(&guild, csr_calibration)?;
    let m3 = calculate_m3(&guild, &data.lookups);
    let m4 = calculate_m4(&guild, &data.lookups);
    let m5 = calculate_m5(&guild);
    let m6 = calculate_m6(&guild);
    let m7 = calculate_m7(&guild);
    Ok([m1.raw, m2.raw, m3.raw, m4.raw, m5.raw, m6.raw, m7.raw])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{Breakpoints, StratumCalibration};
    use crate::data::{CsrProfile, FungalProfile, InteractionProfile, PlantRecord};
    use approx::assert_relative_eq;

    fn record(id: &str, tier: ClimateTier) -> PlantRecord {
        PlantRecord {
            id: id.to_string(),
            name: id.to_string(),
            csr: Some(CsrProfile {
                c: 33.0,
                s: 33.0,
                r: 34.0,
            }),
            light_pref: Some(5.0),
            height_m: Some(1.0),
            growth_form: Some("herb".to_string()),
            tiers: vec![tier],
        }
    }

    fn flat_breakpoints() -> Breakpoints {
        Breakpoints {
            p1: 0.0,
            p5: 0.1,
            p10: 0.2,
            p20: 0.3,
            p30: 0.4,
            p40: 0.5,
            p50: 0.6,
            p60: 0.7,
            p70: 0.8,
            p80: 0.9,
            p90: 1.0,
            p95: 1.1,
            p99: 1.2,
        }
    }

    fn scorer_with(n: usize, tier: ClimateTier, sizes: &[usize]) -> GuildScorer {
        let mut data = ReferenceData::default();
        let mut newick = String::from("(");
        for i in 1..=n {
            let id = format!("p{i}");
            data.insert_plant(
                record(&id, tier),
                InteractionProfile::default(),
                FungalProfile::default(),
            );
            if i > 1 {
                newick.push(',');
            }
            newick.push_str(&format!("{id}:10"));
        }
        newick.push_str(");");
        let tree = PhyloTree::from_newick(&newick).unwrap();

        let mut table = CalibrationTable::default();
        for size in sizes {
            let mut stratum = StratumCalibration::new();
            for metric in MetricId::ALL {
                stratum.insert(metric, flat_breakpoints());
            }
            table.insert(tier, *size, stratum);
        }

        GuildScorer::new(Arc::new(data), Arc::new(tree), Arc::new(table), None)
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rejects_invalid_guilds() {
        let tier = ClimateTier::HumidTemperate;
        let scorer = scorer_with(3, tier, &[2, 3]);

        let err = scorer.score_guild(&[], tier).unwrap_err();
        assert!(matches!(err, ScoreError::GuildSize { got: 0, .. }));

        let err = scorer.score_guild(&ids(&["p1", "p1"]), tier).unwrap_err();
        assert!(matches!(err, ScoreError::DuplicatePlant(_)));

        let err = scorer.score_guild(&ids(&["p1", "ghost"]), tier).unwrap_err();
        assert!(matches!(err, ScoreError::MissingPlant { .. }));

        let err = scorer
            .score_guild(&ids(&["p1", "p2"]), ClimateTier::Arid)
            .unwrap_err();
        assert!(matches!(err, ScoreError::TierMismatch { .. }));
    }

    #[test]
    fn member_order_does_not_matter() {
        let tier = ClimateTier::HumidTemperate;
        let scorer = scorer_with(3, tier, &[3]);

        let forward = scorer.score_guild(&ids(&["p1", "p2", "p3"]), tier).unwrap();
        let reversed = scorer.score_guild(&ids(&["p3", "p1", "p2"]), tier).unwrap();

        assert_eq!(forward.plant_ids, reversed.plant_ids);
        for (a, b) in forward.metrics.iter().zip(reversed.metrics.iter()) {
            assert_eq!(a.raw, b.raw);
            assert_eq!(a.normalized, b.normalized);
        }
        assert_eq!(forward.overall, reversed.overall);
    }

    #[test]
    fn single_plant_guild_scores_without_division_by_zero() {
        let tier = ClimateTier::HumidTemperate;
        let scorer = scorer_with(1, tier, &[1]);

        let score = scorer.score_guild(&ids(&["p1"]), tier).unwrap();
        let m1 = score.metric(MetricId::M1);
        assert_eq!(m1.raw, 1.0);
        assert_eq!(m1.normalized, 0.0);
        // risk inversion: no penalty
        assert_eq!(m1.display, 100.0);
        for metric in score.metrics.iter().skip(1) {
            assert!(metric.raw.is_finite());
        }
    }

    #[test]
    fn risk_metrics_inverted_once_in_display() {
        let tier = ClimateTier::HumidTemperate;
        let scorer = scorer_with(2, tier, &[2]);

        let score = scorer.score_guild(&ids(&["p1", "p2"]), tier).unwrap();
        for metric in &score.metrics {
            if metric.metric.is_risk_framed() {
                assert_relative_eq!(metric.display, 100.0 - metric.normalized);
            } else {
                assert_relative_eq!(metric.display, metric.normalized);
            }
        }
        let mean = score.metrics.iter().map(|m| m.display).sum::<f64>() / 7.0;
        assert_relative_eq!(score.overall, mean);
    }

    #[test]
    fn missing_stratum_is_a_calibration_gap() {
        let tier = ClimateTier::HumidTemperate;
        let scorer = scorer_with(3, tier, &[2]);

        let err = scorer
            .score_guild(&ids(&["p1", "p2", "p3"]), tier)
            .unwrap_err();
        assert!(matches!(err, ScoreError::CalibrationGap { guild_size: 3, .. }));
    }
}
