//! Calibration tables and percentile normalization.
//!
//! A raw metric value only becomes interpretable against the distribution of
//! the same metric over many randomly assembled guilds of the same size from
//! the same climate tier. This module builds those distributions (offline
//! Monte-Carlo batch), persists the percentile breakpoints, and performs the
//! interpolating lookup at scoring time. A missing stratum is a deployment
//! error (`CalibrationGap`), never silently substituted.

use crate::data::ReferenceData;
use crate::error::{Result, ScoreError};
use crate::phylo::PhyloTree;
use crate::scorer::compute_raw_scores;
use crate::types::{ClimateTier, MetricId, RawScore};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Percentile levels captured per metric distribution.
pub const PERCENTILE_LEVELS: [f64; 13] = [
    1.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 95.0, 99.0,
];

/// Breakpoint raw values at each of the 13 percentile levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoints {
    pub p1: f64,
    pub p5: f64,
    pub p10: f64,
    pub p20: f64,
    pub p30: f64,
    pub p40: f64,
    pub p50: f64,
    pub p60: f64,
    pub p70: f64,
    pub p80: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

impl Breakpoints {
    pub fn values(&self) -> [f64; 13] {
        [
            self.p1, self.p5, self.p10, self.p20, self.p30, self.p40, self.p50, self.p60,
            self.p70, self.p80, self.p90, self.p95, self.p99,
        ]
    }

    /// Extract breakpoints from a sample of raw values. Sorts in place.
    pub fn from_samples(samples: &mut [f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let at = |p: f64| {
            let index = (p / 100.0 * (samples.len() - 1) as f64).round() as usize;
            samples[index.min(samples.len() - 1)]
        };
        Some(Self {
            p1: at(1.0),
            p5: at(5.0),
            p10: at(10.0),
            p20: at(20.0),
            p30: at(30.0),
            p40: at(40.0),
            p50: at(50.0),
            p60: at(60.0),
            p70: at(70.0),
            p80: at(80.0),
            p90: at(90.0),
            p95: at(95.0),
            p99: at(99.0),
        })
    }

    /// Interpolate the percentile for a raw value, clamped to [0, 100]
    /// outside the observed range.
    pub fn percentile_of(&self, raw: f64) -> f64 {
        interpolate(raw, &self.values(), &PERCENTILE_LEVELS)
    }
}

fn interpolate(raw: f64, values: &[f64], levels: &[f64]) -> f64 {
    let last = values.len() - 1;
    if raw <= values[0] {
        return 0.0;
    }
    if raw >= values[last] {
        return 100.0;
    }
    for i in 0..last {
        if values[i] <= raw && raw <= values[i + 1] {
            let span = values[i + 1] - values[i];
            let fraction = if span > 0.0 { (raw - values[i]) / span } else { 0.0 };
            return levels[i] + fraction * (levels[i + 1] - levels[i]);
        }
    }
    50.0
}

/// Breakpoints for all seven metrics within one (tier, guild size) stratum.
pub type StratumCalibration = BTreeMap<MetricId, Breakpoints>;

/// Full stratified calibration: tier -> guild size -> metric -> breakpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    strata: BTreeMap<ClimateTier, BTreeMap<usize, StratumCalibration>>,
}

impl CalibrationTable {
    pub fn insert(&mut self, tier: ClimateTier, guild_size: usize, stratum: StratumCalibration) {
        self.strata
            .entry(tier)
            .or_default()
            .insert(guild_size, stratum);
    }

    pub fn has_stratum(&self, tier: ClimateTier, guild_size: usize) -> bool {
        self.strata
            .get(&tier)
            .is_some_and(|sizes| sizes.contains_key(&guild_size))
    }

    pub fn breakpoints(
        &self,
        tier: ClimateTier,
        guild_size: usize,
        metric: MetricId,
    ) -> Result<&Breakpoints> {
        self.strata
            .get(&tier)
            .and_then(|sizes| sizes.get(&guild_size))
            .and_then(|stratum| stratum.get(&metric))
            .ok_or(ScoreError::CalibrationGap {
                tier,
                guild_size,
                metric,
            })
    }

    /// Normalize a typed raw score against its matching breakpoint list.
    pub fn normalize(&self, tier: ClimateTier, guild_size: usize, raw: RawScore) -> Result<f64> {
        Ok(self
            .breakpoints(tier, guild_size, raw.metric)?
            .percentile_of(raw.value))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Run Monte-Carlo calibration for one (tier, guild size) stratum.
///
/// Guilds are sampled up-front from a seeded generator so a fixed
/// (seed, sample_count) reproduces the same table; scoring then fans out
/// across the thread pool. Any calculator failure aborts the whole batch —
/// a partial calibration table is unsafe to use.
pub fn run_calibration(
    data: &ReferenceData,
    tree: &PhyloTree,
    csr_calibration: Option<&CsrCalibration>,
    tier: ClimateTier,
    guild_size: usize,
    sample_count: usize,
    seed: u64,
) -> Result<StratumCalibration> {
    // Eligible population: tier members with the traits every calculator
    // needs (CSR triple, phylogeny tip)
    let eligible: Vec<String> = data
        .tier_members(tier)
        .into_iter()
        .filter(|id| {
            data.plants
                .get(id)
                .is_some_and(|p| p.csr.is_some())
                && tree.contains(id)
        })
        .collect();

    if eligible.len() < guild_size {
        return Err(ScoreError::InsufficientPopulation {
            tier,
            needed: guild_size,
            available: eligible.len(),
        });
    }

    info!(
        %tier,
        guild_size,
        sample_count,
        eligible = eligible.len(),
        "sampling calibration guilds"
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let samples: Vec<Vec<String>> = (0..sample_count)
        .map(|_| {
            let mut ids: Vec<String> = eligible
                .choose_multiple(&mut rng, guild_size)
                .cloned()
                .collect();
            ids.sort_unstable();
            ids
        })
        .collect();

    let raw_sets: Vec<[RawScore; 7]> = samples
        .par_iter()
        .map(|ids| compute_raw_scores(data, tree, csr_calibration, ids))
        .collect::<Result<Vec<_>>>()?;

    let mut stratum = StratumCalibration::new();
    for (slot, metric) in MetricId::ALL.iter().enumerate() {
        let mut values: Vec<f64> = raw_sets.iter().map(|set| set[slot].value).collect();
        if let Some(breakpoints) = Breakpoints::from_samples(&mut values) {
            stratum.insert(*metric, breakpoints);
        }
    }

    info!(%tier, guild_size, "stratum calibrated");
    Ok(stratum)
}

/// CSR axis selector for the within-guild dominant-strategy percentiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsrAxis {
    C,
    S,
    R,
}

/// Global (not tier-stratified) CSR percentile calibration. Strategy
/// conflicts are within-guild comparisons, so one population-wide
/// distribution per axis is enough.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CsrCalibration {
    c: CsrBreakpoints,
    s: CsrBreakpoints,
    r: CsrBreakpoints,
}

/// Finer grid than the guild metrics: the 75th percentile is the M2
/// dominant-strategy threshold and needs an exact breakpoint.
const CSR_LEVELS: [f64; 15] = [
    1.0, 5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 75.0, 80.0, 85.0, 90.0, 95.0, 99.0,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CsrBreakpoints {
    p1: f64,
    p5: f64,
    p10: f64,
    p20: f64,
    p30: f64,
    p40: f64,
    p50: f64,
    p60: f64,
    p70: f64,
    p75: f64,
    p80: f64,
    p85: f64,
    p90: f64,
    p95: f64,
    p99: f64,
}

impl CsrBreakpoints {
    fn values(&self) -> [f64; 15] {
        [
            self.p1, self.p5, self.p10, self.p20, self.p30, self.p40, self.p50, self.p60,
            self.p70, self.p75, self.p80, self.p85, self.p90, self.p95, self.p99,
        ]
    }

    fn from_samples(samples: &mut [f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        samples.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let at = |p: f64| {
            let index = (p / 100.0 * (samples.len() - 1) as f64).round() as usize;
            samples[index.min(samples.len() - 1)]
        };
        Some(Self {
            p1: at(1.0),
            p5: at(5.0),
            p10: at(10.0),
            p20: at(20.0),
            p30: at(30.0),
            p40: at(40.0),
            p50: at(50.0),
            p60: at(60.0),
            p70: at(70.0),
            p75: at(75.0),
            p80: at(80.0),
            p85: at(85.0),
            p90: at(90.0),
            p95: at(95.0),
            p99: at(99.0),
        })
    }
}

impl CsrCalibration {
    /// Build from every plant in the reference snapshot with a CSR triple.
    pub fn from_reference(data: &ReferenceData) -> Option<Self> {
        let mut c: Vec<f64> = Vec::new();
        let mut s: Vec<f64> = Vec::new();
        let mut r: Vec<f64> = Vec::new();
        for plant in data.plants.values() {
            if let Some(csr) = plant.csr {
                c.push(csr.c);
                s.push(csr.s);
                r.push(csr.r);
            }
        }
        Some(Self {
            c: CsrBreakpoints::from_samples(&mut c)?,
            s: CsrBreakpoints::from_samples(&mut s)?,
            r: CsrBreakpoints::from_samples(&mut r)?,
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Convert a raw CSR axis score to a global percentile. Without calibration,
/// falls back to fixed thresholds that split plants into dominant (100) and
/// non-dominant (50).
pub fn csr_to_percentile(raw: f64, axis: CsrAxis, calibration: Option<&CsrCalibration>) -> f64 {
    let Some(cal) = calibration else {
        return match axis {
            CsrAxis::C | CsrAxis::S => {
                if raw >= 60.0 {
                    100.0
                } else {
                    50.0
                }
            }
            CsrAxis::R => {
                if raw >= 50.0 {
                    100.0
                } else {
                    50.0
                }
            }
        };
    };

    let breakpoints = match axis {
        CsrAxis::C => &cal.c,
        CsrAxis::S => &cal.s,
        CsrAxis::R => &cal.r,
    };
    interpolate(raw, &breakpoints.values(), &CSR_LEVELS)
}
