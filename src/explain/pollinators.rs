//! Pollinator network evidence (M7).
//!
//! Shared pollinators are ranked by the same quadratic weighting the metric
//! uses, so the explanation's top entries are exactly the score's biggest
//! contributors.

use super::TOP_AGENTS;
use crate::scorer::GuildScore;
use crate::types::MetricId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PollinatorShare {
    pub name: String,
    pub plant_count: usize,
    pub overlap_ratio: f64,
    /// overlap_ratio squared, this species' share of the raw score.
    pub contribution: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollinatorProfile {
    pub score: f64,
    pub coverage_pct: f64,
    pub plants_with_pollinators: usize,
    pub total_plants: usize,
    pub n_shared_pollinators: usize,
    pub top_shared: Vec<PollinatorShare>,
}

pub fn pollinator_profile(score: &GuildScore) -> PollinatorProfile {
    let m7 = &score.details.m7;
    let n_plants = m7.total_plants.max(1);

    let mut top_shared: Vec<PollinatorShare> = m7
        .pollinator_counts
        .iter()
        .filter(|(_, count)| **count >= 2)
        .map(|(name, count)| {
            let overlap_ratio = *count as f64 / n_plants as f64;
            PollinatorShare {
                name: name.clone(),
                plant_count: *count,
                overlap_ratio,
                contribution: overlap_ratio * overlap_ratio,
            }
        })
        .collect();
    top_shared.sort_by(|a, b| {
        b.plant_count
            .cmp(&a.plant_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    top_shared.truncate(TOP_AGENTS);

    PollinatorProfile {
        score: score.metric(MetricId::M7).display,
        coverage_pct: m7.coverage_pct,
        plants_with_pollinators: m7.plants_with_pollinators,
        total_plants: m7.total_plants,
        n_shared_pollinators: m7.n_shared_pollinators,
        top_shared,
    }
}
