//! Growth-strategy evidence (M2), plus the phylogenetic context from M1.

use crate::scorer::GuildScore;
use crate::types::MetricId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PlantStrategyView {
    pub name: String,
    pub c_percentile: f64,
    pub s_percentile: f64,
    pub r_percentile: f64,
    pub dominant_strategy: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyProfile {
    /// Direction-corrected conflict score (higher = fewer conflicts).
    pub score: f64,
    pub conflict_density: f64,
    pub total_conflicts: f64,
    pub high_c_count: usize,
    pub high_s_count: usize,
    pub high_r_count: usize,
    pub plants: Vec<PlantStrategyView>,
    /// Faith's PD behind M1, for context alongside the strategy mix.
    pub faiths_pd: f64,
    pub pest_independence_score: f64,
}

pub fn strategy_profile(score: &GuildScore) -> StrategyProfile {
    let m2 = &score.details.m2;

    let mut plants: Vec<PlantStrategyView> = m2
        .plant_strategies
        .iter()
        .map(|p| PlantStrategyView {
            name: p.name.clone(),
            c_percentile: p.c_percentile,
            s_percentile: p.s_percentile,
            r_percentile: p.r_percentile,
            dominant_strategy: p.dominant_strategy.clone(),
        })
        .collect();
    plants.sort_by(|a, b| a.name.cmp(&b.name));

    StrategyProfile {
        score: score.metric(MetricId::M2).display,
        conflict_density: score.metric(MetricId::M2).raw,
        total_conflicts: m2.total_conflicts,
        high_c_count: m2.high_c_count,
        high_s_count: m2.high_s_count,
        high_r_count: m2.high_r_count,
        plants,
        faiths_pd: score.details.m1.faiths_pd,
        pest_independence_score: score.metric(MetricId::M1).display,
    }
}
