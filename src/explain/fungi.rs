//! Beneficial fungal network evidence (M5).

use super::{rank_agents, AgentRank};
use crate::scorer::GuildScore;
use crate::types::MetricId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct FungalNetworkProfile {
    pub score: f64,
    pub network_score: f64,
    pub coverage_ratio: f64,
    pub plants_with_fungi: usize,
    pub total_plants: usize,
    /// Fungi hosted by two or more members.
    pub n_shared_fungi: usize,
    pub top_fungi: Vec<AgentRank>,
}

pub fn fungal_network_profile(score: &GuildScore) -> FungalNetworkProfile {
    let m5 = &score.details.m5;
    FungalNetworkProfile {
        score: score.metric(MetricId::M5).display,
        network_score: m5.network_score,
        coverage_ratio: m5.coverage_ratio,
        plants_with_fungi: m5.plants_with_fungi,
        total_plants: score.plant_ids.len(),
        n_shared_fungi: m5.n_shared_fungi,
        top_fungi: rank_agents(&m5.fungi_counts),
    }
}
