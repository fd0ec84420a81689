//! Biocontrol network evidence (M3).

use super::{rank_agents, AgentRank};
use crate::scorer::GuildScore;
use crate::types::MetricId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct BiocontrolProfile {
    pub score: f64,
    pub n_mechanisms: usize,
    pub specific_predator_matches: usize,
    pub specific_fungi_matches: usize,
    /// (herbivore, predator) matches confirmed by the lookup tables.
    pub matched_predator_pairs: Vec<(String, String)>,
    /// (herbivore, fungus) matches confirmed by the lookup tables.
    pub matched_fungi_pairs: Vec<(String, String)>,
    pub top_predators: Vec<AgentRank>,
    pub top_entomo_fungi: Vec<AgentRank>,
}

pub fn biocontrol_profile(score: &GuildScore) -> BiocontrolProfile {
    let m3 = &score.details.m3;
    BiocontrolProfile {
        score: score.metric(MetricId::M3).display,
        n_mechanisms: m3.n_mechanisms,
        specific_predator_matches: m3.specific_predator_matches,
        specific_fungi_matches: m3.specific_fungi_matches,
        matched_predator_pairs: m3.matched_predator_pairs.clone(),
        matched_fungi_pairs: m3.matched_fungi_pairs.clone(),
        top_predators: rank_agents(&m3.predator_counts),
        top_entomo_fungi: rank_agents(&m3.entomo_fungi_counts),
    }
}
