//! Disease-control evidence (M4).

use super::{rank_agents, AgentRank};
use crate::scorer::GuildScore;
use crate::types::MetricId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DiseaseControlProfile {
    pub score: f64,
    pub n_mechanisms: usize,
    pub specific_antagonist_matches: usize,
    pub specific_fungivore_matches: usize,
    /// (pathogen, antagonist) matches confirmed by the lookup tables.
    pub matched_antagonist_pairs: Vec<(String, String)>,
    /// (pathogen, fungivore) matches confirmed by the lookup tables.
    pub matched_fungivore_pairs: Vec<(String, String)>,
    pub top_mycoparasites: Vec<AgentRank>,
    pub top_fungivores: Vec<AgentRank>,
    /// Pathogen load: which pathogens recur across guild members.
    pub top_pathogens: Vec<AgentRank>,
}

pub fn disease_control_profile(score: &GuildScore) -> DiseaseControlProfile {
    let m4 = &score.details.m4;
    DiseaseControlProfile {
        score: score.metric(MetricId::M4).display,
        n_mechanisms: m4.n_mechanisms,
        specific_antagonist_matches: m4.specific_antagonist_matches,
        specific_fungivore_matches: m4.specific_fungivore_matches,
        matched_antagonist_pairs: m4.matched_antagonist_pairs.clone(),
        matched_fungivore_pairs: m4.matched_fungivore_pairs.clone(),
        top_mycoparasites: rank_agents(&m4.mycoparasite_counts),
        top_fungivores: rank_agents(&m4.fungivore_counts),
        top_pathogens: rank_agents(&m4.pathogen_counts),
    }
}
