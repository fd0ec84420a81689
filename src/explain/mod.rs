//! Explanation generation.
//!
//! Derives structured, human-readable evidence from a `GuildScore`'s
//! intermediate detail: ranked top agents per network metric, category
//! breakdowns, and per-plant hub rankings. Purely derivational — nothing here
//! recomputes a metric or touches reference data, so identical scores always
//! yield identical explanations. All rankings break ties by name ascending.

pub mod biocontrol;
pub mod disease;
pub mod fungi;
pub mod pollinators;
pub mod strategy;
pub mod structure;

pub use biocontrol::BiocontrolProfile;
pub use disease::DiseaseControlProfile;
pub use fungi::FungalNetworkProfile;
pub use pollinators::{PollinatorProfile, PollinatorShare};
pub use strategy::{PlantStrategyView, StrategyProfile};
pub use structure::StructureProfile;

use crate::scorer::GuildScore;
use crate::types::ClimateTier;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// How many agents each ranked list retains.
pub const TOP_AGENTS: usize = 10;

/// One organism and how many guild members it connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentRank {
    pub name: String,
    pub plant_count: usize,
}

/// One guild member and its total network connections across metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlantHub {
    pub name: String,
    pub connections: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub plant_ids: Vec<String>,
    pub tier: ClimateTier,
    pub overall: f64,
    pub biocontrol: BiocontrolProfile,
    pub disease_control: DiseaseControlProfile,
    pub fungal_network: FungalNetworkProfile,
    pub pollinators: PollinatorProfile,
    pub structure: StructureProfile,
    pub strategy: StrategyProfile,
    /// Most-connected guild members across all four network metrics.
    pub hubs: Vec<PlantHub>,
}

/// Build the full explanation for a scored guild.
pub fn explain_guild(score: &GuildScore) -> Explanation {
    Explanation {
        plant_ids: score.plant_ids.clone(),
        tier: score.tier,
        overall: score.overall,
        biocontrol: biocontrol::biocontrol_profile(score),
        disease_control: disease::disease_control_profile(score),
        fungal_network: fungi::fungal_network_profile(score),
        pollinators: pollinators::pollinator_profile(score),
        structure: structure::structure_profile(score),
        strategy: strategy::strategy_profile(score),
        hubs: plant_hubs(score),
    }
}

/// Rank agents by plant count descending, name ascending, truncated to
/// `TOP_AGENTS`.
pub(crate) fn rank_agents(counts: &FxHashMap<String, usize>) -> Vec<AgentRank> {
    let mut ranked: Vec<AgentRank> = counts
        .iter()
        .map(|(name, plant_count)| AgentRank {
            name: name.clone(),
            plant_count: *plant_count,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.plant_count
            .cmp(&a.plant_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    ranked.truncate(TOP_AGENTS);
    ranked
}

/// Sum per-plant link counts across the four network metrics.
fn plant_hubs(score: &GuildScore) -> Vec<PlantHub> {
    let mut totals: FxHashMap<&str, usize> = FxHashMap::default();
    let link_sets = [
        &score.details.m3.plant_links,
        &score.details.m4.plant_links,
        &score.details.m5.plant_links,
        &score.details.m7.plant_links,
    ];
    for links in link_sets {
        for (name, count) in links.iter() {
            *totals.entry(name.as_str()).or_insert(0) += count;
        }
    }

    let mut hubs: Vec<PlantHub> = totals
        .into_iter()
        .map(|(name, connections)| PlantHub {
            name: name.to_string(),
            connections,
        })
        .collect();
    hubs.sort_by(|a, b| {
        b.connections
            .cmp(&a.connections)
            .then_with(|| a.name.cmp(&b.name))
    });
    hubs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_breaks_ties_by_name() {
        let mut counts = FxHashMap::default();
        counts.insert("zeta bee".to_string(), 3);
        counts.insert("alpha bee".to_string(), 3);
        counts.insert("mid wasp".to_string(), 5);

        let ranked = rank_agents(&counts);
        let names: Vec<&str> = ranked.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["mid wasp", "alpha bee", "zeta bee"]);
    }

    #[test]
    fn ranking_truncates() {
        let mut counts = FxHashMap::default();
        for i in 0..20 {
            counts.insert(format!("agent {i:02}"), i);
        }
        assert_eq!(rank_agents(&counts).len(), TOP_AGENTS);
    }
}
