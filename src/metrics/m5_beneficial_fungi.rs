//! M5: Beneficial Fungi Network
//!
//! Scores common mycorrhizal network potential from two components: network
//! connectivity (fungi shared by two or more members) and coverage (fraction
//! of members with any beneficial fungus at all).

use crate::data::GuildPlant;
use crate::metrics::shared::count_shared_organisms;
use crate::types::{FungusCategory, MetricId, RawScore};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct M5Result {
    pub raw: RawScore,
    /// Sum over shared fungi of plants_hosting / n_plants.
    pub network_score: f64,
    /// Fraction of plants with at least one beneficial fungus.
    pub coverage_ratio: f64,
    /// Fungi hosted by two or more guild members.
    pub n_shared_fungi: usize,
    pub plants_with_fungi: usize,
    /// fungus -> number of guild members hosting it (all beneficial categories).
    pub fungi_counts: FxHashMap<String, usize>,
    /// Per plant (by name, sorted): number of shared beneficial fungi hosted.
    pub plant_links: Vec<(String, usize)>,
}

/// Calculate M5. raw = network * 0.6 + coverage * 0.4.
pub fn calculate_m5(guild: &[GuildPlant<'_>]) -> M5Result {
    let n_plants = guild.len();
    if n_plants == 0 {
        return M5Result {
            raw: RawScore::new(MetricId::M5, 0.0),
            network_score: 0.0,
            coverage_ratio: 0.0,
            n_shared_fungi: 0,
            plants_with_fungi: 0,
            fungi_counts: FxHashMap::default(),
            plant_links: Vec::new(),
        };
    }

    let fungi_counts = count_shared_organisms(guild, |p| {
        FungusCategory::BENEFICIAL.iter().map(|c| p.fungi.category(*c))
    });

    let mut network_score = 0.0;
    let mut n_shared_fungi = 0;
    for count in fungi_counts.values() {
        if *count >= 2 {
            network_score += *count as f64 / n_plants as f64;
            n_shared_fungi += 1;
        }
    }

    let plants_with_fungi = guild.iter().filter(|p| p.fungi.has_beneficial()).count();
    let coverage_ratio = plants_with_fungi as f64 / n_plants as f64;

    let raw = network_score * 0.6 + coverage_ratio * 0.4;

    let mut plant_links: Vec<(String, usize)> = guild
        .iter()
        .map(|p| {
            let hosted: rustc_hash::FxHashSet<&str> = FungusCategory::BENEFICIAL
                .iter()
                .flat_map(|c| p.fungi.category(*c))
                .map(String::as_str)
                .collect();
            let links = hosted
                .iter()
                .filter(|f| fungi_counts.get(**f).copied().unwrap_or(0) >= 2)
                .count();
            (p.record.name.clone(), links)
        })
        .collect();
    plant_links.sort_unstable();

    M5Result {
        raw: RawScore::new(MetricId::M5, raw),
        network_score,
        coverage_ratio,
        n_shared_fungi,
        plants_with_fungi,
        fungi_counts,
        plant_links,
    }
}
