//! M3: Biocontrol Network
//!
//! Pairwise analysis of natural pest control: for each vulnerable plant (one
//! with documented herbivores), checks whether the other guild members host
//! predators or entomopathogenic fungi that act on those herbivores. Specific
//! lookup-confirmed matches weigh 1.0; general entomopathogenic fungi weigh
//! 0.2 per fungus.

use crate::data::{GuildPlant, Lookups};
use crate::types::{MetricId, RawScore};
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone)]
pub struct M3Result {
    pub raw: RawScore,
    /// Summed mechanism weights before density scaling.
    pub biocontrol_total: f64,
    pub n_mechanisms: usize,
    /// predator -> number of guild members hosting it (known predators only).
    pub predator_counts: FxHashMap<String, usize>,
    /// entomopathogenic fungus -> number of guild members hosting it.
    pub entomo_fungi_counts: FxHashMap<String, usize>,
    pub specific_predator_matches: usize,
    pub specific_fungi_matches: usize,
    /// Deduplicated, sorted (herbivore, predator) matches.
    pub matched_predator_pairs: Vec<(String, String)>,
    /// Deduplicated, sorted (herbivore, fungus) matches.
    pub matched_fungi_pairs: Vec<(String, String)>,
    /// Per plant (by name, sorted): number of known biocontrol agents hosted.
    pub plant_links: Vec<(String, usize)>,
}

/// Calculate M3 for a guild. raw = sum over ordered pairs / (n*(n-1)) * 20.
pub fn calculate_m3(guild: &[GuildPlant<'_>], lookups: &Lookups) -> M3Result {
    let n_plants = guild.len();

    let mut biocontrol_total = 0.0;
    let mut n_mechanisms = 0;
    let mut specific_predator_matches = 0;
    let mut specific_fungi_matches = 0;
    let mut matched_predator_pairs: Vec<(String, String)> = Vec::new();
    let mut matched_fungi_pairs: Vec<(String, String)> = Vec::new();

    // Protective set per plant: predator sub-roles plus flower visitors,
    // already deduplicated and case-normalized at extraction
    let protective: Vec<FxHashSet<&str>> = guild
        .iter()
        .map(|p| {
            p.organisms
                .predators
                .iter()
                .chain(p.organisms.flower_visitors.iter())
                .map(String::as_str)
                .collect()
        })
        .collect();

    for (a_idx, plant_a) in guild.iter().enumerate() {
        let herbivores_a = &plant_a.organisms.herbivores;
        if herbivores_a.is_empty() {
            continue;
        }

        for (b_idx, plant_b) in guild.iter().enumerate() {
            if a_idx == b_idx {
                continue;
            }
            let protective_b = &protective[b_idx];

            // Mechanism 1: lookup-confirmed predators (weight 1.0 per match)
            for herbivore in herbivores_a {
                if let Some(known) = lookups.herbivore_predators.get(herbivore) {
                    let mut matched: Vec<&str> = known
                        .iter()
                        .map(String::as_str)
                        .filter(|p| protective_b.contains(p))
                        .collect();
                    matched.sort_unstable();
                    matched.dedup();
                    if !matched.is_empty() {
                        biocontrol_total += matched.len() as f64;
                        n_mechanisms += 1;
                        specific_predator_matches += 1;
                        for predator in matched {
                            matched_predator_pairs
                                .push((herbivore.clone(), predator.to_string()));
                        }
                    }
                }
            }

            let entomo_b = &plant_b.fungi.entomopathogenic;
            if entomo_b.is_empty() {
                continue;
            }

            // Mechanism 2: lookup-confirmed entomopathogenic fungi (weight 1.0)
            for herbivore in herbivores_a {
                if let Some(known) = lookups.insect_parasites.get(herbivore) {
                    let mut matched: Vec<&str> = known
                        .iter()
                        .map(String::as_str)
                        .filter(|f| entomo_b.contains(*f))
                        .collect();
                    matched.sort_unstable();
                    matched.dedup();
                    if !matched.is_empty() {
                        biocontrol_total += matched.len() as f64;
                        n_mechanisms += 1;
                        specific_fungi_matches += 1;
                        for fungus in matched {
                            matched_fungi_pairs.push((herbivore.clone(), fungus.to_string()));
                        }
                    }
                }
            }

            // Mechanism 3: general entomopathogenic fungi (weight 0.2 each)
            biocontrol_total += entomo_b.len() as f64 * 0.2;
        }
    }

    let max_pairs = n_plants.saturating_sub(1) * n_plants;
    let density = if max_pairs > 0 {
        biocontrol_total / max_pairs as f64 * 20.0
    } else {
        0.0
    };

    matched_predator_pairs.sort_unstable();
    matched_predator_pairs.dedup();
    matched_fungi_pairs.sort_unstable();
    matched_fungi_pairs.dedup();

    let known_predators: FxHashSet<&str> = lookups
        .herbivore_predators
        .values()
        .flatten()
        .map(String::as_str)
        .collect();
    let known_fungi: FxHashSet<&str> = lookups
        .insect_parasites
        .values()
        .flatten()
        .map(String::as_str)
        .collect();

    let mut plant_links: Vec<(String, usize)> = guild
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let links = protective[idx]
                .iter()
                .filter(|a| known_predators.contains(*a))
                .count()
                + p.fungi
                    .entomopathogenic
                    .iter()
                    .filter(|f| known_fungi.contains(f.as_str()))
                    .count();
            (p.record.name.clone(), links)
        })
        .collect();
    plant_links.sort_unstable();

    M3Result {
        raw: RawScore::new(MetricId::M3, density),
        biocontrol_total,
        n_mechanisms,
        predator_counts: agent_counts(&protective, &known_predators),
        entomo_fungi_counts: agent_counts(
            &guild
                .iter()
                .map(|p| {
                    p.fungi
                        .entomopathogenic
                        .iter()
                        .map(String::as_str)
                        .collect()
                })
                .collect::<Vec<_>>(),
            &known_fungi,
        ),
        specific_predator_matches,
        specific_fungi_matches,
        matched_predator_pairs,
        matched_fungi_pairs,
        plant_links,
    }
}

/// agent -> number of plants hosting it, restricted to agents the lookup
/// tables recognize as biocontrol agents.
fn agent_counts(
    per_plant: &[FxHashSet<&str>],
    known: &FxHashSet<&str>,
) -> FxHashMap<String, usize> {
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    for agents in per_plant {
        for agent in agents {
            if known.contains(agent) {
                *counts.entry(agent.to_string()).or_insert(0) += 1;
            }
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        FungalProfile, InteractionProfile, OrganismRole, PlantRecord, ReferenceData,
    };
    use crate::types::{ClimateTier, FungusCategory};
    use approx::assert_relative_eq;

    fn record(id: &str) -> PlantRecord {
        PlantRecord {
            id: id.to_string(),
            name: id.to_string(),
            csr: None,
            light_pref: None,
            height_m: None,
            growth_form: None,
            tiers: vec![ClimateTier::HumidTemperate],
        }
    }

    /// Seven plants: p1 carries a herbivore whose known predator is hosted by
    /// p2..p7 (6 ordered pairs at 1.0), and p2..p4 each carry one general
    /// entomopathogenic fungus (3 pairs at 0.2).
    fn seven_plant_reference() -> (ReferenceData, Vec<String>) {
        let mut data = ReferenceData::default();
        data.lookups
            .add_predators_of("aphis fabae", &["coccinella septempunctata"]);

        let mut p1 = InteractionProfile::default();
        p1.extend_role(OrganismRole::Herbivore, ["aphis fabae"]);
        data.insert_plant(record("p1"), p1, FungalProfile::default());

        for idx in 2..=7 {
            let id = format!("p{idx}");
            let mut organisms = InteractionProfile::default();
            organisms.extend_role(OrganismRole::Predator, ["coccinella septempunctata"]);
            let mut fungi = FungalProfile::default();
            if idx <= 4 {
                fungi.extend_category(FungusCategory::Entomopathogenic, ["beauveria bassiana"]);
            }
            data.insert_plant(record(&id), organisms, fungi);
        }

        let ids = (1..=7).map(|i| format!("p{i}")).collect();
        (data, ids)
    }

    #[test]
    fn density_formula_is_literal() {
        let (data, ids) = seven_plant_reference();
        let guild = data.guild_view(&ids).unwrap();
        let result = calculate_m3(&guild, &data.lookups);

        // (6*1.0 + 3*0.2) / (7*6) * 20
        assert_relative_eq!(result.biocontrol_total, 6.6, epsilon = 1e-12);
        assert_relative_eq!(result.raw.value, 3.14286, epsilon = 1e-5);
        assert_eq!(result.specific_predator_matches, 6);
        assert_eq!(result.specific_fungi_matches, 0);
        assert_eq!(
            result.matched_predator_pairs,
            vec![(
                "aphis fabae".to_string(),
                "coccinella septempunctata".to_string()
            )]
        );
    }

    #[test]
    fn case_mismatched_lookup_still_fires() {
        let mut data = ReferenceData::default();
        // Lookup table and interaction data disagree on capitalization
        data.lookups
            .add_predators_of("Aphis FABAE", &["COCCINELLA Septempunctata"]);

        let mut vulnerable = InteractionProfile::default();
        vulnerable.extend_role(OrganismRole::Herbivore, ["aphis fabae"]);
        data.insert_plant(record("v"), vulnerable, FungalProfile::default());

        let mut protector = InteractionProfile::default();
        protector.extend_role(OrganismRole::Predator, ["coccinella septempunctata"]);
        data.insert_plant(record("g"), protector, FungalProfile::default());

        let ids: Vec<String> = ["v", "g"].iter().map(|s| s.to_string()).collect();
        let guild = data.guild_view(&ids).unwrap();
        let result = calculate_m3(&guild, &data.lookups);

        assert_eq!(result.specific_predator_matches, 1);
        assert_relative_eq!(result.raw.value, 1.0 / 2.0 * 20.0);
    }

    #[test]
    fn flower_visitors_count_as_protective() {
        let mut data = ReferenceData::default();
        data.lookups.add_predators_of("herb x", &["hoverfly y"]);

        let mut vulnerable = InteractionProfile::default();
        vulnerable.extend_role(OrganismRole::Herbivore, ["herb x"]);
        data.insert_plant(record("v"), vulnerable, FungalProfile::default());

        let mut protector = InteractionProfile::default();
        protector.extend_role(OrganismRole::FlowerVisitor, ["hoverfly y"]);
        data.insert_plant(record("g"), protector, FungalProfile::default());

        let ids: Vec<String> = ["v", "g"].iter().map(|s| s.to_string()).collect();
        let guild = data.guild_view(&ids).unwrap();
        let result = calculate_m3(&guild, &data.lookups);
        assert_eq!(result.specific_predator_matches, 1);
    }

    #[test]
    fn single_plant_guild_scores_zero() {
        let mut data = ReferenceData::default();
        let mut organisms = InteractionProfile::default();
        organisms.extend_role(OrganismRole::Herbivore, ["aphis fabae"]);
        data.insert_plant(record("p1"), organisms, FungalProfile::default());

        let guild = data.guild_view(&["p1".to_string()]).unwrap();
        let result = calculate_m3(&guild, &data.lookups);
        assert_eq!(result.raw.value, 0.0);
    }
}
