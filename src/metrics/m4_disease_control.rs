//! M4: Disease Control
//!
//! Mirror of M3 over the fungal axis: for each plant with documented
//! pathogens, checks whether other guild members host mycoparasitic fungi or
//! fungivorous animals acting on those pathogens. Lookup-confirmed matches
//! (fungal antagonist or fungivore) weigh 1.0; general mycoparasites 0.5 and
//! general fungivores 0.2 per agent.

use crate::data::{GuildPlant, Lookups};
use crate::types::{MetricId, RawScore};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct M4Result {
    pub raw: RawScore,
    /// Summed mechanism weights before density scaling.
    pub control_total: f64,
    pub n_mechanisms: usize,
    /// mycoparasite -> number of guild members hosting it.
    pub mycoparasite_counts: FxHashMap<String, usize>,
    /// fungivore -> number of guild members hosting it.
    pub fungivore_counts: FxHashMap<String, usize>,
    /// pathogen -> number of guild members carrying it.
    pub pathogen_counts: FxHashMap<String, usize>,
    pub specific_antagonist_matches: usize,
    pub specific_fungivore_matches: usize,
    /// Deduplicated, sorted (pathogen, antagonist) matches.
    pub matched_antagonist_pairs: Vec<(String, String)>,
    /// Deduplicated, sorted (pathogen, fungivore) matches.
    pub matched_fungivore_pairs: Vec<(String, String)>,
    /// Per plant (by name, sorted): number of disease-control agents hosted.
    pub plant_links: Vec<(String, usize)>,
}

/// Calculate M4 for a guild. raw = sum over ordered pairs / (n*(n-1)) * 10.
pub fn calculate_m4(guild: &[GuildPlant<'_>], lookups: &Lookups) -> M4Result {
    let n_plants = guild.len();

    let mut control_total = 0.0;
    let mut n_mechanisms = 0;
    let mut specific_antagonist_matches = 0;
    let mut specific_fungivore_matches = 0;
    let mut matched_antagonist_pairs: Vec<(String, String)> = Vec::new();
    let mut matched_fungivore_pairs: Vec<(String, String)> = Vec::new();

    for (a_idx, plant_a) in guild.iter().enumerate() {
        let pathogens_a = &plant_a.fungi.pathogenic;
        if pathogens_a.is_empty() {
            continue;
        }

        for (b_idx, plant_b) in guild.iter().enumerate() {
            if a_idx == b_idx {
                continue;
            }

            let mycoparasites_b = &plant_b.fungi.mycoparasitic;
            if !mycoparasites_b.is_empty() {
                // Mechanism 1: lookup-confirmed fungal antagonists (weight 1.0)
                for pathogen in pathogens_a {
                    if let Some(known) = lookups.pathogen_antagonists.get(pathogen) {
                        let mut matched: Vec<&str> = known
                            .iter()
                            .map(String::as_str)
                            .filter(|f| mycoparasites_b.contains(*f))
                            .collect();
                        matched.sort_unstable();
                        matched.dedup();
                        if !matched.is_empty() {
                            control_total += matched.len() as f64;
                            n_mechanisms += 1;
                            specific_antagonist_matches += 1;
                            for antagonist in matched {
                                matched_antagonist_pairs
                                    .push((pathogen.clone(), antagonist.to_string()));
                            }
                        }
                    }
                }

                // Mechanism 3: general mycoparasites (weight 0.5 each)
                control_total += mycoparasites_b.len() as f64 * 0.5;
                n_mechanisms += 1;
            }

            let fungivores_b = &plant_b.organisms.fungivores;
            if !fungivores_b.is_empty() {
                // Mechanism 2: lookup-confirmed fungivores (weight 1.0)
                for pathogen in pathogens_a {
                    if let Some(known) = lookups.pathogen_fungivores.get(pathogen) {
                        let mut matched: Vec<&str> = known
                            .iter()
                            .map(String::as_str)
                            .filter(|f| fungivores_b.contains(*f))
                            .collect();
                        matched.sort_unstable();
                        matched.dedup();
                        if !matched.is_empty() {
                            control_total += matched.len() as f64;
                            n_mechanisms += 1;
                            specific_fungivore_matches += 1;
                            for fungivore in matched {
                                matched_fungivore_pairs
                                    .push((pathogen.clone(), fungivore.to_string()));
                            }
                        }
                    }
                }

                // Mechanism 4: general fungivores (weight 0.2 each)
                control_total += fungivores_b.len() as f64 * 0.2;
            }
        }
    }

    let max_pairs = n_plants.saturating_sub(1) * n_plants;
    let density = if max_pairs > 0 {
        control_total / max_pairs as f64 * 10.0
    } else {
        0.0
    };

    matched_antagonist_pairs.sort_unstable();
    matched_antagonist_pairs.dedup();
    matched_fungivore_pairs.sort_unstable();
    matched_fungivore_pairs.dedup();

    let mut plant_links: Vec<(String, usize)> = guild
        .iter()
        .map(|p| {
            (
                p.record.name.clone(),
                p.fungi.mycoparasitic.len() + p.organisms.fungivores.len(),
            )
        })
        .collect();
    plant_links.sort_unstable();

    M4Result {
        raw: RawScore::new(MetricId::M4, density),
        control_total,
        n_mechanisms,
        mycoparasite_counts: count_hosts(guild, |p| &p.fungi.mycoparasitic),
        fungivore_counts: count_hosts(guild, |p| &p.organisms.fungivores),
        pathogen_counts: count_hosts(guild, |p| &p.fungi.pathogenic),
        specific_antagonist_matches,
        specific_fungivore_matches,
        matched_antagonist_pairs,
        matched_fungivore_pairs,
        plant_links,
    }
}

fn count_hosts<'a, F>(guild: &'a [GuildPlant<'a>], set_for: F) -> FxHashMap<String, usize>
where
    F: Fn(&GuildPlant<'a>) -> &'a rustc_hash::FxHashSet<String>,
{
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();
    for plant in guild {
        for agent in set_for(plant) {
            *counts.entry(agent.clone()).or_insert(0) += 1;
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

    #[test]
    fn general_and_specific_mechanisms_weighted() {
        let mut data = ReferenceData::default();
        data.lookups
            .add_antagonists_of("fusarium oxysporum", &["trichoderma harzianum"]);

        // Vulnerable plant with one pathogen
        let mut sick = FungalProfile::default();
        sick.extend_category(FungusCategory::Pathogenic, ["fusarium oxysporum"]);
        data.insert_plant(record("v"), InteractionProfile::default(), sick);

        // Protector hosts the known antagonist plus one extra mycoparasite,
        // and two fungivorous animals
        let mut guard_fungi = FungalProfile::default();
        guard_fungi.extend_category(
            FungusCategory::Mycoparasitic,
            ["trichoderma harzianum", "clonostachys rosea"],
        );
        let mut guard_organisms = InteractionProfile::default();
        guard_organisms.extend_role(OrganismRole::Fungivore, ["collembola a", "collembola b"]);
        data.insert_plant(record("g"), guard_organisms, guard_fungi);

        let ids: Vec<String> = ["v", "g"].iter().map(|s| s.to_string()).collect();
        let guild = data.guild_view(&ids).unwrap();
        let result = calculate_m4(&guild, &data.lookups);

        // specific antagonist 1.0 + general mycoparasites 2*0.5 + general fungivores 2*0.2
        assert_relative_eq!(result.control_total, 2.4, epsilon = 1e-12);
        assert_relative_eq!(result.raw.value, 2.4 / 2.0 * 10.0, epsilon = 1e-12);
        assert_eq!(result.specific_antagonist_matches, 1);
        assert_eq!(
            result.matched_antagonist_pairs,
            vec![(
                "fusarium oxysporum".to_string(),
                "trichoderma harzianum".to_string()
            )]
        );
    }

    #[test]
    fn fungivore_lookup_match_weighs_full() {
        let mut data = ReferenceData::default();
        data.lookups
            .add_fungivores_of("botrytis cinerea", &["folsomia candida"]);

        let mut sick = FungalProfile::default();
        sick.extend_category(FungusCategory::Pathogenic, ["botrytis cinerea"]);
        data.insert_plant(record("v"), InteractionProfile::default(), sick);

        let mut guard_organisms = InteractionProfile::default();
        guard_organisms.extend_role(OrganismRole::Fungivore, ["folsomia candida"]);
        data.insert_plant(record("g"), guard_organisms, FungalProfile::default());

        let ids: Vec<String> = ["v", "g"].iter().map(|s| s.to_string()).collect();
        let guild = data.guild_view(&ids).unwrap();
        let result = calculate_m4(&guild, &data.lookups);

        // specific fungivore 1.0 + general fungivore 0.2
        assert_relative_eq!(result.control_total, 1.2, epsilon = 1e-12);
        assert_eq!(result.specific_fungivore_matches, 1);
    }

    #[test]
    fn healthy_guild_scores_zero() {
        let mut data = ReferenceData::default();
        for id in ["a", "b"] {
            let mut fungi = FungalProfile::default();
            fungi.extend_category(FungusCategory::Mycoparasitic, ["trichoderma harzianum"]);
            data.insert_plant(record(id), InteractionProfile::default(), fungi);
        }
        let ids: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let guild = data.guild_view(&ids).unwrap();
        // No pathogens anywhere, so no vulnerable pairs
        let result = calculate_m4(&guild, &data.lookups);
        assert_eq!(result.raw.value, 0.0);
        assert_eq!(result.n_mechanisms, 0);
    }
}
