//! M7: Pollinator Support
//!
//! Quadratic-weighted pollinator overlap: each pollinator shared by two or
//! more members contributes (plants_visited / n_plants)^2, so broadly shared
//! keystone pollinators dominate the score. Only the dedicated pollinator
//! role counts; the flower-visitor role mixes in herbivores and incidental
//! visitors and is excluded here.

use crate::data::GuildPlant;
use crate::metrics::shared::count_shared_organisms;
use crate::types::{MetricId, RawScore};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone)]
pub struct M7Result {
    pub raw: RawScore,
    /// Pollinators shared by two or more guild members.
    pub n_shared_pollinators: usize,
    pub plants_with_pollinators: usize,
    pub total_plants: usize,
    /// Percent of plants with at least one documented pollinator.
    pub coverage_pct: f64,
    /// pollinator -> number of guild members it visits.
    pub pollinator_counts: FxHashMap<String, usize>,
    /// Per plant (by name, sorted): number of shared pollinators hosted.
    pub plant_links: Vec<(String, usize)>,
}

/// Calculate M7. raw = sum over shared pollinators of (count / n)^2.
pub fn calculate_m7(guild: &[GuildPlant<'_>]) -> M7Result {
    let n_plants = guild.len();
    if n_plants == 0 {
        return M7Result {
            raw: RawScore::new(MetricId::M7, 0.0),
            n_shared_pollinators: 0,
            plants_with_pollinators: 0,
            total_plants: 0,
            coverage_pct: 0.0,
            pollinator_counts: FxHashMap::default(),
            plant_links: Vec::new(),
        };
    }

    let pollinator_counts = count_shared_organisms(guild, |p| [&p.organisms.pollinators]);

    let mut quadratic = 0.0;
    let mut n_shared_pollinators = 0;
    for count in pollinator_counts.values() {
        if *count >= 2 {
            let overlap_ratio = *count as f64 / n_plants as f64;
            quadratic += overlap_ratio * overlap_ratio;
            n_shared_pollinators += 1;
        }
    }

    let plants_with_pollinators = guild
        .iter()
        .filter(|p| !p.organisms.pollinators.is_empty())
        .count();
    let coverage_pct = plants_with_pollinators as f64 / n_plants as f64 * 100.0;

    let mut plant_links: Vec<(String, usize)> = guild
        .iter()
        .map(|p| {
            let links = p
                .organisms
                .pollinators
                .iter()
                .filter(|name| pollinator_counts.get(name.as_str()).copied().unwrap_or(0) >= 2)
                .count();
            (p.record.name.clone(), links)
        })
        .collect();
    plant_links.sort_unstable();

    M7Result {
        raw: RawScore::new(MetricId::M7, quadratic),
        n_shared_pollinators,
        plants_with_pollinators,
        total_plants: n_plants,
        coverage_pct,
        pollinator_counts,
        plant_links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        FungalProfile, InteractionProfile, OrganismRole, PlantRecord, ReferenceData,
    };
    use crate::types::ClimateTier;
    use approx::assert_relative_eq;

    fn reference(entries: &[(&str, &[&str])]) -> ReferenceData {
        let mut data = ReferenceData::default();
        for (id, pollinators) in entries {
            let mut organisms = InteractionProfile::default();
            organisms.extend_role(OrganismRole::Pollinator, pollinators.iter().copied());
            data.insert_plant(
                PlantRecord {
                    id: id.to_string(),
                    name: id.to_string(),
                    csr: None,
                    light_pref: None,
                    height_m: None,
                    growth_form: None,
                    tiers: vec![ClimateTier::Mediterranean],
                },
                organisms,
                FungalProfile::default(),
            );
        }
        data
    }

    #[test]
    fn quadratic_weighting_of_shared_pollinator() {
        // apis mellifera on 5 of 7 plants, nothing else shared
        let entries: Vec<(&str, &[&str])> = vec![
            ("p1", &["apis mellifera"]),
            ("p2", &["apis mellifera"]),
            ("p3", &["apis mellifera"]),
            ("p4", &["apis mellifera"]),
            ("p5", &["apis mellifera"]),
            ("p6", &["bombus terrestris"]),
            ("p7", &[]),
        ];
        let data = reference(&entries);
        let ids: Vec<String> = (1..=7).map(|i| format!("p{i}")).collect();
        let guild = data.guild_view(&ids).unwrap();
        let result = calculate_m7(&guild);

        assert_relative_eq!(result.raw.value, (5.0f64 / 7.0).powi(2), epsilon = 1e-12);
        assert_relative_eq!(result.raw.value, 0.5102, epsilon = 1e-4);
        assert_eq!(result.n_shared_pollinators, 1);
        assert_eq!(result.plants_with_pollinators, 6);
    }

    #[test]
    fn aggregate_is_sum_of_contributions() {
        let entries: Vec<(&str, &[&str])> = vec![
            ("p1", &["apis mellifera", "bombus terrestris"]),
            ("p2", &["apis mellifera", "bombus terrestris"]),
            ("p3", &["apis mellifera", "bombus terrestris"]),
            ("p4", &["bombus terrestris"]),
            ("p5", &[]),
        ];
        let data = reference(&entries);
        let ids: Vec<String> = (1..=5).map(|i| format!("p{i}")).collect();
        let guild = data.guild_view(&ids).unwrap();
        let result = calculate_m7(&guild);

        // (3/5)^2 + (4/5)^2 = 0.36 + 0.64
        assert_relative_eq!(result.raw.value, 1.0, epsilon = 1e-12);
        assert_eq!(result.n_shared_pollinators, 2);
    }

    #[test]
    fn unshared_pollinators_contribute_nothing() {
        let entries: Vec<(&str, &[&str])> =
            vec![("p1", &["apis mellifera"]), ("p2", &["bombus terrestris"])];
        let data = reference(&entries);
        let ids: Vec<String> = ["p1", "p2"].iter().map(|s| s.to_string()).collect();
        let guild = data.guild_view(&ids).unwrap();
        let result = calculate_m7(&guild);

        assert_eq!(result.raw.value, 0.0);
        assert_relative_eq!(result.coverage_pct, 100.0);
    }
}
