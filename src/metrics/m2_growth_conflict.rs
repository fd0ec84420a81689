//! M2: Growth-Strategy Conflict
//!
//! Detects Grime CSR strategy conflicts between guild members (C-C, C-S, C-R,
//! R-R) with severity modulated by growth form, height separation, and light
//! preference. The raw value is conflict density: summed pair severities over
//! all ordered pairs.

use crate::calibration::{csr_to_percentile, CsrAxis, CsrCalibration};
use crate::data::GuildPlant;
use crate::error::{Result, ScoreError};
use crate::types::{MetricId, RawScore};

/// Dominant-strategy threshold: a plant counts as high-C/S/R when its
/// percentile for that axis is in the top quartile.
pub const PERCENTILE_THRESHOLD: f64 = 75.0;

/// Per-plant CSR view used for conflict detection and explanation.
#[derive(Debug, Clone)]
pub struct PlantStrategy {
    pub name: String,
    pub c_raw: f64,
    pub s_raw: f64,
    pub r_raw: f64,
    pub c_percentile: f64,
    pub s_percentile: f64,
    pub r_percentile: f64,
    pub dominant_strategy: String,
    height_m: f64,
    growth_form: String,
    light_pref: f64,
}

#[derive(Debug, Clone)]
pub struct M2Result {
    pub raw: RawScore,
    /// Summed pair severities before density normalization.
    pub total_conflicts: f64,
    pub high_c_count: usize,
    pub high_s_count: usize,
    pub high_r_count: usize,
    pub plant_strategies: Vec<PlantStrategy>,
}

/// Calculate M2 conflict density for a guild.
///
/// Every plant must carry a CSR triple; substituting a neutral default would
/// distort conflict detection, so a missing triple is an error.
pub fn calculate_m2(
    guild: &[GuildPlant<'_>],
    csr_calibration: Option<&CsrCalibration>,
) -> Result<M2Result> {
    let plants = extract_strategies(guild, csr_calibration)?;
    let n_plants = plants.len();

    let high_c: Vec<usize> = high_indices(&plants, |p| p.c_percentile);
    let high_s: Vec<usize> = high_indices(&plants, |p| p.s_percentile);
    let high_r: Vec<usize> = high_indices(&plants, |p| p.r_percentile);

    let mut total_conflicts = 0.0;

    // C-C: two competitors contest the same canopy space
    for (pos, &i) in high_c.iter().enumerate() {
        for &j in &high_c[pos + 1..] {
            total_conflicts += c_c_conflict(&plants[i], &plants[j]);
        }
    }

    // C-S: competitor overtops a stress-tolerator
    for &i in &high_c {
        for &j in &high_s {
            if i != j {
                total_conflicts += c_s_conflict(&plants[i], &plants[j]);
            }
        }
    }

    // C-R: competitor closes the gaps ruderals exploit
    for &i in &high_c {
        for &j in &high_r {
            if i != j {
                total_conflicts += c_r_conflict(&plants[i], &plants[j]);
            }
        }
    }

    // R-R: fixed low severity
    if high_r.len() >= 2 {
        let pairs = high_r.len() * (high_r.len() - 1) / 2;
        total_conflicts += pairs as f64 * 0.3;
    }

    let max_pairs = if n_plants > 1 {
        n_plants * (n_plants - 1)
    } else {
        1
    };
    let conflict_density = total_conflicts / max_pairs as f64;

    Ok(M2Result {
        raw: RawScore::new(MetricId::M2, conflict_density),
        total_conflicts,
        high_c_count: high_c.len(),
        high_s_count: high_s.len(),
        high_r_count: high_r.len(),
        plant_strategies: plants,
    })
}

fn high_indices<F: Fn(&PlantStrategy) -> f64>(plants: &[PlantStrategy], pct: F) -> Vec<usize> {
    plants
        .iter()
        .enumerate()
        .filter(|(_, p)| pct(p) > PERCENTILE_THRESHOLD)
        .map(|(i, _)| i)
        .collect()
}

fn extract_strategies(
    guild: &[GuildPlant<'_>],
    csr_calibration: Option<&CsrCalibration>,
) -> Result<Vec<PlantStrategy>> {
    guild
        .iter()
        .map(|plant| {
            let record = plant.record;
            let csr = record.csr.ok_or_else(|| ScoreError::MissingTrait {
                id: record.id.clone(),
                field: "csr",
            })?;

            let c_pct = csr_to_percentile(csr.c, CsrAxis::C, csr_calibration);
            let s_pct = csr_to_percentile(csr.s, CsrAxis::S, csr_calibration);
            let r_pct = csr_to_percentile(csr.r, CsrAxis::R, csr_calibration);

            Ok(PlantStrategy {
                name: record.name.clone(),
                c_raw: csr.c,
                s_raw: csr.s,
                r_raw: csr.r,
                c_percentile: c_pct,
                s_percentile: s_pct,
                r_percentile: r_pct,
                dominant_strategy: dominant_strategy(c_pct, s_pct, r_pct),
                height_m: record.height_m.unwrap_or(1.0),
                growth_form: record.growth_form.clone().unwrap_or_default(),
                light_pref: record.light_pref.unwrap_or(5.0),
            })
        })
        .collect()
}

/// Label the dominant strategy, or "Mixed" when the three percentiles sit
/// within 20 points of each other.
fn dominant_strategy(c_pct: f64, s_pct: f64, r_pct: f64) -> String {
    let max_pct = c_pct.max(s_pct).max(r_pct);
    let min_pct = c_pct.min(s_pct).min(r_pct);
    if max_pct - min_pct < 20.0 {
        return "Mixed".to_string();
    }

    if c_pct >= s_pct && c_pct >= r_pct {
        if c_pct > PERCENTILE_THRESHOLD { "Competitive" } else { "C-leaning" }
    } else if s_pct >= c_pct && s_pct >= r_pct {
        if s_pct > PERCENTILE_THRESHOLD { "Stress-tolerant" } else { "S-leaning" }
    } else if r_pct > PERCENTILE_THRESHOLD {
        "Ruderal"
    } else {
        "R-leaning"
    }
    .to_string()
}

fn is_climbing(form: &str) -> bool {
    form.contains("vine") || form.contains("liana") || form.contains("climber")
}

/// C-C conflict with growth-form and height modulation.
fn c_c_conflict(a: &PlantStrategy, b: &PlantStrategy) -> f64 {
    let mut conflict = 1.0;

    if (is_climbing(&a.growth_form) && b.growth_form.contains("tree"))
        || (is_climbing(&b.growth_form) && a.growth_form.contains("tree"))
    {
        conflict *= 0.2; // climber uses the tree as scaffold
    } else if (a.growth_form.contains("tree") && b.growth_form.contains("herb"))
        || (b.growth_form.contains("tree") && a.growth_form.contains("herb"))
    {
        conflict *= 0.4; // different vertical niches
    } else {
        let height_diff = (a.height_m - b.height_m).abs();
        if height_diff < 2.0 {
            // same canopy layer, full severity
        } else if height_diff < 5.0 {
            conflict *= 0.6;
        } else {
            conflict *= 0.3;
        }
    }

    conflict
}

/// C-S conflict; the stress-tolerator's light preference decides everything.
fn c_s_conflict(plant_c: &PlantStrategy, plant_s: &PlantStrategy) -> f64 {
    let s_light = plant_s.light_pref;

    if s_light < 3.2 {
        // shade-adapted S wants to sit under the competitor's canopy
        0.0
    } else if s_light > 7.47 {
        // sun-loving S will be shaded out
        0.9
    } else {
        let height_diff = (plant_c.height_m - plant_s.height_m).abs();
        if height_diff > 8.0 {
            0.6 * 0.3
        } else {
            0.6
        }
    }
}

/// C-R conflict; large height separation gives ruderals their gaps back.
fn c_r_conflict(plant_c: &PlantStrategy, plant_r: &PlantStrategy) -> f64 {
    let height_diff = (plant_c.height_m - plant_r.height_m).abs();
    if height_diff > 5.0 {
        0.8 * 0.3
    } else {
        0.8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FungalProfile, InteractionProfile, PlantRecord, ReferenceData};
    use crate::data::CsrProfile;
    use crate::types::ClimateTier;
    use approx::assert_relative_eq;

    fn strategy(name: &str, height_m: f64, growth_form: &str, light_pref: f64) -> PlantStrategy {
        PlantStrategy {
            name: name.to_string(),
            c_raw: 0.0,
            s_raw: 0.0,
            r_raw: 0.0,
            c_percentile: 0.0,
            s_percentile: 0.0,
            r_percentile: 0.0,
            dominant_strategy: "Mixed".to_string(),
            height_m,
            growth_form: growth_form.to_string(),
            light_pref,
        }
    }

    #[test]
    fn vine_on_tree_is_discounted() {
        let vine = strategy("vine", 8.0, "vine", 5.0);
        let tree = strategy("tree", 20.0, "tree", 5.0);
        assert_relative_eq!(c_c_conflict(&vine, &tree), 0.2);
        assert_relative_eq!(c_c_conflict(&tree, &vine), 0.2);
    }

    #[test]
    fn same_canopy_layer_full_severity() {
        let a = strategy("a", 10.0, "shrub", 5.0);
        let b = strategy("b", 11.0, "shrub", 5.0);
        assert_relative_eq!(c_c_conflict(&a, &b), 1.0);

        let c = strategy("c", 18.0, "shrub", 5.0);
        assert_relative_eq!(c_c_conflict(&a, &c), 0.3);
    }

    #[test]
    fn shade_adapted_s_has_no_conflict() {
        let comp = strategy("comp", 20.0, "tree", 7.0);
        let shade_s = strategy("shade", 1.0, "herb", 2.5);
        let sun_s = strategy("sun", 1.0, "herb", 8.0);
        assert_relative_eq!(c_s_conflict(&comp, &shade_s), 0.0);
        assert_relative_eq!(c_s_conflict(&comp, &sun_s), 0.9);
    }

    #[test]
    fn missing_csr_is_an_error() {
        let mut data = ReferenceData::default();
        data.insert_plant(
            PlantRecord {
                id: "p1".to_string(),
                name: "p1".to_string(),
                csr: None,
                light_pref: None,
                height_m: None,
                growth_form: None,
                tiers: vec![ClimateTier::Tropical],
            },
            InteractionProfile::default(),
            FungalProfile::default(),
        );
        let guild = data.guild_view(&["p1".to_string()]).unwrap();
        let err = calculate_m2(&guild, None).unwrap_err();
        assert!(matches!(err, ScoreError::MissingTrait { field: "csr", .. }));
    }

    #[test]
    fn two_competitors_same_layer_full_density() {
        // Fallback percentiles: c >= 60 -> 100, so both plants are high-C
        let mut data = ReferenceData::default();
        for (id, height) in [("p1", 10.0), ("p2", 10.5)] {
            data.insert_plant(
                PlantRecord {
                    id: id.to_string(),
                    name: id.to_string(),
                    csr: Some(CsrProfile { c: 80.0, s: 10.0, r: 10.0 }),
                    light_pref: Some(5.0),
                    height_m: Some(height),
                    growth_form: Some("shrub".to_string()),
                    tiers: vec![ClimateTier::Tropical],
                },
                InteractionProfile::default(),
                FungalProfile::default(),
            );
        }
        let ids: Vec<String> = ["p1", "p2"].iter().map(|s| s.to_string()).collect();
        let guild = data.guild_view(&ids).unwrap();
        let result = calculate_m2(&guild, None).unwrap();

        assert_eq!(result.high_c_count, 2);
        assert_relative_eq!(result.total_conflicts, 1.0);
        // density over ordered pairs: 1.0 / (2*1)
        assert_relative_eq!(result.raw.value, 0.5);
    }
}
