//! M6: Structural Stratification
//!
//! Scores vertical layering quality and growth-form diversity. A tall/short
//! pair only counts when the height difference exceeds one canopy layer
//! (2 m), and its validity depends on the shorter plant's light preference —
//! except for climbers paired with trees, which get full credit regardless:
//! a climbing plant reaching the canopy is complementary, not shaded out.

use crate::data::GuildPlant;
use crate::types::{MetricId, RawScore};
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct LayerPlant {
    pub name: String,
    pub height_m: f64,
    pub light_pref: Option<f64>,
}

/// Guild members grouped by growth form, ordered by minimum height.
#[derive(Debug, Clone, Serialize)]
pub struct StratumGroup {
    pub form: String,
    pub plants: Vec<LayerPlant>,
    pub height_range: (f64, f64),
}

#[derive(Debug, Clone)]
pub struct M6Result {
    pub raw: RawScore,
    pub height_range: f64,
    pub n_forms: usize,
    /// valid / (valid + invalid) height-difference mass.
    pub stratification_quality: f64,
    /// (distinct growth forms - 1) / 5.
    pub form_diversity: f64,
    pub groups: Vec<StratumGroup>,
}

/// Calculate M6. raw = 0.7 * stratification + 0.3 * form diversity.
pub fn calculate_m6(guild: &[GuildPlant<'_>]) -> M6Result {
    // Sort by height; plants without height data stay out of pair analysis
    let mut by_height: Vec<&GuildPlant<'_>> = guild
        .iter()
        .filter(|p| p.record.height_m.is_some())
        .collect();
    by_height.sort_by(|a, b| {
        a.record
            .height_m
            .partial_cmp(&b.record.height_m)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut valid = 0.0;
    let mut invalid = 0.0;

    for (i, short) in by_height.iter().enumerate() {
        for tall in &by_height[i + 1..] {
            let short_height = short.record.height_m.unwrap_or(0.0);
            let tall_height = tall.record.height_m.unwrap_or(0.0);
            let height_diff = tall_height - short_height;
            if height_diff <= 2.0 {
                continue;
            }

            // Climber under (or over) a tree: complementary, full credit
            let climbing_pair = (short.record.is_climbing_form() && tall.record.is_tree_form())
                || (short.record.is_tree_form() && tall.record.is_climbing_form());
            if climbing_pair {
                valid += height_diff;
                continue;
            }

            match short.record.light_pref {
                None => valid += height_diff * 0.5,
                Some(light) if light < 3.2 => valid += height_diff,
                Some(light) if light > 7.47 => invalid += height_diff,
                Some(_) => valid += height_diff * 0.6,
            }
        }
    }

    let total = valid + invalid;
    let stratification_quality = if total > 0.0 { valid / total } else { 0.0 };

    // Form diversity over distinct non-empty labels, six forms max
    let mut form_groups: FxHashMap<&str, Vec<LayerPlant>> = FxHashMap::default();
    for plant in guild {
        if let Some(form) = plant.record.growth_form.as_deref() {
            if !form.is_empty() {
                form_groups.entry(form).or_default().push(LayerPlant {
                    name: plant.record.name.clone(),
                    height_m: plant.record.height_m.unwrap_or(0.0),
                    light_pref: plant.record.light_pref,
                });
            }
        }
    }
    let n_forms = form_groups.len();
    let form_diversity = if n_forms > 0 {
        (n_forms - 1) as f64 / 5.0
    } else {
        0.0
    };

    let raw = 0.7 * stratification_quality + 0.3 * form_diversity;

    let heights: Vec<f64> = guild
        .iter()
        .filter_map(|p| p.record.height_m)
        .collect();
    let height_range = if heights.len() >= 2 {
        heights.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            - heights.iter().copied().fold(f64::INFINITY, f64::min)
    } else {
        0.0
    };

    let mut groups: Vec<StratumGroup> = form_groups
        .into_iter()
        .map(|(form, mut plants)| {
            plants.sort_by(|a, b| a.name.cmp(&b.name));
            let min = plants.iter().map(|p| p.height_m).fold(f64::INFINITY, f64::min);
            let max = plants
                .iter()
                .map(|p| p.height_m)
                .fold(f64::NEG_INFINITY, f64::max);
            StratumGroup {
                form: form.to_string(),
                plants,
                height_range: (min, max),
            }
        })
        .collect();
    groups.sort_by(|a, b| {
        a.height_range
            .0
            .partial_cmp(&b.height_range.0)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.form.cmp(&b.form))
    });

    M6Result {
        raw: RawScore::new(MetricId::M6, raw),
        height_range,
        n_forms,
        stratification_quality,
        form_diversity,
        groups,
    }
}
