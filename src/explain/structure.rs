//! Structural stratification evidence (M6).

use crate::metrics::StratumGroup;
use crate::scorer::GuildScore;
use crate::types::MetricId;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StructureProfile {
    pub score: f64,
    pub height_range: f64,
    pub n_forms: usize,
    pub stratification_quality: f64,
    pub form_diversity: f64,
    /// Growth-form layers, lowest first.
    pub layers: Vec<StratumGroup>,
}

pub fn structure_profile(score: &GuildScore) -> StructureProfile {
    let m6 = &score.details.m6;
    StructureProfile {
        score: score.metric(MetricId::M6).display,
        height_range: m6.height_range,
        n_forms: m6.n_forms,
        stratification_quality: m6.stratification_quality,
        form_diversity: m6.form_diversity,
        layers: m6.groups.clone(),
    }
}
