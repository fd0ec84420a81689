//! Core vocabulary shared across the scoring pipeline.
//!
//! Raw metric values are only meaningful relative to their own calibration
//! distribution, so they travel as a typed `(MetricId, value)` pair and can
//! only be normalized through the matching calibration entry. Fungal roles are
//! a tagged union assigned at data-extraction time, never re-derived from
//! column names downstream.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier for one of the seven compatibility metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricId {
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M7,
}

impl MetricId {
    pub const ALL: [MetricId; 7] = [
        MetricId::M1,
        MetricId::M2,
        MetricId::M3,
        MetricId::M4,
        MetricId::M5,
        MetricId::M6,
        MetricId::M7,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::M1 => "m1",
            MetricId::M2 => "m2",
            MetricId::M3 => "m3",
            MetricId::M4 => "m4",
            MetricId::M5 => "m5",
            MetricId::M6 => "m6",
            MetricId::M7 => "m7",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MetricId::M1 => "Pest & Pathogen Independence",
            MetricId::M2 => "Growth-Strategy Conflict",
            MetricId::M3 => "Biocontrol Network",
            MetricId::M4 => "Disease Control",
            MetricId::M5 => "Beneficial Fungi Network",
            MetricId::M6 => "Structural Stratification",
            MetricId::M7 => "Pollinator Support",
        }
    }

    /// M1 and M2 are risk-framed: a high percentile is bad. The guild scorer
    /// inverts them exactly once when building display scores.
    pub fn is_risk_framed(&self) -> bool {
        matches!(self, MetricId::M1 | MetricId::M2)
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw metric value bound to the metric that produced it.
///
/// Normalization requires the calibration breakpoints for the same metric;
/// carrying the id alongside the value makes cross-metric lookup a type error
/// rather than a silent mix-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawScore {
    pub metric: MetricId,
    pub value: f64,
}

impl RawScore {
    pub fn new(metric: MetricId, value: f64) -> Self {
        Self { metric, value }
    }
}

/// Coarse climate stratum used to select a comparable calibration population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ClimateTier {
    #[serde(rename = "tier_1_tropical")]
    Tropical,
    #[serde(rename = "tier_2_mediterranean")]
    Mediterranean,
    #[serde(rename = "tier_3_humid_temperate")]
    HumidTemperate,
    #[serde(rename = "tier_4_continental")]
    Continental,
    #[serde(rename = "tier_5_boreal_polar")]
    BorealPolar,
    #[serde(rename = "tier_6_arid")]
    Arid,
}

impl ClimateTier {
    pub const ALL: [ClimateTier; 6] = [
        ClimateTier::Tropical,
        ClimateTier::Mediterranean,
        ClimateTier::HumidTemperate,
        ClimateTier::Continental,
        ClimateTier::BorealPolar,
        ClimateTier::Arid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClimateTier::Tropical => "tier_1_tropical",
            ClimateTier::Mediterranean => "tier_2_mediterranean",
            ClimateTier::HumidTemperate => "tier_3_humid_temperate",
            ClimateTier::Continental => "tier_4_continental",
            ClimateTier::BorealPolar => "tier_5_boreal_polar",
            ClimateTier::Arid => "tier_6_arid",
        }
    }
}

impl fmt::Display for ClimateTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClimateTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClimateTier::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown climate tier '{s}'"))
    }
}

/// Fungal role, tagged when the reference tables are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FungusCategory {
    Pathogenic,
    Mycoparasitic,
    Entomopathogenic,
    Amf,
    Emf,
    Endophytic,
    Saprotrophic,
}

impl FungusCategory {
    /// Categories counted as beneficial by M5 (mycorrhizae plus endophytes and
    /// saprotrophs; pathogens and biocontrol fungi are scored elsewhere).
    pub const BENEFICIAL: [FungusCategory; 4] = [
        FungusCategory::Amf,
        FungusCategory::Emf,
        FungusCategory::Endophytic,
        FungusCategory::Saprotrophic,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FungusCategory::Pathogenic => "Pathogenic",
            FungusCategory::Mycoparasitic => "Mycoparasitic",
            FungusCategory::Entomopathogenic => "Entomopathogenic",
            FungusCategory::Amf => "Arbuscular mycorrhizal",
            FungusCategory::Emf => "Ectomycorrhizal",
            FungusCategory::Endophytic => "Endophytic",
            FungusCategory::Saprotrophic => "Saprotrophic",
        }
    }
}

/// Canonicalize an organism name for set membership tests.
///
/// The static lookup tables and the per-plant interaction tables come from
/// different upstream sources with inconsistent capitalization and spacing; a
/// match that differs only by case must still fire. Applied once at
/// data-extraction time so every later intersection compares canonical names.
pub fn normalize_organism(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_case_and_whitespace() {
        assert_eq!(
            normalize_organism("  Coccinella   Septempunctata "),
            "coccinella septempunctata"
        );
        assert_eq!(normalize_organism("Beauveria bassiana"), "beauveria bassiana");
    }

    #[test]
    fn tier_round_trip() {
        for tier in ClimateTier::ALL {
            assert_eq!(tier.as_str().parse::<ClimateTier>().unwrap(), tier);
        }
        assert!("tier_7_lunar".parse::<ClimateTier>().is_err());
    }

    #[test]
    fn risk_framing() {
        assert!(MetricId::M1.is_risk_framed());
        assert!(MetricId::M2.is_risk_framed());
        assert!(!MetricId::M7.is_risk_framed());
    }
}
