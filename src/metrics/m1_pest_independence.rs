//! M1: Pest & Pathogen Independence
//!
//! Uses Faith's PD as a proxy for shared pest/pathogen risk. Most pests are
//! genus- or family-specific, so evolutionary spread dilutes transmission;
//! higher diversity means lower risk.

use crate::error::Result;
use crate::phylo::PhyloTree;
use crate::types::{MetricId, RawScore};

/// Decay constant for the PD-to-risk transform.
///
/// exp(-k * pd): pd = 0 (same species) -> 1.0 maximum risk; pd = 500 MY -> 0.61;
/// pd = 1000 MY -> 0.37.
pub const DECAY_K: f64 = 0.001;

#[derive(Debug, Clone, Copy)]
pub struct M1Result {
    pub raw: RawScore,
    pub faiths_pd: f64,
}

/// Calculate M1 from the guild's phylogenetic diversity.
///
/// A single-plant guild has no peer comparison: raw = 1.0 (maximal risk proxy)
/// and the scorer pre-assigns normalized = 0.0 instead of consulting the
/// calibration table.
pub fn calculate_m1(plant_ids: &[String], tree: &PhyloTree) -> Result<M1Result> {
    if plant_ids.len() < 2 {
        return Ok(M1Result {
            raw: RawScore::new(MetricId::M1, 1.0),
            faiths_pd: 0.0,
        });
    }

    let faiths_pd = tree.faiths_pd(plant_ids)?;
    let pest_risk = libm::exp(-DECAY_K * faiths_pd);

    Ok(M1Result {
        raw: RawScore::new(MetricId::M1, pest_risk),
        faiths_pd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exponential_transform() {
        assert_relative_eq!(libm::exp(-DECAY_K * 0.0), 1.0, epsilon = 1e-4);
        assert_relative_eq!(libm::exp(-DECAY_K * 500.0), 0.6065, epsilon = 1e-4);
        assert_relative_eq!(libm::exp(-DECAY_K * 1000.0), 0.3679, epsilon = 1e-4);
    }

    #[test]
    fn single_plant_guild_is_maximum_risk() {
        let tree = PhyloTree::from_newick("(a:1,b:1);").unwrap();
        let result = calculate_m1(&["a".to_string()], &tree).unwrap();
        assert_eq!(result.raw.metric, MetricId::M1);
        assert_eq!(result.raw.value, 1.0);
        assert_eq!(result.faiths_pd, 0.0);
    }

    #[test]
    fn diverse_guild_decays_risk() {
        let tree = PhyloTree::from_newick("((a:100,b:200):50,c:300);").unwrap();
        let ids: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let result = calculate_m1(&ids, &tree).unwrap();
        // PD = 100 + 200 + 50 + 300 = 650
        assert_relative_eq!(result.faiths_pd, 650.0);
        assert_relative_eq!(result.raw.value, libm::exp(-0.65), epsilon = 1e-12);
    }

    #[test]
    fn unknown_identity_fails() {
        let tree = PhyloTree::from_newick("(a:1,b:1);").unwrap();
        let ids: Vec<String> = ["a", "ghost"].iter().map(|s| s.to_string()).collect();
        assert!(calculate_m1(&ids, &tree).is_err());
    }
}
