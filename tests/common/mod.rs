//! Shared fixtures for the integration suites: in-memory reference snapshots,
//! small phylogenies, and hand-built calibration tables.

#![allow(dead_code)]

use guild_compat::calibration::{Breakpoints, CalibrationTable, StratumCalibration};
use guild_compat::data::{CsrProfile, FungalProfile, InteractionProfile, PlantRecord};
use guild_compat::phylo::PhyloTree;
use guild_compat::types::{ClimateTier, MetricId};

pub fn record(id: &str, tier: ClimateTier) -> PlantRecord {
    PlantRecord {
        id: id.to_string(),
        name: id.to_string(),
        csr: Some(CsrProfile {
            c: 40.0,
            s: 35.0,
            r: 25.0,
        }),
        light_pref: Some(5.0),
        height_m: Some(1.0),
        growth_form: Some("herb".to_string()),
        tiers: vec![tier],
    }
}

pub fn record_with(
    id: &str,
    tier: ClimateTier,
    csr: (f64, f64, f64),
    height_m: f64,
    light_pref: f64,
    growth_form: &str,
) -> PlantRecord {
    PlantRecord {
        id: id.to_string(),
        name: id.to_string(),
        csr: Some(CsrProfile {
            c: csr.0,
            s: csr.1,
            r: csr.2,
        }),
        light_pref: Some(light_pref),
        height_m: Some(height_m),
        growth_form: Some(growth_form.to_string()),
        tiers: vec![tier],
    }
}

pub fn empty_profiles() -> (InteractionProfile, FungalProfile) {
    (InteractionProfile::default(), FungalProfile::default())
}

/// A star phylogeny over the given tips, with branch lengths 1, 2, 3, ...
/// so distinct subsets produce distinct Faith's PD values.
pub fn star_tree(ids: &[String]) -> PhyloTree {
    let mut newick = String::from("(");
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            newick.push(',');
        }
        newick.push_str(&format!("{id}:{}", i + 1));
    }
    newick.push_str(");");
    PhyloTree::from_newick(&newick).expect("valid star newick")
}

/// Breakpoints spread linearly between `lo` and `hi` across the 13 levels.
pub fn spread_breakpoints(lo: f64, hi: f64) -> Breakpoints {
    let span = hi - lo;
    let at = |p: f64| lo + p / 100.0 * span;
    Breakpoints {
        p1: at(1.0),
        p5: at(5.0),
        p10: at(10.0),
        p20: at(20.0),
        p30: at(30.0),
        p40: at(40.0),
        p50: at(50.0),
        p60: at(60.0),
        p70: at(70.0),
        p80: at(80.0),
        p90: at(90.0),
        p95: at(95.0),
        p99: at(99.0),
    }
}

/// Calibration table with the same breakpoints for every metric in every
/// requested (tier, size) stratum.
pub fn uniform_table(tier: ClimateTier, sizes: &[usize], breakpoints: &Breakpoints) -> CalibrationTable {
    let mut table = CalibrationTable::default();
    for size in sizes {
        let mut stratum = StratumCalibration::new();
        for metric in MetricId::ALL {
            stratum.insert(metric, breakpoints.clone());
        }
        table.insert(tier, *size, stratum);
    }
    table
}

pub fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
