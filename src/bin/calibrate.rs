//! Offline calibration driver.
//!
//! Builds the stratified calibration table: for each climate tier and each
//! target guild size, samples random guilds from the tier's eligible
//! population, computes the seven raw metrics, and extracts percentile
//! breakpoints. Also derives the global CSR calibration from the full plant
//! population. Usage:
//!
//!   calibrate [config.json] [--samples N] [--sizes 2,7] [--seed S]

use anyhow::{bail, Context, Result};
use guild_compat::calibration::{run_calibration, CalibrationTable, CsrCalibration};
use guild_compat::data::{DataPaths, ReferenceData};
use guild_compat::phylo::PhyloTree;
use guild_compat::types::ClimateTier;
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<String>,
    samples: usize,
    sizes: Vec<usize>,
    seed: u64,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        samples: 20_000,
        sizes: vec![2, 7],
        seed: 42,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--samples" => {
                let value = iter.next().context("--samples requires a value")?;
                args.samples = value.parse().context("invalid --samples value")?;
            }
            "--sizes" => {
                let value = iter.next().context("--sizes requires a value")?;
                args.sizes = value
                    .split(',')
                    .map(|s| s.trim().parse().context("invalid --sizes value"))
                    .collect::<Result<_>>()?;
            }
            "--seed" => {
                let value = iter.next().context("--seed requires a value")?;
                args.seed = value.parse().context("invalid --seed value")?;
            }
            other if !other.starts_with("--") && args.config.is_none() => {
                args.config = Some(other.to_string());
            }
            other => bail!("unknown argument: {other}"),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = parse_args()?;
    let paths = match &args.config {
        Some(path) => DataPaths::from_file(Path::new(path))
            .with_context(|| format!("failed to load config {path}"))?,
        None => DataPaths::default(),
    };

    println!("================================================================");
    println!("GUILD CALIBRATION (climate-tier stratified)");
    println!("================================================================");
    println!("Samples per stratum: {}", args.samples);
    println!("Guild sizes:         {:?}", args.sizes);
    println!("Seed:                {}", args.seed);
    println!();

    let start = Instant::now();
    let data = ReferenceData::load(&paths).context("failed to load reference data")?;
    let tree = PhyloTree::from_file(&paths.phylogeny).context("failed to load phylogeny")?;
    println!(
        "Loaded {} plants, {} phylogeny tips ({:.1}s)",
        data.plants.len(),
        tree.tip_count(),
        start.elapsed().as_secs_f64()
    );

    // Stage 1: global CSR percentiles over the whole plant population
    println!();
    println!("--- Stage 1: CSR calibration (global) ---");
    let csr = CsrCalibration::from_reference(&data)
        .context("no plants with CSR triples in the reference data")?;
    csr.save(&paths.csr_calibration)
        .with_context(|| format!("failed to write {}", paths.csr_calibration.display()))?;
    println!("Wrote {}", paths.csr_calibration.display());

    // Stage 2: per-stratum guild metric breakpoints
    println!();
    println!("--- Stage 2: guild metric calibration ---");
    let mut table = CalibrationTable::default();
    let mut total_guilds = 0usize;
    for (tier_idx, tier) in ClimateTier::ALL.iter().enumerate() {
        for &size in &args.sizes {
            let stratum_start = Instant::now();
            // Per-stratum seed keeps strata independent but reproducible
            let seed = args
                .seed
                .wrapping_add(tier_idx as u64 * 100)
                .wrapping_add(size as u64);
            let stratum = run_calibration(&data, &tree, Some(&csr), *tier, size, args.samples, seed)
                .with_context(|| format!("calibration failed for {tier} size {size}"))?;
            table.insert(*tier, size, stratum);
            total_guilds += args.samples;
            println!(
                "  {tier} size {size}: {} guilds in {:.1}s",
                args.samples,
                stratum_start.elapsed().as_secs_f64()
            );
        }
    }

    table
        .save(&paths.calibration)
        .with_context(|| format!("failed to write {}", paths.calibration.display()))?;

    println!();
    println!("================================================================");
    println!(
        "Calibrated {} strata ({} guilds) in {:.1}s",
        ClimateTier::ALL.len() * args.sizes.len(),
        total_guilds,
        start.elapsed().as_secs_f64()
    );
    println!("Wrote {}", paths.calibration.display());
    println!("================================================================");
    Ok(())
}
