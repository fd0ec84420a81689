//! Score one guild from the command line.
//!
//! Usage:
//!
//!   score --tier tier_3_humid_temperate [--config config.json] [--json] ID...

use anyhow::{bail, Context, Result};
use guild_compat::calibration::{CalibrationTable, CsrCalibration};
use guild_compat::data::{DataPaths, ReferenceData};
use guild_compat::explain::explain_guild;
use guild_compat::phylo::PhyloTree;
use guild_compat::scorer::GuildScorer;
use guild_compat::types::ClimateTier;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

struct Args {
    config: Option<String>,
    tier: ClimateTier,
    plant_ids: Vec<String>,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut config = None;
    let mut tier = None;
    let mut plant_ids = Vec::new();
    let mut json = false;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--tier" => {
                let value = iter.next().context("--tier requires a value")?;
                tier = Some(value.parse::<ClimateTier>().map_err(anyhow::Error::msg)?);
            }
            "--config" => {
                config = Some(iter.next().context("--config requires a value")?);
            }
            "--json" => json = true,
            other if other.starts_with("--") => bail!("unknown argument: {other}"),
            id => plant_ids.push(id.to_string()),
        }
    }

    let Some(tier) = tier else {
        bail!("--tier is required (e.g. --tier tier_3_humid_temperate)");
    };
    if plant_ids.is_empty() {
        bail!("at least one plant id is required");
    }
    Ok(Args {
        config,
        tier,
        plant_ids,
        json,
    })
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

    let data = Arc::new(ReferenceData::load(&paths).context("failed to load reference data")?);
    let tree =
        Arc::new(PhyloTree::from_file(&paths.phylogeny).context("failed to load phylogeny")?);
    let calibration = Arc::new(
        CalibrationTable::load(&paths.calibration).with_context(|| {
            format!(
                "failed to load calibration table {} (run `calibrate` first)",
                paths.calibration.display()
            )
        })?,
    );
    // CSR calibration is optional; M2 falls back to fixed thresholds
    let csr_calibration = CsrCalibration::load(&paths.csr_calibration).ok().map(Arc::new);

    let scorer = GuildScorer::new(data, tree, calibration, csr_calibration);
    let score = scorer.score_guild(&args.plant_ids, args.tier)?;
    let explanation = explain_guild(&score);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&explanation)?);
        return Ok(());
    }

    println!("================================================================");
    println!("GUILD SCORE — {} ({} plants)", score.tier, score.plant_ids.len());
    println!("================================================================");
    for id in &score.plant_ids {
        println!("  {id}");
    }
    println!();
    for metric in &score.metrics {
        println!(
            "  {:>3}  {:<32} raw {:>10.4}  score {:>6.1}",
            metric.metric.as_str(),
            metric.metric.label(),
            metric.raw,
            metric.display
        );
    }
    println!();
    println!("  Overall: {:.1} / 100", score.overall);

    if !explanation.hubs.is_empty() {
        println!();
        println!("  Top ecological hubs:");
        for hub in explanation.hubs.iter().take(5) {
            println!("    {:<40} {} partner links", hub.name, hub.connections);
        }
    }
    println!("================================================================");
    Ok(())
}
