//! Error taxonomy for the scoring core.
//!
//! The load-bearing distinction is between data errors (a plant the caller
//! should have resolved before scoring) and deployment errors (a calibration
//! table that does not cover the requested stratum). They are separate
//! variants so the serving layer can report them differently.

use crate::types::{ClimateTier, MetricId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScoreError>;

#[derive(Debug, Error)]
pub enum ScoreError {
    /// A supplied plant identity is absent from a reference table. Callers
    /// must resolve identities before invoking the core; we fail fast rather
    /// than silently skipping the plant.
    #[error("plant '{id}' not present in the {table} table")]
    MissingPlant { id: String, table: &'static str },

    /// A plant exists but lacks a trait a metric cannot do without.
    #[error("plant '{id}' is missing required trait '{field}'")]
    MissingTrait { id: String, field: &'static str },

    #[error("guild size {got} outside supported range {min}..={max}")]
    GuildSize { got: usize, min: usize, max: usize },

    #[error("plant '{0}' appears more than once in the guild")]
    DuplicatePlant(String),

    #[error("plant '{id}' is not a member of climate tier {tier}")]
    TierMismatch { id: String, tier: ClimateTier },

    /// Calibration coverage gap: a configuration/deployment problem, not a
    /// data problem. Never silently substitute another stratum's table.
    #[error("no calibration breakpoints for tier {tier}, guild size {guild_size}, metric {metric}")]
    CalibrationGap {
        tier: ClimateTier,
        guild_size: usize,
        metric: MetricId,
    },

    #[error("tier {tier} has {available} eligible plants, need at least {needed} for calibration")]
    InsufficientPopulation {
        tier: ClimateTier,
        needed: usize,
        available: usize,
    },

    #[error("failed to parse Newick tree: {0}")]
    Newick(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("reference table error: {0}")]
    Frame(#[from] polars::error::PolarsError),
}
