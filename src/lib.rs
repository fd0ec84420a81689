//! Ecological compatibility scoring for plant guilds.
//!
//! Seven independent metrics are computed from species interaction data
//! (herbivores, predators, pollinators, pathogenic and beneficial fungi) and
//! trait data (CSR strategy, light preference, height, growth form), then
//! expressed as percentiles against Monte-Carlo calibration distributions of
//! randomly assembled guilds of the same size in the same climate tier.
//!
//! Pipeline:
//! 1. [`data::ReferenceData`] — immutable snapshot of the reference tables.
//! 2. [`metrics`] — the seven pure calculators (raw values + detail).
//! 3. [`calibration`] — offline stratified breakpoint construction and the
//!    interpolating percentile lookup.
//! 4. [`scorer::GuildScorer`] — validation, parallel metric execution,
//!    normalization, aggregation.
//! 5. [`explain`] — ranked, deterministic evidence derived from the score.

pub mod calibration;
pub mod data;
pub mod error;
pub mod explain;
pub mod metrics;
pub mod phylo;
pub mod scorer;
pub mod types;

pub use calibration::{run_calibration, CalibrationTable, CsrCalibration, StratumCalibration};
pub use data::{DataPaths, ReferenceData};
pub use error::{Result, ScoreError};
pub use explain::{explain_guild, Explanation};
pub use phylo::PhyloTree;
pub use scorer::{compute_raw_scores, GuildScore, GuildScorer, MetricResult};
pub use types::{ClimateTier, FungusCategory, MetricId, RawScore};
