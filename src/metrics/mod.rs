//! The seven compatibility metric calculators.
//!
//! Each calculator is a pure function `(guild view, supporting data) -> result`
//! producing a raw value plus the intermediate detail (matched pairs, agent
//! counts, per-plant coverage) the explanation layer reads. Percentile
//! conversion happens afterward in the scorer, never here, so every raw value
//! stays directly comparable to its calibration distribution.

pub mod m1_pest_independence;
pub mod m2_growth_conflict;
pub mod m3_insect_biocontrol;
pub mod m4_disease_control;
pub mod m5_beneficial_fungi;
pub mod m6_stratification;
pub mod m7_pollinator_support;
pub mod shared;

pub use m1_pest_independence::{calculate_m1, M1Result};
pub use m2_growth_conflict::{calculate_m2, M2Result, PlantStrategy};
pub use m3_insect_biocontrol::{calculate_m3, M3Result};
pub use m4_disease_control::{calculate_m4, M4Result};
pub use m5_beneficial_fungi::{calculate_m5, M5Result};
pub use m6_stratification::{calculate_m6, LayerPlant, M6Result, StratumGroup};
pub use m7_pollinator_support::{calculate_m7, M7Result};
pub use shared::count_shared_organisms;
