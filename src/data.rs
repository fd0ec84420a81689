//! Reference-data snapshot and loaders.
//!
//! All reference tables (plant traits, per-plant interaction and fungal sets,
//! static biocontrol lookups) are loaded once per process and treated as an
//! immutable snapshot shared by reference. Organism names are case-normalized
//! here, at extraction time, so every set-intersection downstream operates on
//! canonical names — a mismatch that differs only by capitalization must still
//! match.

use crate::error::{Result, ScoreError};
use crate::types::{normalize_organism, ClimateTier, FungusCategory};
use polars::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Grime CSR growth-strategy triple. Scores sum to 100.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CsrProfile {
    pub c: f64,
    pub s: f64,
    pub r: f64,
}

/// Immutable trait record for one plant.
#[derive(Debug, Clone)]
pub struct PlantRecord {
    pub id: String,
    pub name: String,
    pub csr: Option<CsrProfile>,
    /// Light preference on the 1-9 Ellenberg-style scale; often missing.
    pub light_pref: Option<f64>,
    pub height_m: Option<f64>,
    /// Lowercased growth-form label ("tree", "herb", "vine", ...).
    pub growth_form: Option<String>,
    pub tiers: Vec<ClimateTier>,
}

impl PlantRecord {
    pub fn in_tier(&self, tier: ClimateTier) -> bool {
        self.tiers.contains(&tier)
    }

    /// True if the growth form is a climbing habit (vine/liana/climber).
    pub fn is_climbing_form(&self) -> bool {
        self.growth_form.as_deref().is_some_and(|f| {
            f.contains("vine") || f.contains("liana") || f.contains("climber")
        })
    }

    pub fn is_tree_form(&self) -> bool {
        self.growth_form.as_deref().is_some_and(|f| f.contains("tree"))
    }
}

/// Interaction role an organism plays with respect to a plant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrganismRole {
    Herbivore,
    /// Union of the four predator sub-roles, deduplicated at extraction.
    Predator,
    Pollinator,
    FlowerVisitor,
    Fungivore,
}

/// Per-plant organism sets, one per role. Emptiness is a valid, common state.
#[derive(Debug, Clone, Default)]
pub struct InteractionProfile {
    pub herbivores: FxHashSet<String>,
    pub predators: FxHashSet<String>,
    pub pollinators: FxHashSet<String>,
    pub flower_visitors: FxHashSet<String>,
    pub fungivores: FxHashSet<String>,
}

impl InteractionProfile {
    pub fn role(&self, role: OrganismRole) -> &FxHashSet<String> {
        match role {
            OrganismRole::Herbivore => &self.herbivores,
            OrganismRole::Predator => &self.predators,
            OrganismRole::Pollinator => &self.pollinators,
            OrganismRole::FlowerVisitor => &self.flower_visitors,
            OrganismRole::Fungivore => &self.fungivores,
        }
    }

    /// Insert names under a role, normalizing each.
    pub fn extend_role<I, S>(&mut self, role: OrganismRole, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = match role {
            OrganismRole::Herbivore => &mut self.herbivores,
            OrganismRole::Predator => &mut self.predators,
            OrganismRole::Pollinator => &mut self.pollinators,
            OrganismRole::FlowerVisitor => &mut self.flower_visitors,
            OrganismRole::Fungivore => &mut self.fungivores,
        };
        for name in names {
            let canon = normalize_organism(name.as_ref());
            if !canon.is_empty() {
                set.insert(canon);
            }
        }
    }
}

/// Per-plant fungal sets keyed by the tagged category union.
#[derive(Debug, Clone, Default)]
pub struct FungalProfile {
    pub pathogenic: FxHashSet<String>,
    pub mycoparasitic: FxHashSet<String>,
    pub entomopathogenic: FxHashSet<String>,
    pub amf: FxHashSet<String>,
    pub emf: FxHashSet<String>,
    pub endophytic: FxHashSet<String>,
    pub saprotrophic: FxHashSet<String>,
}

impl FungalProfile {
    pub fn category(&self, category: FungusCategory) -> &FxHashSet<String> {
        match category {
            FungusCategory::Pathogenic => &self.pathogenic,
            FungusCategory::Mycoparasitic => &self.mycoparasitic,
            FungusCategory::Entomopathogenic => &self.entomopathogenic,
            FungusCategory::Amf => &self.amf,
            FungusCategory::Emf => &self.emf,
            FungusCategory::Endophytic => &self.endophytic,
            FungusCategory::Saprotrophic => &self.saprotrophic,
        }
    }

    pub fn extend_category<I, S>(&mut self, category: FungusCategory, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set = match category {
            FungusCategory::Pathogenic => &mut self.pathogenic,
            FungusCategory::Mycoparasitic => &mut self.mycoparasitic,
            FungusCategory::Entomopathogenic => &mut self.entomopathogenic,
            FungusCategory::Amf => &mut self.amf,
            FungusCategory::Emf => &mut self.emf,
            FungusCategory::Endophytic => &mut self.endophytic,
            FungusCategory::Saprotrophic => &mut self.saprotrophic,
        };
        for name in names {
            let canon = normalize_organism(name.as_ref());
            if !canon.is_empty() {
                set.insert(canon);
            }
        }
    }

    pub fn has_beneficial(&self) -> bool {
        FungusCategory::BENEFICIAL
            .iter()
            .any(|c| !self.category(*c).is_empty())
    }
}

/// Static biocontrol lookup tables. Keys and values are case-normalized at
/// insertion so intersections with the interaction sets cannot silently miss.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    /// herbivore -> known predators
    pub herbivore_predators: FxHashMap<String, Vec<String>>,
    /// herbivore -> known entomopathogenic parasites
    pub insect_parasites: FxHashMap<String, Vec<String>>,
    /// pathogen -> known fungal antagonists
    pub pathogen_antagonists: FxHashMap<String, Vec<String>>,
    /// pathogen -> animal taxa known to consume it
    pub pathogen_fungivores: FxHashMap<String, Vec<String>>,
}

impl Lookups {
    pub fn add_predators_of<S: AsRef<str>>(&mut self, herbivore: &str, predators: &[S]) {
        insert_normalized(&mut self.herbivore_predators, herbivore, predators);
    }

    pub fn add_parasites_of<S: AsRef<str>>(&mut self, herbivore: &str, fungi: &[S]) {
        insert_normalized(&mut self.insect_parasites, herbivore, fungi);
    }

    pub fn add_antagonists_of<S: AsRef<str>>(&mut self, pathogen: &str, fungi: &[S]) {
        insert_normalized(&mut self.pathogen_antagonists, pathogen, fungi);
    }

    pub fn add_fungivores_of<S: AsRef<str>>(&mut self, pathogen: &str, animals: &[S]) {
        insert_normalized(&mut self.pathogen_fungivores, pathogen, animals);
    }
}

fn insert_normalized<S: AsRef<str>>(
    map: &mut FxHashMap<String, Vec<String>>,
    key: &str,
    values: &[S],
) {
    let values: Vec<String> = values
        .iter()
        .map(|v| normalize_organism(v.as_ref()))
        .filter(|v| !v.is_empty())
        .collect();
    if !values.is_empty() {
        map.entry(normalize_organism(key)).or_default().extend(values);
    }
}

/// One guild member's view over the reference snapshot.
#[derive(Debug, Clone, Copy)]
pub struct GuildPlant<'a> {
    pub record: &'a PlantRecord,
    pub organisms: &'a InteractionProfile,
    pub fungi: &'a FungalProfile,
}

/// Process-wide immutable reference snapshot.
#[derive(Debug, Default)]
pub struct ReferenceData {
    pub plants: FxHashMap<String, PlantRecord>,
    pub interactions: FxHashMap<String, InteractionProfile>,
    pub fungi: FxHashMap<String, FungalProfile>,
    pub lookups: Lookups,
}

impl ReferenceData {
    pub fn plant(&self, id: &str) -> Result<&PlantRecord> {
        self.plants.get(id).ok_or_else(|| ScoreError::MissingPlant {
            id: id.to_string(),
            table: "plants",
        })
    }

    /// Assemble the per-request guild view. Fails fast on any identity that is
    /// absent from a reference table; callers resolve identities first.
    pub fn guild_view(&self, ids: &[String]) -> Result<Vec<GuildPlant<'_>>> {
        ids.iter()
            .map(|id| {
                let record = self.plant(id)?;
                let organisms =
                    self.interactions
                        .get(id)
                        .ok_or_else(|| ScoreError::MissingPlant {
                            id: id.clone(),
                            table: "organism interactions",
                        })?;
                let fungi = self.fungi.get(id).ok_or_else(|| ScoreError::MissingPlant {
                    id: id.clone(),
                    table: "fungal associations",
                })?;
                Ok(GuildPlant {
                    record,
                    organisms,
                    fungi,
                })
            })
            .collect()
    }

    /// Plants eligible for a calibration stratum, in stable sorted order.
    pub fn tier_members(&self, tier: ClimateTier) -> Vec<String> {
        let mut members: Vec<String> = self
            .plants
            .values()
            .filter(|p| p.in_tier(tier))
            .map(|p| p.id.clone())
            .collect();
        members.sort_unstable();
        members
    }

    /// Register a plant and its (possibly empty) interaction/fungal profiles.
    /// Loaders and tests both go through here so every plant id present in the
    /// trait table has a row in all three maps.
    pub fn insert_plant(
        &mut self,
        record: PlantRecord,
        organisms: InteractionProfile,
        fungi: FungalProfile,
    ) {
        let id = record.id.clone();
        self.interactions.insert(id.clone(), organisms);
        self.fungi.insert(id.clone(), fungi);
        self.plants.insert(id, record);
    }

    /// Load the full snapshot from disk.
    pub fn load(paths: &DataPaths) -> Result<Self> {
        info!(plants = %paths.plants.display(), "loading reference snapshot");

        let mut data = ReferenceData::default();
        load_plants(&paths.plants, &mut data)?;
        load_interactions(&paths.organisms, &mut data)?;
        load_fungi(&paths.fungi, &mut data)?;

        data.lookups.herbivore_predators =
            load_lookup_table(&paths.herbivore_predators, "herbivore", "predators")?;
        data.lookups.insect_parasites =
            load_lookup_table(&paths.insect_parasites, "herbivore", "entomopathogenic_fungi")?;
        data.lookups.pathogen_antagonists =
            load_lookup_table(&paths.pathogen_antagonists, "pathogen", "antagonists")?;
        data.lookups.pathogen_fungivores =
            load_lookup_table(&paths.pathogen_fungivores, "pathogen", "fungivores")?;

        info!(
            plants = data.plants.len(),
            herbivore_predators = data.lookups.herbivore_predators.len(),
            insect_parasites = data.lookups.insect_parasites.len(),
            pathogen_antagonists = data.lookups.pathogen_antagonists.len(),
            pathogen_fungivores = data.lookups.pathogen_fungivores.len(),
            "reference snapshot loaded"
        );
        Ok(data)
    }
}

/// File layout for the reference snapshot. Deserializable from a JSON config;
/// defaults point at a local `data/` directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub plants: PathBuf,
    pub organisms: PathBuf,
    pub fungi: PathBuf,
    pub herbivore_predators: PathBuf,
    pub insect_parasites: PathBuf,
    pub pathogen_antagonists: PathBuf,
    pub pathogen_fungivores: PathBuf,
    pub phylogeny: PathBuf,
    pub calibration: PathBuf,
    pub csr_calibration: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        let root = PathBuf::from("data");
        Self {
            plants: root.join("plants.parquet"),
            organisms: root.join("organisms.csv"),
            fungi: root.join("fungi.csv"),
            herbivore_predators: root.join("herbivore_predators.csv"),
            insect_parasites: root.join("insect_parasites.csv"),
            pathogen_antagonists: root.join("pathogen_antagonists.csv"),
            pathogen_fungivores: root.join("pathogen_fungivores.csv"),
            phylogeny: root.join("phylogeny.nwk"),
            calibration: root.join("calibration.json"),
            csr_calibration: root.join("csr_calibration.json"),
        }
    }
}

impl DataPaths {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Load plant trait records from parquet.
fn load_plants(path: &Path, data: &mut ReferenceData) -> Result<()> {
    let df = LazyFrame::scan_parquet(path, Default::default())?
        .select(&[
            col("plant_id"),
            col("scientific_name"),
            col("csr_c"),
            col("csr_s"),
            col("csr_r"),
            col("light_pref"),
            col("height_m"),
            col("growth_form"),
            col("tier_1_tropical"),
            col("tier_2_mediterranean"),
            col("tier_3_humid_temperate"),
            col("tier_4_continental"),
            col("tier_5_boreal_polar"),
            col("tier_6_arid"),
        ])
        .collect()?;

    let ids = df.column("plant_id")?.str()?;
    let names = df.column("scientific_name")?.str()?;
    let csr_c = df.column("csr_c")?.f64()?;
    let csr_s = df.column("csr_s")?.f64()?;
    let csr_r = df.column("csr_r")?.f64()?;
    let light = df.column("light_pref")?.f64()?;
    let heights = df.column("height_m")?.f64()?;
    let forms = df.column("growth_form")?.str()?;

    for idx in 0..df.height() {
        let Some(id) = ids.get(idx) else { continue };

        let csr = match (csr_c.get(idx), csr_s.get(idx), csr_r.get(idx)) {
            (Some(c), Some(s), Some(r)) => Some(CsrProfile { c, s, r }),
            _ => None,
        };

        let mut tiers = Vec::new();
        for tier in ClimateTier::ALL {
            if tier_flag(&df, tier.as_str(), idx)? {
                tiers.push(tier);
            }
        }

        let record = PlantRecord {
            id: id.to_string(),
            name: names.get(idx).unwrap_or(id).to_string(),
            csr,
            light_pref: light.get(idx),
            height_m: heights.get(idx),
            growth_form: forms.get(idx).map(|f| f.trim().to_lowercase()),
            tiers,
        };
        data.insert_plant(record, InteractionProfile::default(), FungalProfile::default());
    }

    debug!(rows = df.height(), "plant trait table loaded");
    Ok(())
}

/// Tier membership columns arrive as boolean or 0/1 integers depending on the
/// extraction pipeline; accept both.
fn tier_flag(df: &DataFrame, column: &str, idx: usize) -> Result<bool> {
    let col = df.column(column)?;
    if let Ok(bools) = col.bool() {
        return Ok(bools.get(idx).unwrap_or(false));
    }
    if let Ok(ints) = col.i32() {
        return Ok(ints.get(idx).unwrap_or(0) == 1);
    }
    if let Ok(ints) = col.i64() {
        return Ok(ints.get(idx).unwrap_or(0) == 1);
    }
    Ok(false)
}

/// Per-plant organism lists: CSV with pipe-separated name columns.
fn load_interactions(path: &Path, data: &mut ReferenceData) -> Result<()> {
    let df = read_csv(path)?;
    let ids = df.column("plant_id")?.str()?;

    let role_columns: [(&str, OrganismRole); 8] = [
        ("herbivores", OrganismRole::Herbivore),
        ("predators_consumes", OrganismRole::Predator),
        ("predators_has_host", OrganismRole::Predator),
        ("predators_interacts_with", OrganismRole::Predator),
        ("predators_adjacent_to", OrganismRole::Predator),
        ("pollinators", OrganismRole::Pollinator),
        ("flower_visitors", OrganismRole::FlowerVisitor),
        ("fungivores", OrganismRole::Fungivore),
    ];

    for idx in 0..df.height() {
        let Some(id) = ids.get(idx) else { continue };
        let Some(profile) = data.interactions.get_mut(id) else {
            warn!(plant = id, "interaction row for unknown plant id, skipping");
            continue;
        };
        for (column, role) in &role_columns {
            if let Ok(series) = df.column(column) {
                if let Ok(values) = series.str() {
                    if let Some(list) = values.get(idx) {
                        profile.extend_role(*role, split_list(list));
                    }
                }
            }
        }
    }

    debug!(rows = df.height(), "organism interaction table loaded");
    Ok(())
}

/// Per-plant fungal lists, one column per tagged category.
fn load_fungi(path: &Path, data: &mut ReferenceData) -> Result<()> {
    let df = read_csv(path)?;
    let ids = df.column("plant_id")?.str()?;

    let category_columns: [(&str, FungusCategory); 7] = [
        ("pathogenic_fungi", FungusCategory::Pathogenic),
        ("mycoparasite_fungi", FungusCategory::Mycoparasitic),
        ("entomopathogenic_fungi", FungusCategory::Entomopathogenic),
        ("amf_fungi", FungusCategory::Amf),
        ("emf_fungi", FungusCategory::Emf),
        ("endophytic_fungi", FungusCategory::Endophytic),
        ("saprotrophic_fungi", FungusCategory::Saprotrophic),
    ];

    for idx in 0..df.height() {
        let Some(id) = ids.get(idx) else { continue };
        let Some(profile) = data.fungi.get_mut(id) else {
            warn!(plant = id, "fungal row for unknown plant id, skipping");
            continue;
        };
        for (column, category) in &category_columns {
            if let Ok(series) = df.column(column) {
                if let Ok(values) = series.str() {
                    if let Some(list) = values.get(idx) {
                        profile.extend_category(*category, split_list(list));
                    }
                }
            }
        }
    }

    debug!(rows = df.height(), "fungal association table loaded");
    Ok(())
}

/// Load one static lookup table: key column plus a pipe-separated value
/// column. Both sides are normalized on the way in.
fn load_lookup_table(
    path: &Path,
    key_col: &str,
    value_col: &str,
) -> Result<FxHashMap<String, Vec<String>>> {
    let df = read_csv(path)?;
    let keys = df.column(key_col)?.str()?;
    let values = df.column(value_col)?.str()?;

    let mut map: FxHashMap<String, Vec<String>> = FxHashMap::default();
    for idx in 0..df.height() {
        if let (Some(key), Some(value)) = (keys.get(idx), values.get(idx)) {
            let entries: Vec<String> = split_list(value).map(normalize_organism).collect();
            if !entries.is_empty() {
                map.entry(normalize_organism(key)).or_default().extend(entries);
            }
        }
    }
    Ok(map)
}

fn read_csv(path: &Path) -> Result<DataFrame> {
    Ok(CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?)
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split('|').filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, tier: ClimateTier) -> PlantRecord {
        PlantRecord {
            id: id.to_string(),
            name: id.to_string(),
            csr: None,
            light_pref: None,
            height_m: None,
            growth_form: None,
            tiers: vec![tier],
        }
    }

    #[test]
    fn guild_view_fails_fast_on_unknown_plant() {
        let mut data = ReferenceData::default();
        data.insert_plant(
            record("p1", ClimateTier::Arid),
            InteractionProfile::default(),
            FungalProfile::default(),
        );

        let err = data
            .guild_view(&["p1".to_string(), "ghost".to_string()])
            .unwrap_err();
        assert!(matches!(err, ScoreError::MissingPlant { .. }));
    }

    #[test]
    fn profiles_normalize_on_insert() {
        let mut profile = InteractionProfile::default();
        profile.extend_role(OrganismRole::Predator, ["  Coccinella  Septempunctata"]);
        assert!(profile.predators.contains("coccinella septempunctata"));

        let mut fungal = FungalProfile::default();
        fungal.extend_category(FungusCategory::Entomopathogenic, ["Beauveria BASSIANA"]);
        assert!(fungal.entomopathogenic.contains("beauveria bassiana"));
    }

    #[test]
    fn lookup_insert_normalizes_both_sides() {
        let mut lookups = Lookups::default();
        lookups.add_predators_of("Aphis Fabae", &["Coccinella septempunctata"]);
        let predators = lookups.herbivore_predators.get("aphis fabae").unwrap();
        assert_eq!(predators, &vec!["coccinella septempunctata".to_string()]);
    }

    #[test]
    fn tier_members_sorted() {
        let mut data = ReferenceData::default();
        for id in ["b", "a", "c"] {
            data.insert_plant(
                record(id, ClimateTier::Tropical),
                InteractionProfile::default(),
                FungalProfile::default(),
            );
        }
        assert_eq!(data.tier_members(ClimateTier::Tropical), ["a", "b", "c"]);
        assert!(data.tier_members(ClimateTier::Arid).is_empty());
    }
}
