//! Shared organism counting.
//!
//! Counts, for each organism, how many guild members host it. Used by M5 and
//! M7 for network analysis; a plant hosting the same organism under several
//! roles still counts once.

use crate::data::GuildPlant;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

/// Count organisms across one or more per-plant sets selected by `sets_for`.
///
/// Returns organism -> number of guild members hosting it. Per-plant
/// deduplication happens before counting, so aggregating overlapping sets
/// cannot inflate a plant's contribution.
pub fn count_shared_organisms<'a, F, I>(
    guild: &'a [GuildPlant<'a>],
    sets_for: F,
) -> FxHashMap<String, usize>
where
    F: Fn(&GuildPlant<'a>) -> I,
    I: IntoIterator<Item = &'a FxHashSet<String>>,
{
    let mut counts: FxHashMap<String, usize> = FxHashMap::default();

    for plant in guild {
        // Most plants associate with fewer than 16 organisms per role
        let mut plant_organisms: SmallVec<[&str; 16]> = SmallVec::new();
        for set in sets_for(plant) {
            plant_organisms.extend(set.iter().map(String::as_str));
        }
        plant_organisms.sort_unstable();
        plant_organisms.dedup();

        for org in plant_organisms {
            *counts.entry(org.to_string()).or_insert(0) += 1;
        }
    }

    counts
}
