use indexmap::{map::Entry, IndexMap};
use tracing::debug;

use crate::normalize::SkillEntry;

/// Collapse entries sharing a case-insensitive name down to the highest-valued one,
/// then rank them. Groups keep the position of their first appearance, so ties in the
/// final ranking fall back to encounter order.
pub fn aggregate(entries: &[SkillEntry]) -> Vec<SkillEntry> {
    let mut groups: IndexMap<String, &SkillEntry> = IndexMap::new();

    for entry in entries {
        let key = entry.name.to_lowercase();
        match groups.entry(key) {
            Entry::Occupied(mut best) => {
                if entry.value > best.get().value {
                    best.insert(entry);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }
    }

    let mut ranked: Vec<SkillEntry> = groups.into_values().cloned().collect();
    // stable, so equal values keep encounter order
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value));

    debug!("aggregated {} entries into {} skills", entries.len(), ranked.len());
    ranked
}
