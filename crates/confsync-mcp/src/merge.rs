//! Merge, reorder and removal over adapter-neutral entry lists.
//!
//! All three finish with [`restamp`], so indices are `0..n-1` and managed
//! identifiers follow the final order.

use std::collections::HashSet;

use uuid::Uuid;

use crate::adapter::ConfigAdapter;
use crate::error::{Result, SyncError};
use crate::model::{CanonicalModel, ConfigEntry};

/// Merge the current selection into an existing entry list.
///
/// Unmanaged entries keep their relative order and content and come first,
/// followed by the managed entries that are still selected (first one per
/// model), followed by newly synthesized entries in catalog order.
pub fn merge(
    adapter: &dyn ConfigAdapter,
    existing: Vec<ConfigEntry>,
    catalog: &[CanonicalModel],
    selected: &HashSet<String>,
    mut synthesize: impl FnMut(&CanonicalModel) -> ConfigEntry,
) -> Vec<ConfigEntry> {
    let mut unmanaged_kept = Vec::new();
    let mut managed_kept = Vec::new();
    let mut represented: HashSet<String> = HashSet::new();

    for entry in existing {
        if !entry.managed {
            unmanaged_kept.push(entry);
            continue;
        }
        match entry.source_model_id.as_deref() {
            Some(id) if selected.contains(id) => {
                if represented.insert(id.to_string()) {
                    managed_kept.push(entry);
                } else {
                    tracing::debug!("dropping duplicate managed entry for '{}'", id);
                }
            }
            other => {
                tracing::debug!("dropping deselected managed entry ({:?})", other);
            }
        }
    }

    let mut added = Vec::new();
    for model in catalog {
        if selected.contains(&model.id) && represented.insert(model.id.clone()) {
            added.push(synthesize(model));
        }
    }
    for id in selected {
        if !represented.contains(id) {
            tracing::warn!("selected model '{}' is not in the catalog; skipping", id);
        }
    }

    tracing::debug!(
        target_kind = %adapter.kind(),
        unmanaged = unmanaged_kept.len(),
        kept = managed_kept.len(),
        added = added.len(),
        "merged entries"
    );

    let mut merged = unmanaged_kept;
    merged.extend(managed_kept);
    merged.extend(added);
    restamp(adapter, &mut merged);
    merged
}

/// Move the entry at `from` to `to`, shifting the entries in between.
pub fn reorder(
    adapter: &dyn ConfigAdapter,
    mut entries: Vec<ConfigEntry>,
    from: usize,
    to: usize,
) -> Result<Vec<ConfigEntry>> {
    let len = entries.len();
    if from >= len || to >= len {
        return Err(SyncError::OutOfRange { from, to, len });
    }
    if from != to {
        let entry = entries.remove(from);
        entries.insert(to, entry);
        restamp(adapter, &mut entries);
    }
    Ok(entries)
}

/// Drop one entry by its session uid.
pub fn remove(
    adapter: &dyn ConfigAdapter,
    mut entries: Vec<ConfigEntry>,
    uid: Uuid,
) -> Result<Vec<ConfigEntry>> {
    let pos = entries
        .iter()
        .position(|e| e.uid == uid)
        .ok_or(SyncError::UnknownEntry(uid))?;
    entries.remove(pos);
    restamp(adapter, &mut entries);
    Ok(entries)
}

/// Reassign indices and regenerate managed identifiers for the current order.
///
/// A managed key that collides with a user-owned key (or an earlier managed
/// one) gets a numeric suffix; user-owned keys are never renamed.
pub fn restamp(adapter: &dyn ConfigAdapter, entries: &mut [ConfigEntry]) {
    let mut taken: HashSet<String> = entries
        .iter()
        .filter(|e| !e.managed)
        .filter_map(|e| e.key.clone())
        .collect();
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.index = i;
        if !entry.managed {
            continue;
        }
        adapter.stamp(entry, i);
        if let Some(key) = entry.key.as_mut()
            && !taken.insert(key.clone())
        {
            let mut n = 2;
            while taken.contains(&format!("{key}-{n}")) {
                n += 1;
            }
            let unique = format!("{key}-{n}");
            tracing::warn!("managed key '{}' is already in use; writing '{}'", key, unique);
            taken.insert(unique.clone());
            *key = unique;
        }
    }
}
