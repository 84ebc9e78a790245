//! In-memory editing session for one target.
//!
//! A session materializes the target's entries once, applies any number of
//! edits, then either writes the result or is dropped. Nothing touches the
//! filesystem before [`SyncSession::commit`].

use std::collections::HashSet;

use uuid::Uuid;

use crate::adapter::{ConfigAdapter, ParseWarning, Preamble};
use crate::catalog::ModelCatalog;
use crate::error::{Result, SyncError};
use crate::merge;
use crate::model::{CanonicalModel, ConfigEntry, EntryInput};
use crate::persist::{read_optional, write_atomic};
use crate::synth::synthesize;
use crate::target::Target;

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReport {
    pub managed_count: usize,
    pub backup_created: bool,
}

pub struct SyncSession {
    target: Target,
    catalog: Vec<CanonicalModel>,
    base_url: String,
    api_key: String,
    raw: Option<String>,
    preamble: Preamble,
    warning: Option<ParseWarning>,
    entries: Vec<ConfigEntry>,
    selected: HashSet<String>,
}

/// Build the per-target synthesizer handed to [`merge::merge`].
pub fn synthesizer<'a>(
    adapter: &'a dyn ConfigAdapter,
    base_url: &'a str,
    api_key: &'a str,
) -> impl Fn(&CanonicalModel) -> ConfigEntry + 'a {
    move |model| adapter.render(&synthesize(model, base_url, api_key, adapter.url_policy()))
}

/// Re-classify client-supplied entries, keeping their session uids.
pub fn classify_inputs(
    adapter: &dyn ConfigAdapter,
    inputs: Vec<EntryInput>,
) -> Result<Vec<ConfigEntry>> {
    inputs
        .into_iter()
        .map(|input| {
            let uid = input.uid;
            let mut entry = adapter.classify_input(input)?;
            if let Some(uid) = uid {
                entry.uid = uid;
            }
            Ok(entry)
        })
        .collect()
}

impl SyncSession {
    /// Read and parse the target's primary file.
    pub fn open(target: &Target, catalog: &dyn ModelCatalog) -> Result<Self> {
        let adapter = target.adapter();
        let raw = read_optional(&target.primary_file())?;
        let parsed = adapter.parse(raw.as_deref());
        if let Some(w) = &parsed.warning {
            tracing::warn!(target_kind = %target.kind(), "{}: {}", target.primary_file().display(), w.message);
        }
        let selected = parsed
            .entries
            .iter()
            .filter(|e| e.managed)
            .filter_map(|e| e.source_model_id.clone())
            .collect();
        Ok(Self {
            target: target.clone(),
            catalog: catalog.list_models(),
            base_url: catalog.base_url(target.kind()),
            api_key: catalog.api_key(),
            raw,
            preamble: parsed.preamble,
            warning: parsed.warning,
            entries: parsed.entries,
            selected,
        })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ConfigEntry> {
        self.entries
    }

    pub fn warning(&self) -> Option<&ParseWarning> {
        self.warning.as_ref()
    }

    pub fn selected(&self) -> &HashSet<String> {
        &self.selected
    }

    pub fn managed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.managed).count()
    }

    /// Replace the selection and re-merge.
    pub fn select<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected = ids.into_iter().map(Into::into).collect();
        self.remerge();
    }

    /// Flip one model in or out of the selection. Returns whether it is now
    /// selected.
    pub fn toggle(&mut self, model_id: &str) -> bool {
        let now_selected = if self.selected.remove(model_id) {
            false
        } else {
            self.selected.insert(model_id.to_string());
            true
        };
        self.remerge();
        now_selected
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.entries = merge::reorder(self.target.adapter(), self.entries.clone(), from, to)?;
        Ok(())
    }

    /// Remove one entry; removing a managed entry also deselects its model.
    pub fn remove(&mut self, uid: Uuid) -> Result<()> {
        let removed_source = self
            .entries
            .iter()
            .find(|e| e.uid == uid)
            .and_then(|e| e.source_model_id.clone());
        self.entries = merge::remove(self.target.adapter(), self.entries.clone(), uid)?;
        if let Some(id) = removed_source
            && !self.entries.iter().any(|e| e.source_model_id.as_deref() == Some(id.as_str()))
        {
            self.selected.remove(&id);
        }
        Ok(())
    }

    /// Adopt a client-edited entry list verbatim, keeping its order.
    ///
    /// Classification is recomputed, later duplicates of a managed model are
    /// dropped, then indices and identifiers are re-derived.
    pub fn replace_entries(&mut self, inputs: Vec<EntryInput>) -> Result<()> {
        let adapter = self.target.adapter();
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(inputs.len());
        for entry in classify_inputs(adapter, inputs)? {
            if let Some(id) = entry.source_model_id.as_deref()
                && entry.managed
                && !seen.insert(id.to_string())
            {
                tracing::debug!("dropping duplicate managed entry for '{}'", id);
                continue;
            }
            entries.push(entry);
        }
        merge::restamp(adapter, &mut entries);
        self.selected = seen;
        self.entries = entries;
        Ok(())
    }

    /// The file content a commit would write.
    pub fn render(&self) -> String {
        self.target.adapter().serialize(&self.preamble, &self.entries)
    }

    /// Write the session's entries to the target.
    ///
    /// Fails with `NotInstalled` or `NoSelection` before touching any file.
    /// Takes the one-time backup first, and keeps unparseable original
    /// content aside before it is replaced.
    pub fn commit(self) -> Result<CommitReport> {
        let kind = self.target.kind();
        if !self.target.is_installed() {
            return Err(SyncError::NotInstalled(kind));
        }
        let managed_count = self.managed_count();
        if managed_count == 0 {
            return Err(SyncError::NoSelection);
        }
        let adapter = self.target.adapter();
        let backup = self.target.backup();
        let backup_created = backup.ensure(&adapter.default_content())?;
        if self.warning.is_some()
            && let Some(raw) = &self.raw
        {
            backup.preserve_unparsed(raw)?;
        }
        let path = self.target.primary_file();
        write_atomic(&path, &self.render())?;
        tracing::info!(
            target_kind = %kind,
            managed = managed_count,
            total = self.entries.len(),
            "synced {}",
            path.display()
        );
        Ok(CommitReport {
            managed_count,
            backup_created,
        })
    }

    /// Drop the session without writing.
    pub fn discard(self) {
        tracing::debug!(target_kind = %self.target.kind(), "discarded session");
    }

    fn remerge(&mut self) {
        let adapter = self.target.adapter();
        let synth = synthesizer(adapter, &self.base_url, &self.api_key);
        self.entries = merge::merge(
            adapter,
            std::mem::take(&mut self.entries),
            &self.catalog,
            &self.selected,
            synth,
        );
    }
}
