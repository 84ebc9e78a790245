//! Synchronous operation surface over both targets.
//!
//! Every operation re-reads the target file; no state is carried between
//! calls. Callers that may run concurrently go through
//! [`crate::service::SyncService`], which serializes work per target.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::adapter::ParseWarning;
use crate::backup::BackupState;
use crate::catalog::ModelCatalog;
use crate::error::{Result, SyncError};
use crate::merge;
use crate::model::{ConfigEntry, EntryInput, TargetKind};
use crate::persist::read_optional;
use crate::probe::{find_executable, probe_version};
use crate::session::{SyncSession, classify_inputs};
use crate::target::Target;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetStatus {
    pub target: TargetKind,
    pub installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub is_synced: bool,
    pub has_backup: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_base_url: Option<String>,
    pub files: Vec<String>,
    pub synced_count: usize,
    pub config_path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ParseWarning>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub entries: Vec<ConfigEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ParseWarning>,
}

/// What `execute_sync` should write.
#[derive(Debug, Clone)]
pub enum SyncRequest {
    /// Merge the on-disk entries with this model selection.
    Selected(Vec<String>),
    /// Write a client-edited entry list as given.
    Entries(Vec<EntryInput>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub target: TargetKind,
    pub managed_count: usize,
    pub backup_created: bool,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<ParseWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreMode {
    Backup,
    Default,
}

pub struct SyncEngine {
    droid: Target,
    opencode: Target,
    catalog: Arc<dyn ModelCatalog>,
}

impl SyncEngine {
    pub fn new(droid: Target, opencode: Target, catalog: Arc<dyn ModelCatalog>) -> Self {
        Self {
            droid,
            opencode,
            catalog,
        }
    }

    pub fn target(&self, kind: TargetKind) -> &Target {
        match kind {
            TargetKind::Droid => &self.droid,
            TargetKind::OpenCode => &self.opencode,
        }
    }

    pub fn catalog(&self) -> &dyn ModelCatalog {
        self.catalog.as_ref()
    }

    pub fn get_status(&self, kind: TargetKind) -> Result<TargetStatus> {
        let target = self.target(kind);
        let adapter = target.adapter();
        let executable = find_executable(target.executable_name(), target.search_dirs());
        let version = executable.as_deref().and_then(probe_version);
        let path = target.primary_file();
        let parsed = adapter.parse(read_optional(&path)?.as_deref());
        let synced_count = parsed.managed_count();
        let current_base_url = parsed
            .entries
            .iter()
            .filter(|e| e.managed)
            .find_map(|e| adapter.base_url(e));
        let status = TargetStatus {
            target: kind,
            installed: target.is_installed() || executable.is_some(),
            version,
            is_synced: synced_count > 0,
            has_backup: target.backup().state() == BackupState::BackedUp,
            current_base_url,
            files: target.files(),
            synced_count,
            config_path: path,
            warning: parsed.warning,
        };
        tracing::debug!(
            target_kind = %kind,
            installed = status.installed,
            synced = status.synced_count,
            "status"
        );
        Ok(status)
    }

    /// Merged entry list for `selected_ids` without writing anything.
    pub fn preview_merge(&self, kind: TargetKind, selected_ids: &[String]) -> Result<Preview> {
        let mut session = SyncSession::open(self.target(kind), self.catalog())?;
        session.select(selected_ids.iter().cloned());
        let warning = session.warning().cloned();
        Ok(Preview {
            entries: session.into_entries(),
            warning,
        })
    }

    pub fn execute_sync(&self, kind: TargetKind, request: SyncRequest) -> Result<SyncReport> {
        let target = self.target(kind);
        if !target.is_installed() {
            return Err(SyncError::NotInstalled(kind));
        }
        let mut session = SyncSession::open(target, self.catalog())?;
        match request {
            SyncRequest::Selected(ids) => {
                if ids.is_empty() {
                    return Err(SyncError::NoSelection);
                }
                session.select(ids);
            }
            SyncRequest::Entries(inputs) => session.replace_entries(inputs)?,
        }
        let warning = session.warning().cloned();
        let report = session.commit()?;
        Ok(SyncReport {
            target: kind,
            managed_count: report.managed_count,
            backup_created: report.backup_created,
            path: target.primary_file(),
            warning,
        })
    }

    pub fn execute_restore(&self, kind: TargetKind, mode: RestoreMode) -> Result<()> {
        let target = self.target(kind);
        if !target.is_installed() {
            return Err(SyncError::NotInstalled(kind));
        }
        let backup = target.backup();
        match mode {
            RestoreMode::Backup => backup.restore_from_backup(),
            RestoreMode::Default => backup.restore_to_default(&target.adapter().default_content()),
        }
    }

    /// Raw text of one file of the target's family; the default skeleton
    /// when the file does not exist.
    pub fn get_config_content(&self, kind: TargetKind, file_name: Option<&str>) -> Result<String> {
        let target = self.target(kind);
        let path = target.resolve_file(file_name)?;
        Ok(read_optional(&path)?.unwrap_or_else(|| target.adapter().default_content()))
    }

    /// Move one entry of a client-held list.
    pub fn reorder_entries(
        &self,
        kind: TargetKind,
        entries: Vec<EntryInput>,
        from: usize,
        to: usize,
    ) -> Result<Vec<ConfigEntry>> {
        let adapter = self.target(kind).adapter();
        let mut entries = classify_inputs(adapter, entries)?;
        merge::restamp(adapter, &mut entries);
        merge::reorder(adapter, entries, from, to)
    }

    /// Drop one entry of a client-held list by its session uid.
    pub fn remove_entry(
        &self,
        kind: TargetKind,
        entries: Vec<EntryInput>,
        uid: Uuid,
    ) -> Result<Vec<ConfigEntry>> {
        let adapter = self.target(kind).adapter();
        let entries = classify_inputs(adapter, entries)?;
        merge::remove(adapter, entries, uid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FileCatalog;
    use crate::model::CanonicalModel;
    use serde_json::{Value as JsonValue, json};

    struct Fixture {
        _home: tempfile::TempDir,
        engine: SyncEngine,
    }

    fn fixture(install: &[TargetKind]) -> Fixture {
        let home = tempfile::tempdir().unwrap();
        let droid = Target::new(TargetKind::Droid, home.path().join(".factory"));
        let opencode = Target::new(TargetKind::OpenCode, home.path().join("opencode"));
        for kind in install {
            let dir = match kind {
                TargetKind::Droid => droid.config_dir(),
                TargetKind::OpenCode => opencode.config_dir(),
            };
            std::fs::create_dir_all(dir).unwrap();
        }
        let mk = |id: &str, name: &str| CanonicalModel {
            id: id.into(),
            name: name.into(),
            group: String::new(),
        };
        let catalog = FileCatalog {
            proxy_url: "http://127.0.0.1:8045/v1".into(),
            api_key: "sk-test".into(),
            models: vec![
                mk("claude-opus-4-5-thinking", "Claude Opus 4.5 Thinking"),
                mk("gemini-3-pro-high", "Gemini 3 Pro High"),
                mk("gpt-x", "GPT X"),
            ],
        };
        Fixture {
            _home: home,
            engine: SyncEngine::new(droid, opencode, Arc::new(catalog)),
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn read_json(engine: &SyncEngine, kind: TargetKind) -> JsonValue {
        let raw = std::fs::read_to_string(engine.target(kind).primary_file()).unwrap();
        serde_json::from_str(&raw).unwrap()
    }

    #[test]
    fn sync_keeps_custom_entry_first() {
        let f = fixture(&[TargetKind::Droid]);
        let path = f.engine.target(TargetKind::Droid).primary_file();
        std::fs::write(&path, r#"{"customModels":[{"model":"mine","displayName":"my-custom"}]}"#)
            .unwrap();
        let report = f
            .engine
            .execute_sync(TargetKind::Droid, SyncRequest::Selected(ids(&["gpt-x"])))
            .unwrap();
        assert_eq!(report.managed_count, 1);
        assert!(report.backup_created);
        let doc = read_json(&f.engine, TargetKind::Droid);
        assert_eq!(
            doc["customModels"][0],
            json!({"model":"mine","displayName":"my-custom"})
        );
        assert_eq!(doc["customModels"][1]["model"], "gpt-x");
        assert_eq!(doc["customModels"][1]["index"], 1);
    }

    #[test]
    fn resync_drops_deselected_model() {
        let f = fixture(&[TargetKind::OpenCode]);
        let kind = TargetKind::OpenCode;
        f.engine
            .execute_sync(kind, SyncRequest::Selected(ids(&["gpt-x", "gemini-3-pro-high"])))
            .unwrap();
        let second = f
            .engine
            .execute_sync(kind, SyncRequest::Selected(ids(&["gpt-x"])))
            .unwrap();
        assert!(!second.backup_created);
        let status = f.engine.get_status(kind).unwrap();
        assert_eq!(status.synced_count, 1);
        assert!(status.is_synced);
        assert!(status.has_backup);
        assert_eq!(
            status.current_base_url.as_deref(),
            Some("http://127.0.0.1:8045/v1")
        );
        let doc = read_json(&f.engine, kind);
        assert_eq!(doc["$schema"], "https://opencode.ai/config.json");
        let providers = doc["provider"].as_object().unwrap();
        assert_eq!(providers.len(), 1);
        assert!(providers.values().all(|p| p["models"].get("gpt-x").is_some()));
    }

    #[test]
    fn sync_is_idempotent_on_disk() {
        let f = fixture(&[TargetKind::Droid]);
        let sel = || SyncRequest::Selected(ids(&["claude-opus-4-5-thinking", "gpt-x"]));
        f.engine.execute_sync(TargetKind::Droid, sel()).unwrap();
        let first = f.engine.get_config_content(TargetKind::Droid, None).unwrap();
        f.engine.execute_sync(TargetKind::Droid, sel()).unwrap();
        let second = f.engine.get_config_content(TargetKind::Droid, None).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn preview_has_no_side_effects() {
        let f = fixture(&[TargetKind::Droid]);
        let preview = f
            .engine
            .preview_merge(TargetKind::Droid, &ids(&["gemini-3-pro-high"]))
            .unwrap();
        assert_eq!(preview.entries.len(), 1);
        assert!(preview.entries[0].managed);
        let target = f.engine.target(TargetKind::Droid);
        assert!(!target.primary_file().exists());
        assert!(!target.backup().backup_path().exists());
    }

    #[test]
    fn not_installed_is_reported_without_writing() {
        let f = fixture(&[]);
        let err = f
            .engine
            .execute_sync(TargetKind::Droid, SyncRequest::Selected(ids(&["gpt-x"])))
            .unwrap_err();
        assert!(matches!(err, SyncError::NotInstalled(TargetKind::Droid)));
        assert!(matches!(
            f.engine.execute_restore(TargetKind::OpenCode, RestoreMode::Default),
            Err(SyncError::NotInstalled(TargetKind::OpenCode))
        ));
    }

    #[test]
    fn empty_selection_is_rejected() {
        let f = fixture(&[TargetKind::Droid]);
        let err = f
            .engine
            .execute_sync(TargetKind::Droid, SyncRequest::Selected(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, SyncError::NoSelection));
        assert!(!f.engine.target(TargetKind::Droid).primary_file().exists());
    }

    #[test]
    fn restore_without_backup_fails_but_default_succeeds() {
        let f = fixture(&[TargetKind::OpenCode]);
        assert!(matches!(
            f.engine.execute_restore(TargetKind::OpenCode, RestoreMode::Backup),
            Err(SyncError::NoBackup(TargetKind::OpenCode))
        ));
        f.engine
            .execute_restore(TargetKind::OpenCode, RestoreMode::Default)
            .unwrap();
        assert_eq!(
            read_json(&f.engine, TargetKind::OpenCode),
            json!({"$schema": "https://opencode.ai/config.json"})
        );
    }

    #[test]
    fn restore_from_backup_brings_back_original() {
        let f = fixture(&[TargetKind::Droid]);
        let path = f.engine.target(TargetKind::Droid).primary_file();
        std::fs::write(&path, "{\"theme\":\"light\"}").unwrap();
        f.engine
            .execute_sync(TargetKind::Droid, SyncRequest::Selected(ids(&["gpt-x"])))
            .unwrap();
        f.engine
            .execute_restore(TargetKind::Droid, RestoreMode::Backup)
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"theme\":\"light\"}");
    }

    #[test]
    fn config_content_defaults_and_rejects_foreign_names() {
        let f = fixture(&[TargetKind::OpenCode]);
        let content = f.engine.get_config_content(TargetKind::OpenCode, None).unwrap();
        assert!(content.contains("$schema"));
        assert!(matches!(
            f.engine.get_config_content(TargetKind::OpenCode, Some("settings.json")),
            Err(SyncError::UnknownFile { .. })
        ));
    }

    #[test]
    fn explicit_entries_are_written_in_client_order() {
        let f = fixture(&[TargetKind::Droid]);
        let kind = TargetKind::Droid;
        let preview = f.engine.preview_merge(kind, &ids(&["gpt-x"])).unwrap();
        let mut inputs: Vec<EntryInput> = preview.entries.iter().map(EntryInput::from).collect();
        inputs.push(EntryInput {
            uid: None,
            key: None,
            fields: json!({"model": "local", "displayName": "Local"}),
        });
        let reordered = f.engine.reorder_entries(kind, inputs, 1, 0).unwrap();
        assert!(!reordered[0].managed);
        let inputs = reordered.iter().map(EntryInput::from).collect();
        let report = f
            .engine
            .execute_sync(kind, SyncRequest::Entries(inputs))
            .unwrap();
        assert_eq!(report.managed_count, 1);
        let doc = read_json(&f.engine, kind);
        assert_eq!(doc["customModels"][0]["model"], "local");
        assert_eq!(doc["customModels"][1]["id"], "custom:AG-GPT-X-1");
    }

    #[test]
    fn remove_entry_by_uid() {
        let f = fixture(&[]);
        let kind = TargetKind::OpenCode;
        let preview = f
            .engine
            .preview_merge(kind, &ids(&["gpt-x", "gemini-3-pro-high"]))
            .unwrap();
        let uid = preview.entries[0].uid;
        let inputs = preview.entries.iter().map(EntryInput::from).collect();
        let left = f.engine.remove_entry(kind, inputs, uid).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].index, 0);
        assert_eq!(left[0].key.as_deref(), Some("AG-GPT-X-0"));
        assert!(matches!(
            f.engine.remove_entry(kind, Vec::new(), uid),
            Err(SyncError::UnknownEntry(_))
        ));
    }
}
