//! Config adapters for the supported target formats.
//!
//! Each adapter splits a target's JSON document into a preamble (everything
//! this engine does not own) and an ordered list of entries, classifies the
//! entries, and puts the document back together. The merge engine only sees
//! [`ConfigEntry`] lists and calls back into the adapter for anything
//! schema-specific.

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::error::{Result, SyncError};
use crate::model::{ConfigEntry, EntryInput, TargetKind};
use crate::synth::{SynthesizedModel, UrlPolicy};

pub mod droid;
pub mod opencode;

pub use droid::DroidAdapter;
pub use opencode::OpenCodeAdapter;

/// Top-level document minus the entries section.
///
/// `slot` is the position the entries key occupies among the top-level keys,
/// so serialization puts it back where the user had it.
#[derive(Debug, Clone, PartialEq)]
pub struct Preamble {
    pub doc: JsonMap<String, JsonValue>,
    pub slot: usize,
}

impl Preamble {
    /// Preamble whose entries key goes after all existing keys.
    pub fn from_doc(doc: JsonMap<String, JsonValue>) -> Self {
        let slot = doc.len();
        Self { doc, slot }
    }

    fn split(doc: JsonMap<String, JsonValue>, entries_key: &str) -> (Self, Option<JsonValue>) {
        let mut rest = JsonMap::new();
        let mut section = None;
        let mut slot = None;
        for (k, v) in doc {
            if k == entries_key {
                slot = Some(rest.len());
                section = Some(v);
            } else {
                rest.insert(k, v);
            }
        }
        let slot = slot.unwrap_or(rest.len());
        (Self { doc: rest, slot }, section)
    }

    fn join(&self, entries_key: &str, section: JsonValue) -> JsonValue {
        let mut out = JsonMap::new();
        let mut section = Some(section);
        for (i, (k, v)) in self.doc.iter().enumerate() {
            if i == self.slot
                && let Some(s) = section.take()
            {
                out.insert(entries_key.to_string(), s);
            }
            out.insert(k.clone(), v.clone());
        }
        if let Some(s) = section {
            out.insert(entries_key.to_string(), s);
        }
        JsonValue::Object(out)
    }
}

/// Non-fatal problem found while parsing a target file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedConfig {
    pub preamble: Preamble,
    pub entries: Vec<ConfigEntry>,
    pub warning: Option<ParseWarning>,
}

impl ParsedConfig {
    fn degraded(preamble: Preamble, message: String) -> Self {
        Self {
            preamble,
            entries: Vec::new(),
            warning: Some(ParseWarning { message }),
        }
    }

    pub fn managed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.managed).count()
    }
}

/// Format-specific half of the sync engine.
pub trait ConfigAdapter: Send + Sync {
    fn kind(&self) -> TargetKind;

    /// Config file names, primary first.
    fn file_names(&self) -> &'static [&'static str];

    /// Top-level key holding the entries.
    fn entries_key(&self) -> &'static str;

    fn default_preamble(&self) -> Preamble;

    fn url_policy(&self) -> UrlPolicy;

    /// Split an entries section into classified entries.
    fn entries_from_value(&self, section: JsonValue) -> std::result::Result<Vec<ConfigEntry>, String>;

    /// Inverse of [`ConfigAdapter::entries_from_value`]; session uids are dropped here.
    fn entries_to_value(&self, entries: &[ConfigEntry]) -> JsonValue;

    /// Classify one persisted stanza.
    fn classify(&self, key: Option<String>, fields: JsonValue) -> ConfigEntry;

    /// Native stanza for a synthesized model; identifier is set by [`ConfigAdapter::stamp`].
    fn render(&self, model: &SynthesizedModel) -> ConfigEntry;

    /// Regenerate the persisted identifier of a managed entry for `index`.
    fn stamp(&self, entry: &mut ConfigEntry, index: usize);

    fn base_url(&self, entry: &ConfigEntry) -> Option<String>;

    /// Skeleton written by restore-to-default.
    fn default_content(&self) -> String {
        render_json(&JsonValue::Object(self.default_preamble().doc))
    }

    /// Parse raw file content. Never fails: absent content yields the default
    /// preamble; malformed content additionally carries a warning.
    fn parse(&self, raw: Option<&str>) -> ParsedConfig {
        let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
            return ParsedConfig {
                preamble: self.default_preamble(),
                entries: Vec::new(),
                warning: None,
            };
        };
        let doc = match serde_json::from_str::<JsonValue>(raw) {
            Ok(JsonValue::Object(doc)) => doc,
            Ok(_) => {
                return ParsedConfig::degraded(
                    self.default_preamble(),
                    "top-level value is not an object".to_string(),
                );
            }
            Err(e) => {
                return ParsedConfig::degraded(self.default_preamble(), format!("invalid JSON: {e}"));
            }
        };
        let (preamble, section) = Preamble::split(doc, self.entries_key());
        let mut entries = match section {
            None => Vec::new(),
            Some(section) => match self.entries_from_value(section) {
                Ok(entries) => entries,
                Err(msg) => return ParsedConfig::degraded(preamble, msg),
            },
        };
        for (i, e) in entries.iter_mut().enumerate() {
            e.index = i;
        }
        tracing::debug!(
            target_kind = %self.kind(),
            entries = entries.len(),
            managed = entries.iter().filter(|e| e.managed).count(),
            "parsed config"
        );
        ParsedConfig {
            preamble,
            entries,
            warning: None,
        }
    }

    fn serialize(&self, preamble: &Preamble, entries: &[ConfigEntry]) -> String {
        render_json(&preamble.join(self.entries_key(), self.entries_to_value(entries)))
    }

    /// Rebuild an entry handed back by a client, recomputing its classification.
    fn classify_input(&self, input: EntryInput) -> Result<ConfigEntry> {
        Ok(self.classify(input.key, input.fields))
    }
}

/// Adapter for a target kind.
pub fn adapter_for(kind: TargetKind) -> &'static dyn ConfigAdapter {
    match kind {
        TargetKind::Droid => &DroidAdapter,
        TargetKind::OpenCode => &OpenCodeAdapter,
    }
}

pub(crate) fn invalid_entry(kind: TargetKind, message: impl Into<String>) -> SyncError {
    SyncError::Parse {
        target: kind,
        message: message.into(),
    }
}

fn render_json(value: &JsonValue) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(mut s) => {
            s.push('\n');
            s
        }
        Err(e) => {
            tracing::error!("failed to render config JSON: {}", e);
            "{}\n".to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: JsonValue) -> JsonMap<String, JsonValue> {
        match v {
            JsonValue::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn split_and_join_keep_key_position() {
        let doc = obj(json!({"a": 1, "customModels": [1, 2], "z": true}));
        let (pre, section) = Preamble::split(doc, "customModels");
        assert_eq!(pre.slot, 1);
        assert_eq!(section, Some(json!([1, 2])));
        let joined = pre.join("customModels", json!([]));
        let keys: Vec<&String> = joined.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "customModels", "z"]);
    }

    #[test]
    fn missing_section_goes_last() {
        let (pre, section) = Preamble::split(obj(json!({"a": 1, "b": 2})), "provider");
        assert!(section.is_none());
        let joined = pre.join("provider", json!({}));
        let keys: Vec<&String> = joined.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "b", "provider"]);
    }

    #[test]
    fn parse_is_total() {
        for kind in TargetKind::ALL {
            let adapter = adapter_for(kind);
            let absent = adapter.parse(None);
            assert!(absent.entries.is_empty());
            assert!(absent.warning.is_none());
            assert_eq!(absent.preamble, adapter.default_preamble());

            let broken = adapter.parse(Some("{ not json"));
            assert!(broken.entries.is_empty());
            assert!(broken.warning.is_some());

            let scalar = adapter.parse(Some("[1, 2]"));
            assert!(scalar.warning.is_some());
        }
    }

    #[test]
    fn default_content_reparses_to_default_preamble() {
        for kind in TargetKind::ALL {
            let adapter = adapter_for(kind);
            let parsed = adapter.parse(Some(&adapter.default_content()));
            assert_eq!(parsed.preamble, adapter.default_preamble());
            assert!(parsed.entries.is_empty());
            assert!(parsed.warning.is_none());
        }
    }
}
