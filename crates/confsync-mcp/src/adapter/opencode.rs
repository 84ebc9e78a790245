//! Adapter for OpenCode `opencode.json` (`provider` object).
//!
//! Every synced model becomes its own provider entry whose `name` starts with
//! the managed marker and whose key is the derived identifier.

use std::collections::HashSet;

use serde_json::{Map as JsonMap, Value as JsonValue, json};

use super::droid::json_type;
use super::{ConfigAdapter, Preamble, invalid_entry};
use crate::error::Result;
use crate::model::{ConfigEntry, EntryInput, TargetKind, has_managed_marker, managed_identifier};
use crate::synth::{ModelFamily, SynthesizedModel, UrlPolicy};

const SCHEMA_URL: &str = "https://opencode.ai/config.json";
const NPM_ANTHROPIC: &str = "@ai-sdk/anthropic";
const NPM_OPENAI_COMPATIBLE: &str = "@ai-sdk/openai-compatible";

pub struct OpenCodeAdapter;

impl ConfigAdapter for OpenCodeAdapter {
    fn kind(&self) -> TargetKind {
        TargetKind::OpenCode
    }

    fn file_names(&self) -> &'static [&'static str] {
        &["opencode.json", "config.json"]
    }

    fn entries_key(&self) -> &'static str {
        "provider"
    }

    fn default_preamble(&self) -> Preamble {
        let mut doc = JsonMap::new();
        doc.insert("$schema".into(), JsonValue::String(SCHEMA_URL.into()));
        Preamble::from_doc(doc)
    }

    fn url_policy(&self) -> UrlPolicy {
        UrlPolicy {
            suffix_reasoning: true,
            suffix_generic: true,
        }
    }

    fn entries_from_value(&self, section: JsonValue) -> std::result::Result<Vec<ConfigEntry>, String> {
        match section {
            JsonValue::Object(providers) => Ok(providers
                .into_iter()
                .map(|(k, v)| self.classify(Some(k), v))
                .collect()),
            other => Err(format!(
                "'provider' is not an object (found {})",
                json_type(&other)
            )),
        }
    }

    fn entries_to_value(&self, entries: &[ConfigEntry]) -> JsonValue {
        let user_keys: HashSet<&str> = entries
            .iter()
            .filter(|e| !e.managed)
            .filter_map(|e| e.key.as_deref())
            .collect();
        let mut out = JsonMap::new();
        for e in entries {
            let Some(key) = e.key.as_ref() else {
                tracing::warn!("dropping opencode provider entry without a key (uid={})", e.uid);
                continue;
            };
            if e.managed && user_keys.contains(key.as_str()) {
                tracing::warn!("managed provider '{}' collides with a user provider; skipping it", key);
                continue;
            }
            if out.contains_key(key) {
                tracing::warn!("duplicate opencode provider key '{}'; keeping the first", key);
                continue;
            }
            out.insert(key.clone(), e.fields.clone());
        }
        JsonValue::Object(out)
    }

    fn classify(&self, key: Option<String>, fields: JsonValue) -> ConfigEntry {
        let managed = fields
            .get("name")
            .and_then(|v| v.as_str())
            .is_some_and(has_managed_marker);
        let source_model_id = if managed {
            fields
                .get("models")
                .and_then(|v| v.as_object())
                .and_then(|m| m.keys().next().cloned())
        } else {
            None
        };
        let mut entry = ConfigEntry::new(key, fields);
        entry.managed = managed;
        entry.source_model_id = source_model_id;
        entry
    }

    fn render(&self, model: &SynthesizedModel) -> ConfigEntry {
        let npm = match model.family {
            ModelFamily::Reasoning => NPM_ANTHROPIC,
            ModelFamily::Generic => NPM_OPENAI_COMPATIBLE,
        };
        let input = if model.no_image_support {
            json!(["text"])
        } else {
            json!(["text", "image"])
        };
        let mut model_def = json!({ "name": model.display_name });
        if let Some(obj) = model_def.as_object_mut() {
            let mut options = JsonMap::new();
            if let Some(max) = model.max_output_tokens {
                options.insert("maxOutputTokens".into(), json!(max));
            }
            if let Some(budget) = model.thinking_budget {
                options.insert(
                    "thinking".into(),
                    json!({ "type": "enabled", "budgetTokens": budget }),
                );
            }
            if !options.is_empty() {
                obj.insert("options".into(), JsonValue::Object(options));
            }
            obj.insert("modalities".into(), json!({ "input": input, "output": ["text"] }));
        }
        let mut models = JsonMap::new();
        models.insert(model.model_id.clone(), model_def);
        let fields = json!({
            "name": model.display_name,
            "npm": npm,
            "options": { "baseURL": model.base_url, "apiKey": model.api_key },
            "models": JsonValue::Object(models),
        });
        ConfigEntry {
            managed: true,
            source_model_id: Some(model.model_id.clone()),
            ..ConfigEntry::new(Some(model.display_name.clone()), fields)
        }
    }

    fn stamp(&self, entry: &mut ConfigEntry, index: usize) {
        if !entry.managed {
            return;
        }
        let display = entry
            .fields
            .get("name")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| entry.source_model_id.clone())
            .unwrap_or_default();
        entry.key = Some(managed_identifier(&display, index));
    }

    fn base_url(&self, entry: &ConfigEntry) -> Option<String> {
        entry
            .fields
            .get("options")
            .and_then(|o| o.get("baseURL"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    fn classify_input(&self, input: EntryInput) -> Result<ConfigEntry> {
        let key = input
            .key
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| invalid_entry(self.kind(), "provider entry is missing its key"))?;
        if !input.fields.is_object() {
            return Err(invalid_entry(
                self.kind(),
                format!("provider '{key}' is not an object"),
            ));
        }
        Ok(self.classify(Some(key), input.fields))
    }
}
