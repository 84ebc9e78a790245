//! Adapter for Droid `settings.json` (`customModels` array).
//!
//! Managed entries carry an `id` of the form `custom:AG-<name>-<index>`.

use serde_json::{Map as JsonMap, Value as JsonValue, json};

use super::{ConfigAdapter, Preamble};
use crate::model::{ConfigEntry, MANAGED_MARKER, TargetKind, managed_identifier};
use crate::synth::{SynthesizedModel, UrlPolicy};

/// Namespace Droid expects in front of custom model ids.
const ID_NAMESPACE: &str = "custom:";

pub struct DroidAdapter;

fn is_managed_id(id: &str) -> bool {
    id.strip_prefix(ID_NAMESPACE)
        .is_some_and(|rest| rest.starts_with(MANAGED_MARKER))
}

impl ConfigAdapter for DroidAdapter {
    fn kind(&self) -> TargetKind {
        TargetKind::Droid
    }

    fn file_names(&self) -> &'static [&'static str] {
        &["settings.json"]
    }

    fn entries_key(&self) -> &'static str {
        "customModels"
    }

    fn default_preamble(&self) -> Preamble {
        Preamble::from_doc(JsonMap::new())
    }

    fn url_policy(&self) -> UrlPolicy {
        // Anthropic-style endpoints take the bare proxy URL.
        UrlPolicy {
            suffix_reasoning: false,
            suffix_generic: true,
        }
    }

    fn entries_from_value(&self, section: JsonValue) -> Result<Vec<ConfigEntry>, String> {
        match section {
            JsonValue::Array(items) => Ok(items
                .into_iter()
                .map(|fields| self.classify(None, fields))
                .collect()),
            other => Err(format!(
                "'customModels' is not an array (found {})",
                json_type(&other)
            )),
        }
    }

    fn entries_to_value(&self, entries: &[ConfigEntry]) -> JsonValue {
        JsonValue::Array(entries.iter().map(|e| e.fields.clone()).collect())
    }

    fn classify(&self, key: Option<String>, fields: JsonValue) -> ConfigEntry {
        let managed = fields
            .get("id")
            .and_then(|v| v.as_str())
            .is_some_and(is_managed_id);
        let source_model_id = if managed {
            fields
                .get("model")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        } else {
            None
        };
        let mut entry = ConfigEntry::new(key, fields);
        entry.managed = managed;
        entry.source_model_id = source_model_id;
        entry
    }

    fn render(&self, model: &SynthesizedModel) -> ConfigEntry {
        let mut fields = json!({
            "model": model.model_id,
            "id": "",
            "index": 0,
            "baseUrl": model.base_url,
            "apiKey": model.api_key,
            "displayName": model.display_name,
            "noImageSupport": model.no_image_support,
            "provider": model.provider,
        });
        if let Some(obj) = fields.as_object_mut() {
            if let Some(max) = model.max_output_tokens {
                obj.insert("maxOutputTokens".into(), json!(max));
            }
            if let Some(budget) = model.thinking_budget {
                obj.insert(
                    "extraArgs".into(),
                    json!({ "thinking": { "type": "enabled", "budget_tokens": budget } }),
                );
            }
        }
        ConfigEntry {
            managed: true,
            source_model_id: Some(model.model_id.clone()),
            ..ConfigEntry::new(None, fields)
        }
    }

    fn stamp(&self, entry: &mut ConfigEntry, index: usize) {
        if !entry.managed {
            return;
        }
        let Some(obj) = entry.fields.as_object_mut() else {
            return;
        };
        let display = obj
            .get("displayName")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| entry.source_model_id.clone())
            .unwrap_or_default();
        let id = format!("{ID_NAMESPACE}{}", managed_identifier(&display, index));
        obj.insert("id".into(), JsonValue::String(id));
        obj.insert("index".into(), json!(index));
    }

    fn base_url(&self, entry: &ConfigEntry) -> Option<String> {
        entry
            .fields
            .get("baseUrl")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

pub(crate) fn json_type(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanonicalModel;
    use crate::synth::synthesize;

    const SETTINGS: &str = r#"{
  "model": "claude-sonnet",
  "customModels": [
    {
      "model": "my-local",
      "id": "custom:my-custom",
      "displayName": "my-custom",
      "baseUrl": "http://localhost:11434/v1",
      "unknownFlag": {"nested": [1, 2]}
    },
    {
      "model": "claude-opus-4-5-thinking",
      "id": "custom:AG-Claude-Opus-4.5-Thinking-1",
      "index": 1,
      "baseUrl": "http://127.0.0.1:8045",
      "apiKey": "sk-x",
      "displayName": "AG-Claude Opus 4.5 Thinking",
      "noImageSupport": false,
      "provider": "anthropic"
    },
    "garbage"
  ],
  "sessionDefaultSettings": {"autonomyMode": "normal"}
}"#;

    #[test]
    fn classifies_by_id_prefix() {
        let parsed = DroidAdapter.parse(Some(SETTINGS));
        assert!(parsed.warning.is_none());
        assert_eq!(parsed.entries.len(), 3);
        assert!(!parsed.entries[0].managed);
        assert!(parsed.entries[1].managed);
        assert_eq!(
            parsed.entries[1].source_model_id.as_deref(),
            Some("claude-opus-4-5-thinking")
        );
        assert!(!parsed.entries[2].managed);
        assert_eq!(parsed.preamble.slot, 1);
        assert_eq!(parsed.managed_count(), 1);
    }

    #[test]
    fn display_name_alone_does_not_make_entry_managed() {
        let e = DroidAdapter.classify(None, json!({"id": "custom:mine", "displayName": "AG-mine"}));
        assert!(!e.managed);
        let e = DroidAdapter.classify(None, json!({"id": "AG-no-namespace"}));
        assert!(!e.managed);
    }

    #[test]
    fn serialize_keeps_unknown_keys_and_order() {
        let parsed = DroidAdapter.parse(Some(SETTINGS));
        let out = DroidAdapter.serialize(&parsed.preamble, &parsed.entries);
        let reparsed = DroidAdapter.parse(Some(&out));
        assert_eq!(reparsed, parsed);

        let v: JsonValue = serde_json::from_str(&out).unwrap();
        let top: Vec<&String> = v.as_object().unwrap().keys().collect();
        assert_eq!(top, vec!["model", "customModels", "sessionDefaultSettings"]);
        let first: Vec<&String> = v["customModels"][0].as_object().unwrap().keys().collect();
        assert_eq!(first, vec!["model", "id", "displayName", "baseUrl", "unknownFlag"]);
        assert!(!out.contains("uid"));
    }

    #[test]
    fn render_and_stamp_match_native_shape() {
        let m = CanonicalModel {
            id: "claude-opus-4-5-thinking".into(),
            name: "Claude Opus 4.5 Thinking".into(),
            group: "Claude".into(),
        };
        let s = synthesize(&m, "http://127.0.0.1:8045/", "sk-x", DroidAdapter.url_policy());
        let mut e = DroidAdapter.render(&s);
        DroidAdapter.stamp(&mut e, 4);
        assert_eq!(e.fields["id"], "custom:AG-Claude-Opus-4.5-Thinking-4");
        assert_eq!(e.fields["index"], 4);
        assert_eq!(e.fields["maxOutputTokens"], 64000);
        assert_eq!(e.fields["extraArgs"]["thinking"]["budget_tokens"], 32000);
        assert_eq!(e.fields["baseUrl"], "http://127.0.0.1:8045");
        let keys: Vec<&String> = e.fields.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec![
                "model",
                "id",
                "index",
                "baseUrl",
                "apiKey",
                "displayName",
                "noImageSupport",
                "provider",
                "maxOutputTokens",
                "extraArgs"
            ]
        );
        // Stamped output classifies back as the same managed entry.
        let again = DroidAdapter.classify(None, e.fields.clone());
        assert!(again.managed);
        assert_eq!(again.source_model_id, e.source_model_id);
    }

    #[test]
    fn generic_model_targets_versioned_endpoint() {
        let m = CanonicalModel {
            id: "gemini-3-pro-high".into(),
            name: "Gemini 3 Pro High".into(),
            group: "Gemini".into(),
        };
        let s = synthesize(&m, "http://127.0.0.1:8045", "k", DroidAdapter.url_policy());
        let e = DroidAdapter.render(&s);
        assert_eq!(e.fields["baseUrl"], "http://127.0.0.1:8045/v1");
        assert_eq!(e.fields["provider"], "generic-chat-completion-api");
        assert_eq!(e.fields["noImageSupport"], true);
        assert!(e.fields.get("extraArgs").is_none());
    }

    #[test]
    fn wrong_section_type_degrades_with_warning() {
        let parsed = DroidAdapter.parse(Some(r#"{"a": 1, "customModels": {"x": 1}}"#));
        assert!(parsed.entries.is_empty());
        assert!(parsed.warning.is_some());
        assert_eq!(parsed.preamble.doc.get("a"), Some(&json!(1)));
    }
}
