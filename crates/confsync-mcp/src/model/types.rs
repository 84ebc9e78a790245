use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// A model descriptor supplied by the catalog. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalModel {
    pub id: String,
    #[serde(alias = "displayName")]
    pub name: String,
    #[serde(default)]
    pub group: String,
}

/// One entry of a target's ordered entry list, managed or not.
///
/// `uid` only identifies the entry within an editing session and is never
/// written to the target file. Equality ignores it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    pub uid: Uuid,
    /// Object key for targets whose entries live in a map.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Catalog model this entry was synthesized from (managed entries only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_model_id: Option<String>,
    /// Target-native stanza, key order preserved.
    pub fields: JsonValue,
    pub index: usize,
    pub managed: bool,
}

impl PartialEq for ConfigEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.source_model_id == other.source_model_id
            && self.fields == other.fields
            && self.index == other.index
            && self.managed == other.managed
    }
}

impl ConfigEntry {
    pub fn new(key: Option<String>, fields: JsonValue) -> Self {
        Self {
            uid: Uuid::new_v4(),
            key,
            source_model_id: None,
            fields,
            index: 0,
            managed: false,
        }
    }
}

/// Entry as handed back by a client: only the persisted parts and the
/// session uid are read, the classification is recomputed by the adapter.
#[derive(Debug, Clone, Deserialize)]
pub struct EntryInput {
    #[serde(default)]
    pub uid: Option<Uuid>,
    #[serde(default)]
    pub key: Option<String>,
    pub fields: JsonValue,
}

impl From<&ConfigEntry> for EntryInput {
    fn from(e: &ConfigEntry) -> Self {
        EntryInput {
            uid: Some(e.uid),
            key: e.key.clone(),
            fields: e.fields.clone(),
        }
    }
}
