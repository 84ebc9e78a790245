use serde::Deserialize;

use crate::model::{CanonicalModel, TargetKind};

/// Source of canonical models and proxy credentials for one sync session.
pub trait ModelCatalog: Send + Sync {
    /// Models in catalog order.
    fn list_models(&self) -> Vec<CanonicalModel>;
    /// Proxy base URL formatted for `target`.
    fn base_url(&self, target: TargetKind) -> String;
    fn api_key(&self) -> String;
}

/// On-disk catalog (`catalog.toml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCatalogFile {
    #[serde(default)]
    pub proxy_url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub models: Vec<CanonicalModel>,
}

/// Catalog snapshot held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCatalog {
    pub proxy_url: String,
    pub api_key: String,
    pub models: Vec<CanonicalModel>,
}

impl ModelCatalog for FileCatalog {
    fn list_models(&self) -> Vec<CanonicalModel> {
        self.models.clone()
    }

    fn base_url(&self, target: TargetKind) -> String {
        format_proxy_url(&self.proxy_url, target)
    }

    fn api_key(&self) -> String {
        self.api_key.clone()
    }
}

/// Droid takes the URL as-is minus trailing slashes; OpenCode also drops a
/// trailing `/v1`, since the synthesizer re-adds it per family.
pub fn format_proxy_url(url: &str, target: TargetKind) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    match target {
        TargetKind::Droid => trimmed.to_string(),
        TargetKind::OpenCode => trimmed.strip_suffix("/v1").unwrap_or(trimmed).to_string(),
    }
}
