use super::default::{DEFAULT_PROXY_URL, default_models};
use super::{FileCatalog, RawCatalogFile};

/// Overrides applied on top of whatever the catalog file says.
#[derive(Debug, Clone, Default)]
pub struct CatalogOverrides {
    pub proxy_url: Option<String>,
    pub api_key: Option<String>,
}

pub fn from_toml_str(s: &str, overrides: &CatalogOverrides) -> anyhow::Result<FileCatalog> {
    let raw: RawCatalogFile = toml::from_str(s)?;
    Ok(build_catalog(raw, overrides))
}

pub fn load_from_file(
    path: &std::path::Path,
    overrides: &CatalogOverrides,
) -> anyhow::Result<FileCatalog> {
    let content = std::fs::read_to_string(path)?;
    from_toml_str(&content, overrides)
}

pub fn load_default(overrides: &CatalogOverrides) -> FileCatalog {
    build_catalog(RawCatalogFile::default(), overrides)
}

fn build_catalog(raw: RawCatalogFile, overrides: &CatalogOverrides) -> FileCatalog {
    let mut models = Vec::with_capacity(raw.models.len());
    let mut seen = std::collections::HashSet::new();
    for m in raw.models {
        if m.id.trim().is_empty() {
            tracing::warn!("catalog: skipping model with empty id ('{}')", m.name);
            continue;
        }
        if !seen.insert(m.id.clone()) {
            tracing::warn!("catalog: duplicate model id '{}' ignored", m.id);
            continue;
        }
        models.push(m);
    }
    if models.is_empty() {
        models = default_models();
    }
    FileCatalog {
        proxy_url: overrides
            .proxy_url
            .clone()
            .or(raw.proxy_url)
            .unwrap_or_else(|| DEFAULT_PROXY_URL.to_string()),
        api_key: overrides.api_key.clone().or(raw.api_key).unwrap_or_default(),
        models,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ModelCatalog;
    use crate::model::TargetKind;

    #[test]
    fn parse_catalog_file() {
        let toml = r#"
proxy_url = "http://127.0.0.1:9000/v1/"
api_key = "sk-file"

[[models]]
id = "gemini-3-pro-high"
name = "Gemini 3 Pro High"
group = "Gemini"

[[models]]
id = "gemini-3-pro-high"
name = "dup"

[[models]]
id = "claude-sonnet-4-5"
displayName = "Claude Sonnet 4.5"
"#;
        let c = from_toml_str(toml, &CatalogOverrides::default()).expect("parse ok");
        let ids: Vec<String> = c.list_models().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["gemini-3-pro-high", "claude-sonnet-4-5"]);
        assert_eq!(c.api_key(), "sk-file");
        assert_eq!(c.base_url(TargetKind::Droid), "http://127.0.0.1:9000/v1");
        assert_eq!(c.base_url(TargetKind::OpenCode), "http://127.0.0.1:9000");
    }

    #[test]
    fn overrides_win_and_defaults_fill_in() {
        let c = load_default(&CatalogOverrides {
            proxy_url: None,
            api_key: Some("sk-env".into()),
        });
        assert_eq!(c.proxy_url, DEFAULT_PROXY_URL);
        assert_eq!(c.api_key, "sk-env");
        assert!(!c.models.is_empty());
    }
}
