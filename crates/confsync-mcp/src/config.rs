use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub targets: Option<TargetsCfg>,
    pub catalog: Option<CatalogCfg>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TargetsCfg {
    /// Droid config directory, default `~/.factory`.
    pub droid_home: Option<String>,
    /// OpenCode config directory, default `~/.config/opencode`.
    pub opencode_config_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CatalogCfg {
    /// Catalog TOML path; default `<home>/catalog.toml`.
    pub file: Option<String>,
    pub proxy_url: Option<String>,
    pub api_key: Option<String>,
}

pub fn load_user_config(home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = home.join("config.toml");
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)?;
    let cfg: UserConfig = toml::from_str(&s)?;
    Ok(Some(cfg))
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// The user's home directory, falling back to the current directory.
pub fn user_home() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// `explicit` when non-empty, else `$HOME/.confsync`.
pub fn resolve_home(explicit: &str) -> PathBuf {
    if !explicit.is_empty() {
        expand_home(explicit)
    } else {
        user_home().join(".confsync")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_user_config(dir.path()).unwrap().is_none());
    }

    #[test]
    fn parses_all_sections() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            r#"
[logging]
level = "debug"
to_file = false

[targets]
droid_home = "/srv/factory"

[catalog]
proxy_url = "http://10.0.0.2:8045"
"#,
        )
        .unwrap();
        let cfg = load_user_config(dir.path()).unwrap().unwrap();
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("debug"));
        let targets = cfg.targets.unwrap();
        assert_eq!(targets.droid_home.as_deref(), Some("/srv/factory"));
        assert!(targets.opencode_config_dir.is_none());
        assert_eq!(
            cfg.catalog.unwrap().proxy_url.as_deref(),
            Some("http://10.0.0.2:8045")
        );
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[logging\n").unwrap();
        assert!(load_user_config(dir.path()).is_err());
    }
}
