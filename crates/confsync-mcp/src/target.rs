//! Where each target keeps its configuration.

use std::path::{Path, PathBuf};

use crate::adapter::{ConfigAdapter, adapter_for};
use crate::backup::BackupFile;
use crate::error::{Result, SyncError};
use crate::model::TargetKind;

/// A target tool bound to a concrete config directory.
#[derive(Debug, Clone)]
pub struct Target {
    kind: TargetKind,
    config_dir: PathBuf,
    /// Extra directories searched for the tool's executable besides `PATH`.
    search_dirs: Vec<PathBuf>,
}

impl Target {
    pub fn new(kind: TargetKind, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            config_dir: config_dir.into(),
            search_dirs: Vec::new(),
        }
    }

    /// Conventional locations under the user's home directory.
    pub fn default_for(kind: TargetKind, home: &Path) -> Self {
        let mut search_dirs = vec![home.join(".local/bin"), home.join("bin")];
        let config_dir = match kind {
            TargetKind::Droid => {
                search_dirs.push(home.join(".factory/bin"));
                home.join(".factory")
            }
            TargetKind::OpenCode => {
                search_dirs.push(home.join(".opencode/bin"));
                home.join(".config/opencode")
            }
        };
        if !cfg!(windows) {
            search_dirs.extend(
                ["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"]
                    .iter()
                    .map(PathBuf::from),
            );
        }
        Self {
            kind,
            config_dir,
            search_dirs,
        }
    }

    /// Same target with its config directory moved elsewhere.
    pub fn with_config_dir(mut self, config_dir: impl Into<PathBuf>) -> Self {
        self.config_dir = config_dir.into();
        self
    }

    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    pub fn adapter(&self) -> &'static dyn ConfigAdapter {
        adapter_for(self.kind)
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    pub fn executable_name(&self) -> &'static str {
        match self.kind {
            TargetKind::Droid => "droid",
            TargetKind::OpenCode => "opencode",
        }
    }

    /// The config directory exists.
    pub fn is_installed(&self) -> bool {
        self.config_dir.is_dir()
    }

    pub fn primary_file(&self) -> PathBuf {
        self.config_dir.join(self.adapter().file_names()[0])
    }

    /// File names worth showing: the primary plus any other member of the
    /// family present on disk.
    pub fn files(&self) -> Vec<String> {
        self.adapter()
            .file_names()
            .iter()
            .enumerate()
            .filter(|(i, name)| *i == 0 || self.config_dir.join(name).is_file())
            .map(|(_, name)| name.to_string())
            .collect()
    }

    /// Resolve a file of this target's family; other names are rejected.
    pub fn resolve_file(&self, name: Option<&str>) -> Result<PathBuf> {
        match name {
            None => Ok(self.primary_file()),
            Some(n) if self.adapter().file_names().contains(&n) => Ok(self.config_dir.join(n)),
            Some(n) => Err(SyncError::UnknownFile {
                target: self.kind,
                file: n.to_string(),
            }),
        }
    }

    pub fn backup(&self) -> BackupFile {
        BackupFile::new(self.kind, self.primary_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_locations() {
        let home = Path::new("/home/u");
        let droid = Target::default_for(TargetKind::Droid, home);
        assert_eq!(droid.primary_file(), PathBuf::from("/home/u/.factory/settings.json"));
        assert!(droid.search_dirs().contains(&PathBuf::from("/home/u/.factory/bin")));
        let oc = Target::default_for(TargetKind::OpenCode, home);
        assert_eq!(
            oc.primary_file(),
            PathBuf::from("/home/u/.config/opencode/opencode.json")
        );
        assert_eq!(oc.executable_name(), "opencode");
        let moved = oc.with_config_dir("/srv/oc");
        assert_eq!(moved.primary_file(), PathBuf::from("/srv/oc/opencode.json"));
        assert!(!moved.search_dirs().is_empty());
    }

    #[test]
    fn resolve_file_rejects_outside_family() {
        let t = Target::new(TargetKind::OpenCode, "/cfg");
        assert_eq!(t.resolve_file(Some("config.json")).unwrap(), PathBuf::from("/cfg/config.json"));
        assert!(matches!(
            t.resolve_file(Some("../../etc/passwd")),
            Err(SyncError::UnknownFile { .. })
        ));
    }

    #[test]
    fn files_lists_primary_and_existing_extras() {
        let dir = tempfile::tempdir().unwrap();
        let t = Target::new(TargetKind::OpenCode, dir.path());
        assert_eq!(t.files(), vec!["opencode.json"]);
        std::fs::write(dir.path().join("config.json"), "{}").unwrap();
        assert_eq!(t.files(), vec!["opencode.json", "config.json"]);
    }
}
