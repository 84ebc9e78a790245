//! Detect a target tool's executable and version.

use std::path::{Path, PathBuf};
use std::process::Command;

/// Look for `name` on `PATH`, then in common per-user install locations.
pub fn find_executable(name: &str, extra_dirs: &[PathBuf]) -> Option<PathBuf> {
    let candidates = |dir: &Path| -> Vec<PathBuf> {
        if cfg!(windows) {
            ["exe", "cmd", "bat"]
                .iter()
                .map(|ext| dir.join(format!("{name}.{ext}")))
                .collect()
        } else {
            vec![dir.join(name)]
        }
    };
    let path_dirs = std::env::var_os("PATH")
        .map(|p| std::env::split_paths(&p).collect::<Vec<_>>())
        .unwrap_or_default();
    path_dirs
        .iter()
        .chain(extra_dirs)
        .flat_map(|d| candidates(d.as_path()))
        .find(|p| p.is_file())
}

/// Run `<exe> --version` and pull a version token from its output.
pub fn probe_version(exe: &Path) -> Option<String> {
    let output = match Command::new(exe).arg("--version").output() {
        Ok(o) => o,
        Err(e) => {
            tracing::debug!("failed to run {} --version: {}", exe.display(), e);
            return None;
        }
    };
    if !output.status.success() {
        tracing::debug!("{} --version exited with {}", exe.display(), output.status);
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let raw = if stdout.trim().is_empty() {
        String::from_utf8_lossy(&output.stderr).into_owned()
    } else {
        stdout.into_owned()
    };
    tracing::debug!("{} --version: {}", exe.display(), raw.trim());
    extract_version(&raw)
}

fn looks_like_version(s: &str) -> bool {
    s.contains('.')
        && s.starts_with(|c: char| c.is_ascii_digit())
        && s.chars().all(|c| c.is_ascii_digit() || c == '.')
}

/// Extract `1.2.3` from outputs like `droid 1.2.3`, `opencode/0.15.8 linux`,
/// or `v0.3.1`.
pub fn extract_version(raw: &str) -> Option<String> {
    for token in raw.split_whitespace() {
        let token = token.trim_start_matches('v');
        if looks_like_version(token) {
            return Some(token.to_string());
        }
        if let Some((_, after)) = token.split_once('/')
            && looks_like_version(after.trim_start_matches('v'))
        {
            return Some(after.trim_start_matches('v').to_string());
        }
    }
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.contains('.').then_some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_forms() {
        assert_eq!(extract_version("0.22.3\n").as_deref(), Some("0.22.3"));
        assert_eq!(extract_version("droid v1.4.0").as_deref(), Some("1.4.0"));
        assert_eq!(
            extract_version("opencode/0.15.8 linux-x64").as_deref(),
            Some("0.15.8")
        );
        assert_eq!(extract_version("build(2.1.0-beta)").as_deref(), Some("2.1.0"));
        assert_eq!(extract_version("no version here"), None);
    }

    #[test]
    fn finds_executable_in_extra_dir() {
        let dir = tempfile::tempdir().unwrap();
        let name = if cfg!(windows) { "fake-tool.exe" } else { "fake-tool" };
        std::fs::write(dir.path().join(name), "").unwrap();
        let found = find_executable("fake-tool", &[dir.path().to_path_buf()]);
        assert!(found.is_some());
        assert!(find_executable("surely-not-installed-xyz", &[]).is_none());
    }
}
