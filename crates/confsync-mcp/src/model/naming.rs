//! Target identifiers and the managed-entry naming convention.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Marker prefixed to the display name of every entry this engine writes.
///
/// Synthesizer and adapters both read this constant; an entry is managed
/// exactly when its persisted name/identifier carries it.
pub const MANAGED_MARKER: &str = "AG-";

/// Supported target tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Droid,
    OpenCode,
}

impl TargetKind {
    pub const ALL: [TargetKind; 2] = [TargetKind::Droid, TargetKind::OpenCode];

    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Droid => "droid",
            TargetKind::OpenCode => "opencode",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "droid" | "factory" => Ok(TargetKind::Droid),
            "opencode" | "open-code" => Ok(TargetKind::OpenCode),
            other => Err(format!("unknown target '{other}'")),
        }
    }
}

/// Whether a display name carries the managed marker.
pub fn has_managed_marker(name: &str) -> bool {
    name.starts_with(MANAGED_MARKER)
}

/// Display name written for a catalog model: `AG-<name>`.
pub fn managed_display_name(name: &str) -> String {
    format!("{MANAGED_MARKER}{name}")
}

/// Derive the persisted identifier of a managed entry from its display name
/// and final position: whitespace becomes `-`, then `-<index>` is appended.
pub fn managed_identifier(display_name: &str, index: usize) -> String {
    let slug: String = display_name
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect();
    format!("{slug}-{index}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_replaces_whitespace_and_appends_index() {
        assert_eq!(
            managed_identifier("AG-Claude Sonnet 4.5", 3),
            "AG-Claude-Sonnet-4.5-3"
        );
        assert_eq!(managed_identifier("AG-x\ty", 0), "AG-x-y-0");
    }

    #[test]
    fn display_name_carries_marker() {
        let name = managed_display_name("Gemini 3 Pro");
        assert!(has_managed_marker(&name));
        assert!(!has_managed_marker("Gemini 3 Pro"));
    }

    #[test]
    fn target_kind_parses_aliases() {
        assert_eq!("Droid".parse::<TargetKind>(), Ok(TargetKind::Droid));
        assert_eq!("opencode".parse::<TargetKind>(), Ok(TargetKind::OpenCode));
        assert!("vscode".parse::<TargetKind>().is_err());
    }
}
