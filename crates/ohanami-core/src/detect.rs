use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::error::{OhanamiError, Result};

pub const LOADER_MARKER: &str = "wp-load.php";
pub const SETTINGS_MARKER: &str = "wp-config.php";
pub const CORE_SETTINGS_MARKER: &str = "wp-settings.php";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionRule {
    /// Loader marker present, settings marker in the same directory or its parent.
    LoaderWithSettings,
    /// Settings marker alone; hidden directories are not descended.
    SettingsOnly,
    /// Loader rule first, settings rule second; first match wins.
    Either,
}

impl DetectionRule {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoaderWithSettings => "loader",
            Self::SettingsOnly => "settings",
            Self::Either => "either",
        }
    }

    #[must_use]
    const fn skips_hidden(self) -> bool {
        matches!(self, Self::SettingsOnly | Self::Either)
    }
}

impl fmt::Display for DetectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectionRule {
    type Err = OhanamiError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "loader" | "loader-with-settings" | "a" => Ok(Self::LoaderWithSettings),
            "settings" | "settings-only" | "b" => Ok(Self::SettingsOnly),
            "either" | "any" => Ok(Self::Either),
            other => Err(OhanamiError::Validation(format!(
                "unknown detection rule '{other}' (expected loader, settings or either)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DetectionBasis {
    LoaderWithSettings { settings_in_parent: bool },
    SettingsMarker { marker: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallationRoot {
    pub path: PathBuf,
    pub depth: usize,
    pub basis: DetectionBasis,
}

#[must_use]
pub fn discover(root: &Path, max_depth: usize, rule: DetectionRule) -> Vec<InstallationRoot> {
    let skip_hidden = rule.skips_hidden();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| is_scannable_dir(entry, skip_hidden));

    let mut out = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(
                    path = ?err.path(),
                    error = %err,
                    "skipping unreadable subtree"
                );
                continue;
            }
        };
        if let Some(basis) = match_installation(entry.path(), rule) {
            tracing::debug!(path = %entry.path().display(), depth = entry.depth(), "installation detected");
            out.push(InstallationRoot {
                path: entry.path().to_path_buf(),
                depth: entry.depth(),
                basis,
            });
        }
    }
    out
}

#[must_use]
pub fn discover_all(
    roots: &[PathBuf],
    max_depth: usize,
    rule: DetectionRule,
) -> Vec<InstallationRoot> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for root in roots {
        for installation in discover(root, max_depth, rule) {
            let key = installation
                .path
                .canonicalize()
                .unwrap_or_else(|_| installation.path.clone());
            if seen.insert(key) {
                out.push(installation);
            }
        }
    }
    out
}

#[must_use]
pub fn match_installation(dir: &Path, rule: DetectionRule) -> Option<DetectionBasis> {
    match rule {
        DetectionRule::LoaderWithSettings => match_loader_rule(dir),
        DetectionRule::SettingsOnly => match_settings_rule(dir),
        DetectionRule::Either => match_loader_rule(dir).or_else(|| match_settings_rule(dir)),
    }
}

fn match_loader_rule(dir: &Path) -> Option<DetectionBasis> {
    if !dir.join(LOADER_MARKER).is_file() {
        return None;
    }
    if dir.join(SETTINGS_MARKER).is_file() {
        return Some(DetectionBasis::LoaderWithSettings {
            settings_in_parent: false,
        });
    }
    dir.parent()
        .filter(|parent| parent.join(SETTINGS_MARKER).is_file())
        .map(|_| DetectionBasis::LoaderWithSettings {
            settings_in_parent: true,
        })
}

fn match_settings_rule(dir: &Path) -> Option<DetectionBasis> {
    [SETTINGS_MARKER, CORE_SETTINGS_MARKER]
        .into_iter()
        .find(|marker| dir.join(marker).is_file())
        .map(|marker| DetectionBasis::SettingsMarker { marker })
}

fn is_scannable_dir(entry: &DirEntry, skip_hidden: bool) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    if entry.depth() == 0 || !skip_hidden {
        return true;
    }
    !entry.file_name().to_string_lossy().starts_with('.')
}
