use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::identity::RawUser;

/// Client configuration: which marketplace to talk to and as whom. The
/// user record is stored as received, with whichever id spelling the
/// backend used; resolution happens at session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub user: RawUser,
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "stint") {
            Ok(proj_dirs.config_dir().join("config.json"))
        } else {
            Ok(PathBuf::from("stint.config.json"))
        }
    }

    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        let raw = std::fs::read_to_string(&path).with_context(|| {
            format!("No config at {}. Run 'stint init' first.", path.display())
        })?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Malformed config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

/// Read an API token from a file, trimming trailing newlines.
pub fn read_token_file(path: &str) -> Result<String> {
    let expanded = expand_tilde(path);
    let token = std::fs::read_to_string(&expanded)
        .with_context(|| format!("Failed to read token file: {}", expanded.display()))?;
    Ok(token.trim().to_string())
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::canonical_id;

    #[test]
    fn test_expand_tilde_leaves_plain_paths_alone() {
        assert_eq!(expand_tilde("/tmp/token.txt"), PathBuf::from("/tmp/token.txt"));
        assert_eq!(expand_tilde("token.txt"), PathBuf::from("token.txt"));
    }

    #[test]
    fn test_expand_tilde_rewrites_home_prefix() {
        let expanded = expand_tilde("~/token.txt");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("token.txt"));
    }

    #[test]
    fn test_config_parses_with_legacy_id_spelling() {
        let cfg: Config = serde_json::from_str(
            r#"{
                "base_url": "https://api.example",
                "user": {"_id": "abc123", "name": "Dana"}
            }"#,
        )
        .unwrap();

        assert_eq!(cfg.base_url, "https://api.example");
        assert!(cfg.token.is_none());
        assert_eq!(canonical_id(&cfg.user).unwrap().as_str(), "abc123");
    }
}
