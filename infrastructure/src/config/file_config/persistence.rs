//! Persistence configuration from TOML (`[persistence]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// # Example
///
/// ```toml
/// [persistence]
/// compaction_log = "~/.local/share/conductor/compactions.jsonl"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePersistenceConfig {
    /// JSONL file that receives one line per compaction summary
    pub compaction_log: Option<String>,
}

impl FilePersistenceConfig {
    /// Log path with a leading `~/` expanded.
    pub fn compaction_log_path(&self) -> Option<PathBuf> {
        let raw = self.compaction_log.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(rest) = raw.strip_prefix("~/")
            && let Some(home) = dirs::home_dir()
        {
            return Some(home.join(rest));
        }
        Some(PathBuf::from(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_path_is_none() {
        let config = FilePersistenceConfig {
            compaction_log: Some("  ".to_string()),
        };
        assert!(config.compaction_log_path().is_none());
        assert!(FilePersistenceConfig::default().compaction_log_path().is_none());
    }

    #[test]
    fn test_plain_path() {
        let config = FilePersistenceConfig {
            compaction_log: Some("logs/compactions.jsonl".to_string()),
        };
        assert_eq!(
            config.compaction_log_path(),
            Some(PathBuf::from("logs/compactions.jsonl"))
        );
    }
}
