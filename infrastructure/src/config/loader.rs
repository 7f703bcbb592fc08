//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level config file names, checked in order
const PROJECT_CONFIG_FILES: &[&str] = &["conductor.toml", ".conductor.toml"];

/// Prefix of environment overrides, e.g. `CONDUCTOR_EXECUTOR__MAX_PARALLELISM=8`
pub const ENV_PREFIX: &str = "CONDUCTOR_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `CONDUCTOR_*` environment variables (`__` separates section and key)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./conductor.toml` or `./.conductor.toml`
    /// 4. Global: `$XDG_CONFIG_HOME/conductor/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&PathBuf>) -> Result<FileConfig, Box<figment::Error>> {
        Self::load_from(Self::global_config_path(), Path::new("."), config_path)
    }

    /// Same as [`load`](Self::load) with explicit global file and project directory.
    pub fn load_from(
        global_path: Option<PathBuf>,
        project_dir: &Path,
        config_path: Option<&PathBuf>,
    ) -> Result<FileConfig, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));

        if let Some(global_path) = global_path
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(&global_path));
        }

        if let Some(path) = Self::project_config_in(project_dir) {
            figment = figment.merge(Toml::file(&path));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(Box::new)
    }

    /// Load only default configuration (for --no-config)
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    /// `$XDG_CONFIG_HOME/conductor/config.toml` (or the platform equivalent)
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("conductor").join("config.toml"))
    }

    /// Get the project-level config file path (if it exists)
    pub fn project_config_path() -> Option<PathBuf> {
        Self::project_config_in(Path::new("."))
    }

    fn project_config_in(dir: &Path) -> Option<PathBuf> {
        PROJECT_CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.exists())
    }

    /// Describe the config file locations being used, one line each.
    pub fn describe_sources(explicit: Option<&PathBuf>) -> Vec<String> {
        let mut lines = Vec::new();

        if let Some(path) = explicit {
            let mark = if path.exists() { "FOUND" } else { "MISSING" };
            lines.push(format!("[{mark:^7}] Explicit: {}", path.display()));
        }

        match Self::project_config_path() {
            Some(path) => lines.push(format!("[{:^7}] Project: {}", "FOUND", path.display())),
            None => lines.push(format!(
                "[{:^7}] Project: ./conductor.toml or ./.conductor.toml",
                ""
            )),
        }

        if let Some(path) = Self::global_config_path() {
            let mark = if path.exists() { "FOUND" } else { "" };
            lines.push(format!("[{mark:^7}] Global:  {}", path.display()));
        }

        lines.push(format!("[{:^7}] Env:     {}*", "", ENV_PREFIX));
        lines.push(format!("[{:^7}] Default: built-in defaults", ""));
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_defaults() {
        let config = ConfigLoader::load_defaults();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_global_config_path_returns_some() {
        let path = ConfigLoader::global_config_path();
        assert!(path.is_some());
        assert!(path.unwrap().to_string_lossy().contains("conductor"));
    }

    #[test]
    fn test_project_overrides_global_and_explicit_overrides_project() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("global.toml");
        fs::write(
            &global,
            "[executor]\nmax_parallelism = 2\n\n[hitl]\nconfirmation_ttl_secs = 60\n",
        )
        .unwrap();

        let project_dir = dir.path().join("project");
        fs::create_dir(&project_dir).unwrap();
        fs::write(
            project_dir.join(".conductor.toml"),
            "[executor]\nmax_parallelism = 6\n",
        )
        .unwrap();

        let explicit = dir.path().join("explicit.toml");
        fs::write(&explicit, "[hitl]\nconfirmation_threshold = \"high\"\n").unwrap();

        let config =
            ConfigLoader::load_from(Some(global), &project_dir, Some(&explicit)).unwrap();

        assert_eq!(config.executor.max_parallelism, 6);
        assert_eq!(config.hitl.confirmation_ttl_secs, 60);
        assert_eq!(config.hitl.confirmation_threshold, "high");
        assert_eq!(config.compaction, Default::default());
    }

    #[test]
    fn test_missing_files_give_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            ConfigLoader::load_from(Some(dir.path().join("absent.toml")), dir.path(), None)
                .unwrap();
        assert_eq!(config.executor.max_parallelism, 4);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("bad.toml");
        fs::write(&explicit, "[executor]\nmax_parallelism = \"many\"\n").unwrap();

        let result = ConfigLoader::load_from(None, dir.path(), Some(&explicit));
        assert!(result.is_err());
    }

    #[test]
    fn test_describe_sources_lists_env_and_defaults() {
        let lines = ConfigLoader::describe_sources(None);
        assert!(lines.iter().any(|l| l.contains("CONDUCTOR_*")));
        assert!(lines.last().unwrap().contains("built-in defaults"));
    }
}
