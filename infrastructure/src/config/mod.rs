//! Configuration file loading for conductor
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `CONDUCTOR_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./conductor.toml` or `./.conductor.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/conductor/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, DEFAULT_HEARTBEAT_INTERVAL_SECS, FileClassifierConfig,
    FileCompactionConfig, FileConfig, FileExecutorConfig, FileHeartbeatConfig, FileHitlConfig,
    FilePersistenceConfig,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
