//! Configuration system for Docket.
//!
//! Provides TOML-based configuration with:
//! - A backend section (`[llm]`) describing the text-generation provider
//! - Consolidation tuning (`[timeline]`): event cap, dedup threshold, pool size
//! - Config file layering (XDG user config + project-local overrides)
//! - API key resolution (env var → config file)

pub mod discovery;
pub mod error;
pub mod secrets;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    load_explicit_config, save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use secrets::{ResolvedSecret, SecretSource, resolve_api_key};
pub use types::*;
