//! Finding and layering config files.
//!
//! Layers, lowest precedence first:
//! 1. `config.toml` in the user config dir (`$DOCKET_CONFIG_DIR`, else the
//!    platform config dir joined with `docket`)
//! 2. `docket.toml` in the project directory (the working directory by default)
//!
//! Command-line flags sit on top and are applied by the binary.

use std::path::{Path, PathBuf};

use crate::{ConfigError, DocketConfig, Result};

const PROJECT_CONFIG_FILE: &str = "docket.toml";
const USER_CONFIG_FILE: &str = "config.toml";
const APP_NAME: &str = "docket";
const CONFIG_DIR_ENV: &str = "DOCKET_CONFIG_DIR";

/// One candidate file and whether it contributed.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    pub loaded: bool,
}

impl ConfigSource {
    fn new(path: &Path, loaded: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            loaded,
        }
    }
}

/// The merged configuration plus how it was assembled.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: DocketConfig,
    /// Every candidate file, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Problems that did not stop loading: unreadable layers, plaintext keys.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths of the files that actually contributed.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|s| s.loaded.then_some(s.path.as_path()))
            .collect()
    }
}

/// Discover and merge every layer, using the platform user config dir.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with_options(project_dir, None)
}

/// Discover and merge every layer.
///
/// `config_dir`, when given, replaces both `$DOCKET_CONFIG_DIR` and the
/// platform default as the location of the user layer.
pub fn load_config_with_options(
    project_dir: Option<&Path>,
    config_dir: Option<&Path>,
) -> Result<LoadedConfig> {
    let user_layer = config_dir
        .map(|dir| dir.join(USER_CONFIG_FILE))
        .or_else(xdg_config_path);
    let project_layer = project_dir
        .unwrap_or_else(|| Path::new("."))
        .join(PROJECT_CONFIG_FILE);

    let mut loaded = LoadedConfig {
        config: DocketConfig::new(),
        sources: Vec::with_capacity(2),
        warnings: Vec::new(),
    };
    for path in user_layer.iter().chain(std::iter::once(&project_layer)) {
        let source = merge_layer(&mut loaded, path);
        loaded.sources.push(source);
    }
    warn_on_plaintext_key(&loaded.config, &mut loaded.warnings);

    Ok(loaded)
}

/// Load a single explicit config file, skipping discovery.
///
/// Unlike a discovered layer, a missing or malformed explicit file is an error.
pub fn load_explicit_config(path: &Path) -> Result<LoadedConfig> {
    let config = load_config_file(path)?;
    let mut warnings = Vec::new();
    warn_on_plaintext_key(&config, &mut warnings);
    Ok(LoadedConfig {
        config,
        sources: vec![ConfigSource::new(path, true)],
        warnings,
    })
}

/// Parse one file.
pub fn load_config_file(path: &Path) -> Result<DocketConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    DocketConfig::from_toml(&contents)
}

/// Write `config` as TOML, creating missing parent directories.
pub fn save_config(config: &DocketConfig, path: &Path) -> Result<()> {
    let write_error = |at: &Path, source| ConfigError::WriteFile {
        path: at.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| write_error(parent, e))?;
    }
    std::fs::write(path, config.to_toml()?).map_err(|e| write_error(path, e))
}

/// `config.toml` inside [`xdg_config_dir`].
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config dir: `$DOCKET_CONFIG_DIR` if set and non-empty, else the
/// platform config dir joined with `docket`.
pub fn xdg_config_dir() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|d| d.join(APP_NAME)),
    }
}

/// Merge `path` into `loaded` if it exists. A malformed file is skipped with
/// a warning rather than failing the whole load.
fn merge_layer(loaded: &mut LoadedConfig, path: &Path) -> ConfigSource {
    if !path.is_file() {
        return ConfigSource::new(path, false);
    }
    match load_config_file(path) {
        Ok(layer) => {
            loaded.config.merge(layer);
            ConfigSource::new(path, true)
        }
        Err(e) => {
            loaded
                .warnings
                .push(format!("Failed to load {}: {}", path.display(), e));
            ConfigSource::new(path, false)
        }
    }
}

fn warn_on_plaintext_key(config: &DocketConfig, warnings: &mut Vec<String>) {
    if config.llm.as_ref().is_some_and(|llm| llm.has_plaintext_api_key()) {
        warnings.push(
            "[llm] api_key is stored in plaintext; prefer the backend's environment variable"
                .to_string(),
        );
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
