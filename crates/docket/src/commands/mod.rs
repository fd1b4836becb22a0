//! CLI command handlers.

pub mod config;
pub mod run;

use docket_config::LoadedConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Configuration resolved at startup.
    pub loaded: LoadedConfig,
}
