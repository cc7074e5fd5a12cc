//! Loading a backend config file for the CLI.

use std::path::Path;

use crate::cli::error::{CliError, CliResult};
use crate::db::BackendConfig;

/// Parse a config document. JSON files are read as JSON, anything else as YAML.
pub fn parse_config(path: &Path, contents: &str) -> CliResult<BackendConfig> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        serde_json::from_str(contents).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(contents).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| CliError::InvalidConfig {
        path: path.display().to_string(),
        message,
    })
}

/// Read and parse the config file at `path`.
pub fn load_config(path: &Path) -> CliResult<BackendConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| CliError::ConfigIo {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(path, &contents)
}
