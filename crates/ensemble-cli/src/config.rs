use crate::error::{CliError, Result};
use ensemble::engine::config::SimulationSpec;
use std::path::Path;

/// Reads and parses a simulation description from a TOML file. Cross-field
/// validation happens later, inside the workflow.
pub fn load_spec(path: &Path) -> Result<SimulationSpec> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: anyhow::Error::new(e),
    })
}
