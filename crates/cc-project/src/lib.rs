//! cc-project: twin configuration files, validation, and twin construction.

pub mod schema;
pub mod validate;

pub use schema::{InitialConditions, LATEST_VERSION, TwinConfig};
pub use validate::{ValidationError, validate_config};

use cc_logic::{CryoTwin, LogicError};
use std::path::Path;
use tracing::debug;

pub type ProjectResult<T> = Result<T, ProjectError>;

#[derive(thiserror::Error, Debug)]
pub enum ProjectError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Twin construction error: {0}")]
    Logic(#[from] LogicError),
}

pub fn from_yaml_str(content: &str) -> ProjectResult<TwinConfig> {
    let config: TwinConfig = serde_yaml::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn to_yaml_string(config: &TwinConfig) -> ProjectResult<String> {
    validate_config(config)?;
    Ok(serde_yaml::to_string(config)?)
}

pub fn load_yaml(path: &Path) -> ProjectResult<TwinConfig> {
    debug!(path = %path.display(), "loading YAML config");
    let content = std::fs::read_to_string(path)?;
    from_yaml_str(&content)
}

pub fn save_yaml(path: &Path, config: &TwinConfig) -> ProjectResult<()> {
    let content = to_yaml_string(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> ProjectResult<TwinConfig> {
    debug!(path = %path.display(), "loading JSON config");
    let content = std::fs::read_to_string(path)?;
    let config: TwinConfig = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

pub fn save_json(path: &Path, config: &TwinConfig) -> ProjectResult<()> {
    validate_config(config)?;
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load by extension: `.json` as JSON, anything else as YAML.
pub fn load(path: &Path) -> ProjectResult<TwinConfig> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_json(path),
        _ => load_yaml(path),
    }
}

/// Validate `config` and build a twin from it.
pub fn build_twin(config: &TwinConfig) -> ProjectResult<CryoTwin> {
    validate_config(config)?;
    let twin = CryoTwin::from_parts(
        config.plant.clone(),
        config.initial.state.clone(),
        config.initial.controls.clone(),
        config.sequencer.clone(),
        config.interlock.clone(),
        config.operating.clone(),
    )?;
    Ok(twin)
}
