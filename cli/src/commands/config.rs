use anyhow::{Context, Result};
use multisig_governance_sdk::config::EngineConfig;

/// Reads the engine configuration from a TOML file, defaults when no path is given.
pub fn load(path: Option<&str>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    parse(&raw).with_context(|| format!("Invalid config file {}", path))
}

pub fn parse(raw: &str) -> Result<EngineConfig> {
    Ok(toml::from_str(raw)?)
}
