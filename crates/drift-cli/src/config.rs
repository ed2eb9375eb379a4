//! Configuration file loading for the CLI
//!
//! This module defines [`AppConfig`], the simulation parameters plus the
//! rendering style, and finds and loads it from TOML files in various
//! locations (explicit path, local directory, system directory).

use std::{fs, path::Path};

use directories::ProjectDirs;
use log::{debug, info};
use serde::Deserialize;

use drift::config::SimulationConfig;

use crate::error::{CliError, ConfigError};

/// Top-level application configuration combining simulation and style settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Simulation configuration section.
    #[serde(default)]
    simulation: SimulationConfig,

    /// Style configuration section.
    #[serde(default)]
    style: StyleConfig,
}

impl AppConfig {
    pub fn new(simulation: SimulationConfig, style: StyleConfig) -> Self {
        Self { simulation, style }
    }

    /// Returns the simulation configuration.
    pub fn simulation(&self) -> &SimulationConfig {
        &self.simulation
    }

    /// Returns the style configuration.
    pub fn style(&self) -> &StyleConfig {
        &self.style
    }

    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }
}

/// Visual styling of the SVG render.
///
/// Colors are passed through to SVG attributes verbatim.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleConfig {
    background_color: Option<String>,
    node_fill: String,
    node_stroke: String,
    pinned_fill: String,
    link_stroke: String,
    link_width: f64,
    /// Drawn radius of nodes without a collision radius of their own.
    node_radius: f64,
    padding: f64,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background_color: None,
            node_fill: "#4f7cac".to_string(),
            node_stroke: "#ffffff".to_string(),
            pinned_fill: "#c0504d".to_string(),
            link_stroke: "#9a9a9a".to_string(),
            link_width: 1.5,
            node_radius: 5.0,
            padding: 20.0,
        }
    }
}

impl StyleConfig {
    pub fn background_color(&self) -> Option<&str> {
        self.background_color.as_deref()
    }

    pub fn node_fill(&self) -> &str {
        &self.node_fill
    }

    pub fn node_stroke(&self) -> &str {
        &self.node_stroke
    }

    pub fn pinned_fill(&self) -> &str {
        &self.pinned_fill
    }

    pub fn link_stroke(&self) -> &str {
        &self.link_stroke
    }

    pub fn link_width(&self) -> f64 {
        self.link_width
    }

    pub fn node_radius(&self) -> f64 {
        self.node_radius
    }

    pub fn padding(&self) -> f64 {
        self.padding
    }
}

/// Find and load configuration from various locations
///
/// Search order:
/// 1. Explicit path if provided
/// 2. Local project directory (drift/config.toml)
/// 3. Platform-specific config directory
/// 4. Default config if none found
///
/// # Errors
///
/// Returns error if:
/// - Explicit path is provided but file doesn't exist
/// - Config file exists but cannot be parsed
/// - The simulation section does not validate
pub fn load_config(explicit_path: Option<impl AsRef<Path>>) -> Result<AppConfig, CliError> {
    // 1. Try the explicitly provided path first if available
    if let Some(path) = explicit_path {
        let path = path.as_ref();
        info!(path = path.display().to_string(); "Loading configuration from explicit path");
        return load_config_file(path);
    }

    // 2. Try the local project directory
    let local_config = Path::new("drift/config.toml");
    if local_config.exists() {
        info!(path = local_config.display().to_string(); "Loading configuration from local path");
        return load_config_file(local_config);
    }

    // 3. Try the platform-specific config directory
    if let Some(proj_dirs) = ProjectDirs::from("com", "drift", "drift") {
        let system_config = proj_dirs.config_dir().join("config.toml");

        if system_config.exists() {
            info!(path = system_config.display().to_string(); "Loading configuration from system path");
            return load_config_file(system_config);
        }

        debug!(path = system_config.display().to_string(); "System configuration file not found");
    } else {
        debug!("Could not determine platform-specific config directory");
    }

    // 4. If no config is found, return default config
    debug!("No configuration file found, using default configuration");
    Ok(AppConfig::default())
}

fn load_config_file(path: impl AsRef<Path>) -> Result<AppConfig, CliError> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_path_buf()).into());
    }

    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

fn parse_config(content: &str) -> Result<AppConfig, CliError> {
    let config: AppConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .simulation()
        .validate()
        .map_err(|err| ConfigError::Validation(err.to_string()))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_sections() {
        let config = parse_config(
            r##"
            [simulation]
            seed = 3

            [simulation.collision]
            radius = 6.0

            [style]
            node_fill = "#000000"
            "##,
        )
        .unwrap();

        assert_eq!(config.simulation().seed(), 3);
        assert_eq!(config.simulation().collision().radius(), 6.0);
        assert_eq!(config.style().node_fill(), "#000000");
        assert_eq!(config.style().padding(), 20.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[simulation.alpha]\nvelocity_decay = 1.5\n").unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = parse_config("[layout]\nengine = \"x\"\n").unwrap_err();
        assert!(matches!(err, CliError::Config(ConfigError::Parse(_))));
    }

    #[test]
    fn test_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[style]\npadding = 5.0").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.style().padding(), 5.0);

        let missing = load_config(Some("does/not/exist.toml")).unwrap_err();
        assert!(matches!(
            missing,
            CliError::Config(ConfigError::MissingFile(_))
        ));
    }
}
