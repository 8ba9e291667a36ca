//! TOML configuration deserialisation for propagation jobs.

use anyhow::Context;
use serde::Deserialize;

use fresnel_core::propagation::RegimeSelection;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub grid: GridConfig,
    pub source: SourceConfig,
    pub propagation: PropagationConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Sampling of the input (and output) plane.
#[derive(Debug, Deserialize)]
pub struct GridConfig {
    /// Samples along x and y.
    pub dims: [usize; 2],
    /// Physical size along x and y.
    pub extent: [f64; 2],
}

/// Field in the input plane.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Uniformly illuminated circular hole.
    CircularAperture { diameter: f64 },
    /// Gaussian beam waist; `diameter` is the 1/e² intensity diameter.
    Gaussian { diameter: f64 },
}

/// Propagation parameters from TOML.
#[derive(Debug, Deserialize)]
pub struct PropagationConfig {
    pub wavelength: f64,
    pub distance: f64,
    #[serde(default = "default_refractive_index")]
    pub refractive_index: f64,
    #[serde(default = "default_num_oversampling")]
    pub num_oversampling: usize,
    #[serde(default)]
    pub regime: RegimeConfig,
}

fn default_refractive_index() -> f64 {
    1.0
}
fn default_num_oversampling() -> usize {
    2
}

/// Regime choice: "auto", "near" or "far".
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RegimeConfig {
    #[default]
    Auto,
    Near,
    Far,
}

impl From<RegimeConfig> for RegimeSelection {
    fn from(regime: RegimeConfig) -> Self {
        match regime {
            RegimeConfig::Auto => RegimeSelection::Auto,
            RegimeConfig::Near => RegimeSelection::NearField,
            RegimeConfig::Far => RegimeSelection::FarField,
        }
    }
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Output directory (default: "./output").
    #[serde(default = "default_output_dir")]
    pub directory: String,
    /// Whether to save the output intensity as CSV (default: true).
    #[serde(default = "default_true")]
    pub save_intensity: bool,
    /// Whether to also save a JSON run summary (default: false).
    #[serde(default)]
    pub save_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            save_intensity: true,
            save_json: false,
        }
    }
}

fn default_output_dir() -> String {
    "./output".into()
}
fn default_true() -> bool {
    true
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: JobConfig =
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(config)
}
