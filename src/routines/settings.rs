use anyhow::{bail, Result};
use config::Config as eConfig;
use serde::Deserialize;
use serde_derive::Serialize;

use crate::algorithms::{Algorithm, StoppingType};
use crate::routines::optimization::line_search::SearchType;
use crate::routines::output::OutputFile;

#[derive(Debug, Deserialize, Clone, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub config: Config,
    #[serde(default)]
    pub convergence: Convergence,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub log: Log,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Config {
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,
    /// Maximum number of iterations. Negative means unbounded.
    #[serde(default = "default_max_iter")]
    pub max_iter: i64,
    /// Starting weights. Defaults to the algorithm's own starting point.
    pub initial_weights: Option<Vec<f64>>,
    #[serde(default = "default_false")]
    pub verbose: bool,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Convergence {
    #[serde(default = "default_stopping")]
    pub stopping: StoppingType,
    #[serde(default = "default_kkt_tol")]
    pub kkt_tol: f64,
    #[serde(default = "default_tol")]
    pub tol: f64,
    #[serde(default = "default_active_set_eps")]
    pub active_set_eps: f64,
    #[serde(default = "default_egd_search")]
    pub egd_search: SearchType,
    /// Iterations a coordinate may stay at the boundary before the working
    /// set is compacted. Negative disables the restart variant.
    #[serde(default = "default_reset_threshold")]
    pub reset_threshold: i64,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Output {
    #[serde(default = "default_true")]
    pub write: bool,
    #[serde(default = "default_output_path")]
    pub path: String,
    /// Record the full weight vector at every iteration.
    #[serde(default = "default_false")]
    pub log_weights: bool,
}

#[derive(Debug, Deserialize, Clone, Serialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            max_iter: default_max_iter(),
            initial_weights: None,
            verbose: false,
        }
    }
}

impl Default for Convergence {
    fn default() -> Self {
        Self {
            stopping: default_stopping(),
            kkt_tol: default_kkt_tol(),
            tol: default_tol(),
            active_set_eps: default_active_set_eps(),
            egd_search: default_egd_search(),
            reset_threshold: default_reset_threshold(),
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self {
            write: true,
            path: default_output_path(),
            log_weights: false,
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.convergence.kkt_tol <= 0.0 {
            bail!("kkt_tol must be positive, got {}", self.convergence.kkt_tol);
        }
        if self.convergence.tol <= 0.0 {
            bail!("tol must be positive, got {}", self.convergence.tol);
        }
        if self.convergence.active_set_eps < 0.0 {
            bail!(
                "active_set_eps must be non-negative, got {}",
                self.convergence.active_set_eps
            );
        }
        if self.config.max_iter == 0 {
            bail!("max_iter must be non-zero; use a negative value for no bound");
        }
        Ok(())
    }

    /// Serializes the settings to `settings.json` in the output folder.
    pub fn write(&self) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        let outputfile = OutputFile::new(&self.output.path, "settings.json")?;
        outputfile.write(serialized.as_bytes())?;
        Ok(())
    }
}

/// Reads settings from a TOML file, with `HULLCORE_`-prefixed environment
/// variables taking precedence.
pub fn read_settings(path: impl AsRef<str>) -> Result<Settings> {
    let parsed = eConfig::builder()
        .add_source(config::File::with_name(path.as_ref()).format(config::FileFormat::Toml))
        .add_source(config::Environment::with_prefix("HULLCORE").separator("_"))
        .build()?;

    let settings: Settings = parsed.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}

// *********************************
// Default values for deserializing
// *********************************
fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_algorithm() -> Algorithm {
    Algorithm::CauchySimplex
}

fn default_max_iter() -> i64 {
    10_000
}

fn default_stopping() -> StoppingType {
    StoppingType::Kkt
}

fn default_kkt_tol() -> f64 {
    1e-3
}

fn default_tol() -> f64 {
    1e-6
}

fn default_active_set_eps() -> f64 {
    1e-10
}

fn default_egd_search() -> SearchType {
    SearchType::Classical
}

fn default_reset_threshold() -> i64 {
    -1
}

fn default_output_path() -> String {
    "output".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
