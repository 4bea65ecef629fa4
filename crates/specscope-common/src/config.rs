//! TOML configuration.
//!
//! Every field of the `*Input` structs is optional; `resolve()` fills in
//! defaults and validates.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Result, SpecscopeError};
use crate::labeling::ThresholdPolicy;
use crate::model::ForestParams;

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigInput {
    pub version: u32,
    pub monitor: MonitorConfigInput,
    pub simulator: SimulatorConfigInput,
    pub model: ModelConfigInput,
    pub training: TrainingConfigInput,
    pub server: ServerConfigInput,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MonitorConfigInput {
    pub threshold_dbm: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimulatorConfigInput {
    pub command: Vec<String>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelConfigInput {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrainingConfigInput {
    pub data: Option<PathBuf>,
    pub n_estimators: Option<usize>,
    pub max_depth: Option<usize>,
    pub seed: Option<u64>,
    pub test_fraction: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfigInput {
    pub listen: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// External simulator command line; empty means the built-in
    /// `simulate` subcommand.
    pub command: Vec<String>,
    pub output: PathBuf,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            output: PathBuf::from("simulated_output.json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub data: PathBuf,
    pub forest: ForestParams,
    pub test_fraction: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            data: PathBuf::from("rf_data.json"),
            forest: ForestParams::default(),
            test_fraction: 0.2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpecscopeConfig {
    pub version: u32,
    pub monitor: ThresholdPolicy,
    pub simulator: SimulatorConfig,
    pub model_path: PathBuf,
    pub training: TrainingConfig,
    pub listen: SocketAddr,
}

pub const DEFAULT_MODEL_PATH: &str = "rf_model.json";
pub const DEFAULT_LISTEN: &str = "0.0.0.0:8000";

fn parse_listen(value: &str) -> Result<SocketAddr> {
    value
        .trim()
        .parse()
        .map_err(|e| SpecscopeError::Config(format!("invalid listen address {value:?}: {e}")))
}

impl Default for SpecscopeConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            monitor: ThresholdPolicy::default(),
            simulator: SimulatorConfig::default(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            training: TrainingConfig::default(),
            listen: SocketAddr::from(([0, 0, 0, 0], 8000)),
        }
    }
}

impl ConfigInput {
    pub fn resolve(self) -> Result<SpecscopeConfig> {
        let version = if self.version == 0 {
            CONFIG_VERSION
        } else {
            self.version
        };
        if version != CONFIG_VERSION {
            return Err(SpecscopeError::Config(format!(
                "unsupported config version {version}"
            )));
        }

        let defaults = SpecscopeConfig::default();

        let threshold = self
            .monitor
            .threshold_dbm
            .unwrap_or(defaults.monitor.threshold_dbm);
        if !threshold.is_finite() {
            return Err(SpecscopeError::Config("monitor.threshold_dbm must be finite".into()));
        }

        let command: Vec<String> = self
            .simulator
            .command
            .into_iter()
            .map(|arg| arg.trim().to_string())
            .filter(|arg| !arg.is_empty())
            .collect();

        let forest_defaults = defaults.training.forest;
        let n_estimators = self.training.n_estimators.unwrap_or(forest_defaults.n_estimators);
        if n_estimators == 0 {
            return Err(SpecscopeError::Config("training.n_estimators must be positive".into()));
        }
        let max_depth = self.training.max_depth.unwrap_or(forest_defaults.max_depth).max(1);
        let test_fraction = self
            .training
            .test_fraction
            .unwrap_or(defaults.training.test_fraction);
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(SpecscopeError::Config(format!(
                "training.test_fraction must be in (0, 1), got {test_fraction}"
            )));
        }

        let listen = match self.server.listen {
            Some(listen) => parse_listen(&listen)?,
            None => defaults.listen,
        };

        Ok(SpecscopeConfig {
            version,
            monitor: ThresholdPolicy::new(threshold),
            simulator: SimulatorConfig {
                command,
                output: self.simulator.output.unwrap_or(defaults.simulator.output),
            },
            model_path: self.model.path.unwrap_or(defaults.model_path),
            training: TrainingConfig {
                data: self.training.data.unwrap_or(defaults.training.data),
                forest: ForestParams {
                    n_estimators,
                    max_depth,
                    seed: self.training.seed.unwrap_or(forest_defaults.seed),
                    ..forest_defaults
                },
                test_fraction,
            },
            listen,
        })
    }
}

impl SpecscopeConfig {
    pub fn from_toml_str(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(SpecscopeConfig::default());
        }
        let parsed: ConfigInput = toml::from_str(input)
            .map_err(|e| SpecscopeError::Config(format!("invalid config TOML: {e}")))?;
        parsed.resolve()
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(SpecscopeError::MissingFile(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|e| SpecscopeError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Load `path` if given, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Apply the server's environment overrides (`LISTEN_ADDR`, `MODEL_PATH`).
    pub fn apply_env(
        &mut self,
        listen_addr: Option<String>,
        model_path: Option<String>,
    ) -> Result<()> {
        if let Some(listen) = listen_addr.filter(|v| !v.trim().is_empty()) {
            self.listen = parse_listen(&listen)?;
        }
        if let Some(path) = model_path.filter(|v| !v.trim().is_empty()) {
            self.model_path = PathBuf::from(path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_defaults() {
        let cfg = SpecscopeConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.monitor.threshold_dbm, -10.0);
        assert!(cfg.simulator.command.is_empty());
        assert_eq!(cfg.simulator.output, PathBuf::from("simulated_output.json"));
        assert_eq!(cfg.model_path, PathBuf::from(DEFAULT_MODEL_PATH));
        assert_eq!(cfg.training.data, PathBuf::from("rf_data.json"));
        assert_eq!(cfg.training.forest.n_estimators, 100);
        assert_eq!(cfg.training.forest.seed, 42);
        assert_eq!(cfg.training.test_fraction, 0.2);
        assert_eq!(cfg.listen.to_string(), DEFAULT_LISTEN);
    }

    #[test]
    fn parses_every_section() {
        let cfg = SpecscopeConfig::from_toml_str(
            r#"
            version = 1

            [monitor]
            threshold_dbm = -25.5

            [simulator]
            command = ["go", "run", " simulate.go "]
            output = "/tmp/sim.json"

            [model]
            path = "models/rf.json"

            [training]
            data = "train.json"
            n_estimators = 25
            max_depth = 8
            seed = 7
            test_fraction = 0.3

            [server]
            listen = "127.0.0.1:9000"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.monitor.threshold_dbm, -25.5);
        assert_eq!(cfg.simulator.command, vec!["go", "run", "simulate.go"]);
        assert_eq!(cfg.model_path, PathBuf::from("models/rf.json"));
        assert_eq!(cfg.training.forest.n_estimators, 25);
        assert_eq!(cfg.training.forest.max_depth, 8);
        assert_eq!(cfg.training.forest.seed, 7);
        assert_eq!(cfg.training.test_fraction, 0.3);
        assert_eq!(cfg.listen.port(), 9000);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(SpecscopeConfig::from_toml_str("version = 2").is_err());
        assert!(SpecscopeConfig::from_toml_str("[training]\nn_estimators = 0").is_err());
        assert!(SpecscopeConfig::from_toml_str("[training]\ntest_fraction = 1.0").is_err());
        assert!(SpecscopeConfig::from_toml_str("[server]\nlisten = \"nowhere\"").is_err());
        assert!(SpecscopeConfig::from_toml_str("monitor = 3").is_err());
    }

    #[test]
    fn env_overrides() {
        let mut cfg = SpecscopeConfig::default();
        cfg.apply_env(Some("127.0.0.1:8123".into()), Some("/srv/model.json".into()))
            .unwrap();
        assert_eq!(cfg.listen.port(), 8123);
        assert_eq!(cfg.model_path, PathBuf::from("/srv/model.json"));

        cfg.apply_env(Some(String::new()), None).unwrap();
        assert_eq!(cfg.listen.port(), 8123);
        assert!(cfg.apply_env(Some("bad".into()), None).is_err());
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            SpecscopeConfig::load(Path::new("/nonexistent/specscope.toml")),
            Err(SpecscopeError::MissingFile(_))
        ));
        assert!(SpecscopeConfig::load_or_default(None).is_ok());
    }
}
