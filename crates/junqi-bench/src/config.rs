use junqi_core::model::Faction;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DEFAULT_MAX_MOVES: usize = 120;
const DEFAULT_SAMPLES_PER_MOVE: usize = 4;
const MAX_SAMPLES_PER_MOVE: usize = 64;
const NAME_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root harness configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub games: GamesConfig,
    #[serde(default = "default_observer")]
    pub observer: Faction,
    pub profiles: Vec<ProfileConfig>,
    /// Directory for every artifact; `{run_id}` is substituted.
    pub output_dir: String,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|source| ConfigError::Read {
            source,
            path: path.clone(),
        })?;
        let cfg: BenchmarkConfig =
            serde_yaml::from_reader(BufReader::new(file)).map_err(|source| {
                ConfigError::Parse {
                    source,
                    path: path.clone(),
                }
            })?;
        cfg.validate()
            .map_err(|source| ConfigError::Invalid { path, source })?;
        Ok(cfg)
    }

    /// Checks the configuration without touching the filesystem.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("run_id", &self.run_id)?;
        self.games.validate()?;
        if !matches!(self.observer, Faction::Red | Faction::Green) {
            return Err(ValidationError::InvalidField {
                field: "observer".to_string(),
                message: format!(
                    "games are played Red against Green; '{}' does not take part",
                    self.observer
                ),
            });
        }
        if self.output_dir.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "output_dir".to_string(),
                message: "path must not be empty".to_string(),
            });
        }
        validate_profiles(&self.profiles)?;
        self.metrics.validate(&self.profiles)
    }

    /// Artifact paths under the resolved output directory.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        let dir = PathBuf::from(self.output_dir.replace("{run_id}", &self.run_id));
        ResolvedOutputs {
            jsonl: dir.join("games.jsonl"),
            summary_md: dir.join("summary.md"),
            plots_dir: dir.join("plots"),
            telemetry: dir.join("telemetry.jsonl"),
            dir,
        }
    }

    /// The faction playing against the observer.
    pub fn opponent(&self) -> Faction {
        match self.observer {
            Faction::Red => Faction::Green,
            _ => Faction::Red,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GamesConfig {
    pub seed: Option<u64>,
    pub count: usize,
    #[serde(default = "default_max_moves")]
    pub max_moves: usize,
}

impl GamesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "games.count".to_string(),
                message: "number of games must be greater than zero".to_string(),
            });
        }
        if self.max_moves == 0 {
            return Err(ValidationError::InvalidField {
                field: "games.max_moves".to_string(),
                message: "move cap must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn default_max_moves() -> usize {
    DEFAULT_MAX_MOVES
}

fn default_observer() -> Faction {
    Faction::Red
}

/// A named set of belief engine parameters evaluated side by side.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProfileConfig {
    pub name: String,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MetricsConfig {
    #[serde(default)]
    pub baseline: Option<String>,
    #[serde(default = "default_samples_per_move")]
    pub samples_per_move: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            baseline: None,
            samples_per_move: DEFAULT_SAMPLES_PER_MOVE,
        }
    }
}

impl MetricsConfig {
    fn validate(&self, profiles: &[ProfileConfig]) -> Result<(), ValidationError> {
        let Some(baseline) = self.baseline.as_ref() else {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: "baseline profile must be named".to_string(),
            });
        };
        if !profiles.iter().any(|p| &p.name == baseline) {
            return Err(ValidationError::InvalidField {
                field: "metrics.baseline".to_string(),
                message: format!("baseline profile '{baseline}' is not defined in profiles list"),
            });
        }
        if self.samples_per_move > MAX_SAMPLES_PER_MOVE {
            return Err(ValidationError::InvalidField {
                field: "metrics.samples_per_move".to_string(),
                message: format!("at most {MAX_SAMPLES_PER_MOVE} samples per move are supported"),
            });
        }
        Ok(())
    }
}

fn default_samples_per_move() -> usize {
    DEFAULT_SAMPLES_PER_MOVE
}

/// Structured JSON logging is off unless requested.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub structured: bool,
    #[serde(default)]
    pub level: LogLevel,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Run ids and profile names end up in paths and table rows.
fn validate_name(field: &str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: field.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    if !name.chars().all(|c| NAME_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: field.to_string(),
            message: "may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }
    Ok(())
}

fn validate_profiles(profiles: &[ProfileConfig]) -> Result<(), ValidationError> {
    if profiles.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "profiles".to_string(),
            message: "at least one profile is required".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for profile in profiles {
        validate_name("profiles.name", &profile.name)?;
        if !seen.insert(profile.name.as_str()) {
            return Err(ValidationError::InvalidField {
                field: "profiles".to_string(),
                message: format!("profile name '{}' defined more than once", profile.name),
            });
        }
    }
    Ok(())
}

/// Concrete artifact locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub dir: PathBuf,
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
    pub telemetry: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
