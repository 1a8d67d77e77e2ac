use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_PAIR_JUDGE: &str = "PAIR-RESOLVER";
const DEFAULT_PAIRINGS: usize = 4;
const DEFAULT_EXECUTIVES: usize = 3;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root leaderboard run configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RunConfig {
    pub run_id: String,
    pub source: SourceConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub stages: StagesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl RunConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: RunConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.source.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.stages.validate()?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
            plots_dir: resolve_template(&self.run_id, &self.outputs.plots_dir),
        }
    }

    /// Concrete snapshot path, when the run reads one from disk.
    pub fn resolved_snapshot(&self) -> Option<PathBuf> {
        self.source
            .snapshot
            .as_deref()
            .map(|template| resolve_template(&self.run_id, template))
    }
}

/// Where the record snapshot comes from: exactly one of the two fields.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SourceConfig {
    #[serde(default)]
    pub snapshot: Option<String>,
    #[serde(default)]
    pub synthetic: Option<SyntheticConfig>,
}

impl SourceConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match (&self.snapshot, &self.synthetic) {
            (Some(_), Some(_)) => Err(ValidationError::InvalidField {
                field: "source".to_string(),
                message: "set either source.snapshot or source.synthetic, not both".to_string(),
            }),
            (None, None) => Err(ValidationError::InvalidField {
                field: "source".to_string(),
                message: "one of source.snapshot or source.synthetic is required".to_string(),
            }),
            (Some(path), None) if path.trim().is_empty() => Err(ValidationError::InvalidField {
                field: "source.snapshot".to_string(),
                message: "path must not be empty".to_string(),
            }),
            (Some(_), None) => Ok(()),
            (None, Some(synthetic)) => synthetic.validate(),
        }
    }
}

/// Seeded generator parameters.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SyntheticConfig {
    pub seed: u64,
    pub contestants: usize,
    pub judges: usize,
    #[serde(default = "default_pairings")]
    pub pairings: usize,
    #[serde(default = "default_executives")]
    pub executives: usize,
    /// One elimination round per entry, in order.
    #[serde(default = "default_top_limits")]
    pub top_limits: Vec<usize>,
}

impl SyntheticConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (label, value) in [
            ("source.synthetic.contestants", self.contestants),
            ("source.synthetic.judges", self.judges),
            ("source.synthetic.executives", self.executives),
        ] {
            if value == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        if self.pairings * 2 > self.contestants {
            return Err(ValidationError::InvalidField {
                field: "source.synthetic.pairings".to_string(),
                message: format!(
                    "{} pairings need {} contestants but only {} are generated",
                    self.pairings,
                    self.pairings * 2,
                    self.contestants
                ),
            });
        }

        if let Some(position) = self.top_limits.iter().position(|limit| *limit == 0) {
            return Err(ValidationError::InvalidField {
                field: format!("source.synthetic.top_limits[{position}]"),
                message: "top limit must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

fn default_pairings() -> usize {
    DEFAULT_PAIRINGS
}

fn default_executives() -> usize {
    DEFAULT_EXECUTIVES
}

fn default_top_limits() -> Vec<usize> {
    vec![8, 4]
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
    pub plots_dir: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
            ("outputs.plots_dir", &self.plots_dir),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Which write-back side effects the runner performs between stages.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StagesConfig {
    /// Judge id the head-to-head awards are filed under.
    #[serde(default = "default_pair_judge")]
    pub pair_judge: String,
    #[serde(default = "default_true")]
    pub pair_writeback: bool,
    #[serde(default = "default_true")]
    pub composite_writeback: bool,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            pair_judge: default_pair_judge(),
            pair_writeback: true,
            composite_writeback: true,
        }
    }
}

impl StagesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.pair_writeback && self.pair_judge.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "stages.pair_judge".to_string(),
                message: "a judge id is required when pair_writeback is enabled".to_string(),
            });
        }
        Ok(())
    }
}

fn default_pair_judge() -> String {
    DEFAULT_PAIR_JUDGE.to_string()
}

fn default_true() -> bool {
    true
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
    pub plots_dir: PathBuf,
}

/// Errors surfaced when loading configuration files.
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

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
