//! Run configuration.
//!
//! Settings are layered with `figment`, later layers overriding earlier ones:
//!
//! 1. built-in defaults ([`RunConfig::default`])
//! 2. a TOML file: the `--config` path, else `config.toml` in the platform
//!    config directory
//! 3. environment variables prefixed `UA_` (e.g. `UA_ALGORITHM=sha1`)
//! 4. command-line flags
//!
//! The merged result is checked with [`RunConfig::validate`] before any file
//! is touched.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::scanner::hasher::DEFAULT_BUFFER_SIZE;
use crate::scanner::{HashAlgorithm, Hasher, Transform};

/// Prefix of environment variables read by [`RunConfig::load`].
pub const ENV_PREFIX: &str = "UA_";

/// Names accepted for [`HashAlgorithm`], aliases included.
const ALGORITHM_NAMES: [&str; 7] = ["md5", "sha1", "sha256", "b3", "blake3", "xxh64", "xxhash64"];

/// Invalid run configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The hash algorithm name is not recognised.
    #[error("Unknown hash algorithm '{}'{}", .name, suggestion_hint(.suggestion))]
    UnknownAlgorithm {
        /// Name as given
        name: String,
        /// Closest accepted name, if any is close
        suggestion: Option<&'static str>,
    },

    /// Buffer size of zero.
    #[error("Buffer size must be greater than zero")]
    ZeroBufferSize,

    /// Thread count of zero.
    #[error("Thread count must be greater than zero")]
    ZeroThreads,

    /// Two-stage hashing was requested without a byte budget.
    #[error("Two-stage hashing requires a byte budget greater than zero")]
    TwoStageWithoutBudget,

    /// An explicitly named config file does not exist.
    #[error("Config file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// A config source could not be read or parsed.
    #[error("Invalid configuration: {0}")]
    Load(String),
}

fn suggestion_hint(suggestion: &Option<&'static str>) -> String {
    match suggestion {
        Some(name) => format!(" (did you mean '{name}'?)"),
        None => String::new(),
    }
}

impl ConfigError {
    /// Build an [`UnknownAlgorithm`](Self::UnknownAlgorithm) error with the
    /// closest accepted name as suggestion.
    #[must_use]
    pub fn unknown_algorithm(name: &str) -> Self {
        let lowered = name.to_ascii_lowercase();
        let suggestion = ALGORITHM_NAMES
            .iter()
            .map(|candidate| (strsim::levenshtein(&lowered, candidate), *candidate))
            .filter(|(distance, _)| *distance <= 2)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| candidate);
        Self::UnknownAlgorithm {
            name: name.to_string(),
            suggestion,
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ConfigError::unknown_algorithm(s))
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Values set on the command line, layered over every other source.
///
/// Unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigOverrides {
    /// Algorithm name, checked when the layers are merged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,
    /// Fold ASCII letter case before comparing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_case: Option<bool>,
    /// Drop whitespace before comparing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_whitespace: Option<bool>,
    /// Post-transform bytes that count (0 = whole file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub byte_budget: Option<u64>,
    /// Work buffer size in bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<usize>,
    /// Confirm budget-bounded matches against full content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_stage: Option<bool>,
    /// Run prefix milestones before full digests
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<bool>,
    /// Worker threads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Bucket files by size before reading them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_by_size: Option<bool>,
    /// Keep a digest on every class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_digests: Option<bool>,
}

fn default_threads() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Everything that shapes a duplicate search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Digest algorithm for full-content hashing
    pub algorithm: HashAlgorithm,
    /// Fold ASCII letter case before comparing
    pub ignore_case: bool,
    /// Drop whitespace before comparing
    pub ignore_whitespace: bool,
    /// Only the first this many post-transform bytes count (0 = whole file)
    pub byte_budget: u64,
    /// Work buffer size in bytes
    pub buffer_size: usize,
    /// Confirm budget-bounded matches against full content
    pub two_stage: bool,
    /// Run progressive prefix elimination before full digests
    pub milestone: bool,
    /// Worker threads for parallel digesting
    pub threads: usize,
    /// Bucket files by size before comparing
    pub group_by_size: bool,
    /// Every reported class needs its digest
    pub report_digests: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::default(),
            ignore_case: false,
            ignore_whitespace: false,
            byte_budget: 0,
            buffer_size: DEFAULT_BUFFER_SIZE,
            two_stage: false,
            milestone: true,
            threads: default_threads(),
            group_by_size: true,
            report_digests: false,
        }
    }
}

impl RunConfig {
    /// Set the digest algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: HashAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Enable or disable case folding.
    #[must_use]
    pub fn with_ignore_case(mut self, enabled: bool) -> Self {
        self.ignore_case = enabled;
        self
    }

    /// Enable or disable whitespace stripping.
    #[must_use]
    pub fn with_ignore_whitespace(mut self, enabled: bool) -> Self {
        self.ignore_whitespace = enabled;
        self
    }

    /// Set the byte budget (0 = whole file).
    #[must_use]
    pub fn with_byte_budget(mut self, budget: u64) -> Self {
        self.byte_budget = budget;
        self
    }

    /// Set the work buffer size.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Enable or disable two-stage refinement.
    #[must_use]
    pub fn with_two_stage(mut self, enabled: bool) -> Self {
        self.two_stage = enabled;
        self
    }

    /// Enable or disable milestone elimination.
    #[must_use]
    pub fn with_milestone(mut self, enabled: bool) -> Self {
        self.milestone = enabled;
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Enable or disable size bucketing.
    #[must_use]
    pub fn with_group_by_size(mut self, enabled: bool) -> Self {
        self.group_by_size = enabled;
        self
    }

    /// Require digests for every reported class.
    #[must_use]
    pub fn with_report_digests(mut self, enabled: bool) -> Self {
        self.report_digests = enabled;
        self
    }

    /// Check the configuration for values no run can work with.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        if self.threads == 0 {
            return Err(ConfigError::ZeroThreads);
        }
        if self.two_stage && self.byte_budget == 0 {
            return Err(ConfigError::TwoStageWithoutBudget);
        }
        Ok(())
    }

    /// The content transform these settings describe.
    #[must_use]
    pub fn transform(&self) -> Transform {
        Transform::new(self.ignore_case, self.ignore_whitespace)
    }

    /// Hasher for the first (possibly budget-bounded) digest pass.
    #[must_use]
    pub fn hasher(&self) -> Hasher {
        Hasher::new(self.algorithm)
            .with_transform(self.transform())
            .with_byte_budget(self.byte_budget)
            .with_buffer_size(self.buffer_size)
    }

    /// Whether files may be bucketed by size.
    ///
    /// Files of different lengths can still match once whitespace is dropped,
    /// or when only a bounded prefix counts and no full-content pass follows.
    #[must_use]
    pub fn size_grouping_active(&self) -> bool {
        self.group_by_size
            && !self.ignore_whitespace
            && !(self.byte_budget > 0 && !self.two_stage)
    }

    /// Whether the final answer only has to hold within the byte budget.
    #[must_use]
    pub fn budget_is_final(&self) -> bool {
        self.byte_budget > 0 && !self.two_stage
    }

    /// Default location of the config file, if the platform has one.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "ua", "ua").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Layered configuration sources, without command-line overrides.
    ///
    /// `file` replaces the default config file location. `env_prefix`
    /// selects which environment variables are read.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if `file` is given but does not exist.
    pub fn figment(file: Option<&Path>, env_prefix: &str) -> Result<Figment, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        match file {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::MissingFile(path.to_path_buf()));
                }
                log::debug!("Loading config from {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(path) = Self::default_path() {
                    log::trace!("Looking for config at {}", path.display());
                    figment = figment.merge(Toml::file(path));
                }
            }
        }

        Ok(figment.merge(Env::prefixed(env_prefix)))
    }

    /// Extract a configuration from `figment`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] if a source is malformed, or the
    /// [`ConfigError::UnknownAlgorithm`] error for a bad algorithm name.
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(|e| {
            // Surface algorithm typos as themselves rather than a generic load failure.
            let name = figment.find_value("algorithm").ok();
            match name.as_ref().and_then(|v| v.as_str()) {
                Some(name) if HashAlgorithm::from_name(name).is_none() => {
                    ConfigError::unknown_algorithm(name)
                }
                _ => ConfigError::Load(e.to_string()),
            }
        })
    }

    /// Load defaults, config file, `UA_` environment variables and
    /// command-line `overrides`, then validate the result.
    ///
    /// # Errors
    ///
    /// See [`figment`](Self::figment), [`from_figment`](Self::from_figment)
    /// and [`validate`](Self::validate).
    pub fn load(file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        let figment = Self::figment(file, ENV_PREFIX)?.merge(Serialized::defaults(overrides));
        let config = Self::from_figment(&figment)?;
        config.validate()?;
        log::debug!("Effective configuration: {:?}", config);
        Ok(config)
    }
}
