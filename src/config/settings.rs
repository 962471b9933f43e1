//! Runtime settings loaded from the environment.
//!
//! Settings are read from `SOLUTION_*` environment variables, optionally
//! seeded from a `.env` file next to the plan document.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{ConfigError, Result, SolutionError};

/// Default engine request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default duplicate threshold: the second occurrence of a name is rejected.
pub const DEFAULT_DUPLICATE_THRESHOLD: u32 = 1;

/// Default state file location, relative to the plan document.
pub const DEFAULT_STATE_FILE: &str = ".solution/state.yaml";

/// What to do when a tracked id no longer exists on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingRemotePolicy {
    /// Strip the ids and create the resource again.
    #[default]
    Recreate,
    /// Abort with an undefined id error.
    Fail,
}

/// Where the state document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateLocation {
    /// A YAML file on disk.
    Local(PathBuf),
    /// An object in an S3 bucket.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Key prefix.
        prefix: Option<String>,
    },
}

/// Settings for talking to the engine and reconciling.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Engine API base URL.
    pub api_url: Option<String>,
    /// Engine API key.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Explicit state location, if configured.
    pub state: Option<StateLocation>,
    /// Seen-count above which a repeated name is rejected.
    pub duplicate_threshold: u32,
    /// Behaviour when a tracked id is gone remotely.
    pub missing_remote: MissingRemotePolicy,
    /// AWS region for the S3 state backend.
    pub s3_region: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            state: None,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            missing_remote: MissingRemotePolicy::Recreate,
            s3_region: None,
        }
    }
}

impl Settings {
    /// Loads settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads settings through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an unusable value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();

        settings.api_url = lookup("SOLUTION_API_URL").map(|u| u.trim_end_matches('/').to_string());
        settings.api_key = lookup("SOLUTION_API_KEY");
        settings.s3_region = lookup("SOLUTION_S3_REGION");

        if let Some(value) = lookup("SOLUTION_TIMEOUT_SECS") {
            settings.timeout_secs = parse_number("SOLUTION_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = lookup("SOLUTION_DUPLICATE_THRESHOLD") {
            let threshold: u32 = parse_number("SOLUTION_DUPLICATE_THRESHOLD", &value)?;
            if threshold == 0 {
                return Err(invalid("SOLUTION_DUPLICATE_THRESHOLD", &value));
            }
            settings.duplicate_threshold = threshold;
        }

        if let Some(value) = lookup("SOLUTION_MISSING_REMOTE") {
            settings.missing_remote = value.parse()?;
        }

        if let Some(value) = lookup("SOLUTION_STATE") {
            debug!("Using state location from environment");
            settings.state = Some(StateLocation::parse(&value));
        }

        Ok(settings)
    }

    /// Overrides the state location, typically from the command line.
    #[must_use]
    pub fn with_state(mut self, location: Option<&str>) -> Self {
        if let Some(location) = location {
            self.state = Some(StateLocation::parse(location));
        }
        self
    }

    /// Resolves the state location, defaulting next to the plan document.
    #[must_use]
    pub fn state_location(&self, plan_path: Option<&Path>) -> StateLocation {
        self.state.clone().unwrap_or_else(|| {
            let base = plan_path
                .and_then(Path::parent)
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            StateLocation::Local(base.join(DEFAULT_STATE_FILE))
        })
    }

    /// Returns the engine URL and key, failing if either is missing.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first missing variable.
    pub fn engine_credentials(&self) -> Result<(&str, &str)> {
        let url = self.api_url.as_deref().ok_or_else(|| missing("SOLUTION_API_URL"))?;
        let key = self.api_key.as_deref().ok_or_else(|| missing("SOLUTION_API_KEY"))?;
        Ok((url, key))
    }
}

/// Loads a `.env` file from `dir` if present.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be loaded.
pub fn load_dotenv(dir: &Path) -> Result<()> {
    let env_path = dir.join(".env");

    if env_path.exists() {
        info!("Loading environment from: {}", env_path.display());
        dotenvy::from_path(&env_path).map_err(|e| {
            SolutionError::Config(ConfigError::ParseError {
                message: format!("Failed to load .env file: {e}"),
                location: Some(env_path.display().to_string()),
            })
        })?;
    } else {
        debug!(".env file not found at: {}", env_path.display());
    }

    Ok(())
}

impl StateLocation {
    /// Parses a path or an `s3://bucket/prefix` URL.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        value.strip_prefix("s3://").map_or_else(
            || Self::Local(PathBuf::from(value)),
            |rest| {
                let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
                Self::S3 {
                    bucket: bucket.to_string(),
                    prefix: Some(prefix.trim_matches('/'))
                        .filter(|p| !p.is_empty())
                        .map(str::to_string),
                }
            },
        )
    }
}

impl FromStr for MissingRemotePolicy {
    type Err = SolutionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recreate" => Ok(Self::Recreate),
            "fail" => Ok(Self::Fail),
            _ => Err(invalid("SOLUTION_MISSING_REMOTE", s)),
        }
    }
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

fn invalid(name: &str, value: &str) -> SolutionError {
    SolutionError::Config(ConfigError::InvalidValue {
        name: name.to_string(),
        value: value.to_string(),
    })
}

fn missing(name: &str) -> SolutionError {
    SolutionError::Config(ConfigError::MissingEnvVar {
        name: name.to_string(),
    })
}
