//! Declarative mapping rules loaded from configuration
//!
//! Sources are layered with `figment`: built-in defaults, then an optional YAML file, then
//! `PROBLEMS__*` environment variables (nested keys separated by `__`).
//!
//! ```yaml
//! handlers:
//!   - method: POST
//!     path: /users
//!     mappings:
//!       - exception: UsernameTaken
//!         status: 409
//!         type: USERNAME_TAKEN
//!         context: username
//! declared_statuses:
//!   - exception: QuotaExceeded
//!     status: 429
//!     reason: quota exceeded
//! ```

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use problems::ProblemError;
use serde::{Deserialize, Serialize};

/// Prefix of environment variables overriding the configuration.
pub const ENV_PREFIX: &str = "PROBLEMS__";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[source] Box<figment::Error>),

    #[error("unknown error class '{name}'")]
    UnknownClass { name: String },

    #[error("error class '{name}' is already registered")]
    DuplicateClass { name: String },

    #[error("invalid status {status} for '{exception}': expected 4xx or 5xx")]
    InvalidStatus { exception: String, status: u16 },

    #[error("invalid HTTP method '{method}' for handler '{path}'")]
    InvalidMethod { method: String, path: String },

    #[error("invalid problem type for '{exception}'")]
    InvalidProblemType {
        exception: String,
        #[source]
        source: ProblemError,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        Self::Load(Box::new(error))
    }
}

fn default_status() -> u16 {
    400
}

fn default_problem_type() -> String {
    "GENERIC_PROBLEM".to_owned()
}

/// One mapping rule of a handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingConfig {
    /// Error class name, e.g. `ResourceNotFound`.
    pub exception: String,
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(rename = "type", default = "default_problem_type")]
    pub problem_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Mapping rules of one handler, identified by method and route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerConfig {
    pub method: String,
    /// Route pattern as registered with the router, e.g. `/users/{id}`.
    pub path: String,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

/// Status declared for a whole error class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclaredStatusConfig {
    pub exception: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolverConfig {
    pub handlers: Vec<HandlerConfig>,
    pub declared_statuses: Vec<DeclaredStatusConfig>,
}

impl ResolverConfig {
    /// Loads the configuration from defaults, the optional YAML file and the environment.
    ///
    /// # Errors
    /// Returns `ConfigError::Load` if a source cannot be read or does not fit the schema.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "loading problem mappings");
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Parses a YAML document, without consulting the environment.
    ///
    /// # Errors
    /// Returns `ConfigError::Load` if the document does not fit the schema.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::string(yaml))
            .extract()?;
        Ok(config)
    }
}
