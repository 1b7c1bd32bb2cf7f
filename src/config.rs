use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SpannerDbError;

/// Default number of rows returned by `fetch_many(None)`.
pub const DEFAULT_ARRAYSIZE: usize = 10;

const ENV_PROJECT: &str = "SPANNER_PROJECT";
const ENV_INSTANCE: &str = "SPANNER_INSTANCE";
const ENV_DATABASE: &str = "SPANNER_DATABASE";
const ENV_ARRAYSIZE: &str = "SPANNER_ARRAYSIZE";

fn default_arraysize() -> usize {
    DEFAULT_ARRAYSIZE
}

/// Identifiers of the backend database a connection talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpannerOptions {
    pub project: String,
    pub instance: String,
    pub database: String,
    /// Default batch size for cursors created from this connection.
    #[serde(default = "default_arraysize")]
    pub arraysize: usize,
}

impl SpannerOptions {
    #[must_use]
    pub fn new(project: String, instance: String, database: String) -> Self {
        Self {
            project,
            instance,
            database,
            arraysize: DEFAULT_ARRAYSIZE,
        }
    }

    #[must_use]
    pub fn builder(project: String, instance: String, database: String) -> SpannerOptionsBuilder {
        SpannerOptionsBuilder::new(project, instance, database)
    }

    /// Parse options from a JSON document.
    ///
    /// # Errors
    /// Returns `SpannerDbError::Json` for malformed JSON and `SpannerDbError::ConfigError` if an
    /// identifier is empty.
    pub fn from_json_str(json: &str) -> Result<Self, SpannerDbError> {
        let opts: SpannerOptions = serde_json::from_str(json)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Read options from a JSON file.
    ///
    /// # Errors
    /// Returns `SpannerDbError::Io` if the file cannot be read, otherwise see [`Self::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SpannerDbError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Build options from `SPANNER_PROJECT`, `SPANNER_INSTANCE`, `SPANNER_DATABASE` and the
    /// optional `SPANNER_ARRAYSIZE`.
    ///
    /// # Errors
    /// Returns `SpannerDbError::ConfigError` if a required variable is missing or empty, or if
    /// `SPANNER_ARRAYSIZE` is not a positive integer.
    pub fn from_env() -> Result<Self, SpannerDbError> {
        let var = |name: &str| {
            env::var(name).map_err(|_| {
                SpannerDbError::ConfigError(format!("environment variable {name} is not set"))
            })
        };

        let mut opts = SpannerOptions::new(var(ENV_PROJECT)?, var(ENV_INSTANCE)?, var(ENV_DATABASE)?);
        if let Ok(raw) = env::var(ENV_ARRAYSIZE) {
            opts.arraysize = raw.parse().map_err(|_| {
                SpannerDbError::ConfigError(format!("{ENV_ARRAYSIZE} must be an integer, got {raw}"))
            })?;
        }
        opts.validate()?;
        Ok(opts)
    }

    /// Check that every identifier is non-empty and the array size is positive.
    ///
    /// # Errors
    /// Returns `SpannerDbError::ConfigError` naming the first invalid field.
    pub fn validate(&self) -> Result<(), SpannerDbError> {
        for (field, value) in [
            ("project", &self.project),
            ("instance", &self.instance),
            ("database", &self.database),
        ] {
            if value.trim().is_empty() {
                return Err(SpannerDbError::ConfigError(format!("{field} must not be empty")));
            }
        }
        if self.arraysize == 0 {
            return Err(SpannerDbError::ConfigError(
                "arraysize must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for `SpannerOptions`.
#[derive(Debug, Clone)]
pub struct SpannerOptionsBuilder {
    opts: SpannerOptions,
}

impl SpannerOptionsBuilder {
    #[must_use]
    pub fn new(project: String, instance: String, database: String) -> Self {
        Self {
            opts: SpannerOptions::new(project, instance, database),
        }
    }

    #[must_use]
    pub fn arraysize(mut self, arraysize: usize) -> Self {
        self.opts.arraysize = arraysize;
        self
    }

    #[must_use]
    pub fn finish(self) -> SpannerOptions {
        self.opts
    }
}
