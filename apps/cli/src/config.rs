//! CLI configuration
//!
//! Settings are layered, later sources winning:
//! 1. Built-in defaults
//! 2. A TOML file given with `--config`
//! 3. `FERRUM_*` environment variables (`FERRUM_ENCODE__PRETTY=true`)
//! 4. Command-line flags, applied by the caller

use anyhow::Context;
use config::{Config, Environment, File};
use ferrum_context::FhirVersion;
use ferrum_format::{DecodeOptions, EncodeOptions, Format};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub fhir_version: FhirVersion,
    /// Output grammar when `--to` is not given; defaults to the other grammar
    pub output_format: Option<Format>,
    pub encode: EncodeOptions,
    pub decode: DecodeOptions,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level for the ferrum crates unless `RUST_LOG` is set
    pub level: String,
    /// One JSON object per line instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}

impl CliConfig {
    /// Load defaults, then the optional file, then the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix("FERRUM")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("encode.include")
                .with_list_parse_key("encode.exclude")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| match path {
                Some(path) => format!("Failed to read configuration from {}", path.display()),
                None => "Failed to read configuration from the environment".to_string(),
            })?;
        settings
            .try_deserialize()
            .context("Invalid configuration")
    }
}
