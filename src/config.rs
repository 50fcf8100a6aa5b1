//! Configuration for the mock interceptor.
//!
//! Defines the interception mode, fake network delay, and where scenario
//! files are read from.

use crate::interceptor::Mode;
use crate::mapper::{Mapper, ScenarioFormat};
use crate::model::RequestResult;
use crate::policy::{FilingPolicy, MirrorPathPolicy, SingleFilePolicy};
use crate::response::reason_phrase;
use crate::Body;
use http::Request;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the mock interceptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterceptorConfig {
    /// Interception mode
    #[serde(default)]
    pub mode: Mode,

    /// Global fake network delay in milliseconds
    #[serde(default)]
    pub delay_ms: u64,

    /// Directory scenario files are read from
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Scenario file format
    #[serde(default)]
    pub format: ScenarioFormat,

    /// How requests map to scenario files
    #[serde(default)]
    pub policy: PolicyConfig,
}

fn default_root() -> PathBuf {
    PathBuf::from("scenarios")
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            delay_ms: 0,
            root: default_root(),
            format: ScenarioFormat::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl InterceptorConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.root.is_dir() {
            anyhow::bail!("Scenario root is not a directory: {}", self.root.display());
        }
        self.policy.validate()
    }
}

/// Filing policy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PolicyConfig {
    /// `<host><path>.<extension>`
    Mirror {
        #[serde(default = "default_extension")]
        extension: String,
    },
    /// One scenario file for every request
    SingleFile { path: String },
}

fn default_extension() -> String {
    "json".to_string()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig::Mirror {
            extension: default_extension(),
        }
    }
}

impl PolicyConfig {
    /// Validate the policy.
    pub fn validate(&self) -> anyhow::Result<()> {
        match self {
            PolicyConfig::Mirror { extension } if extension.is_empty() => {
                anyhow::bail!("Mirror policy extension cannot be empty")
            }
            PolicyConfig::SingleFile { path } if path.is_empty() => {
                anyhow::bail!("Single file policy path cannot be empty")
            }
            _ => Ok(()),
        }
    }
}

impl FilingPolicy for PolicyConfig {
    fn get_path(&self, request: &Request<Body>) -> String {
        match self {
            PolicyConfig::Mirror { extension } => {
                MirrorPathPolicy::new(extension.as_str()).get_path(request)
            }
            PolicyConfig::SingleFile { path } => SingleFilePolicy::new(path.as_str()).get_path(request),
        }
    }
}

/// Check a scenario file for authoring mistakes.
///
/// Returns one message per problem found; parse failures are errors.
pub fn validate_scenario(content: &[u8], mapper: &dyn Mapper) -> anyhow::Result<Vec<String>> {
    let entries = mapper.read_matches(content)?;
    let mut problems = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        let RequestResult::Response(response) = &entry.result else {
            continue;
        };
        if reason_phrase(response.code).is_none() {
            problems.push(format!("Entry {}: unknown status code {}", i, response.code));
        }
        if response.has_ambiguous_body() {
            problems.push(format!(
                "Entry {}: both body and body-file are set, body-file is used",
                i
            ));
        }
        if response.media_type.is_empty() {
            problems.push(format!("Entry {}: empty media-type", i));
        }
    }

    Ok(problems)
}
