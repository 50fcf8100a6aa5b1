//! Scenario file deserializers.

use crate::model::Matcher;
use serde::{Deserialize, Serialize};

/// Parse scenario file content into its ordered entries.
pub trait Mapper: Send + Sync {
    fn read_matches(&self, content: &[u8]) -> anyhow::Result<Vec<Matcher>>;
}

/// JSON scenario files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMapper;

impl Mapper for JsonMapper {
    fn read_matches(&self, content: &[u8]) -> anyhow::Result<Vec<Matcher>> {
        Ok(serde_json::from_slice(content)?)
    }
}

/// YAML scenario files.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlMapper;

impl Mapper for YamlMapper {
    fn read_matches(&self, content: &[u8]) -> anyhow::Result<Vec<Matcher>> {
        Ok(serde_yaml::from_slice(content)?)
    }
}

/// Scenario file format, as named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioFormat {
    #[default]
    Json,
    Yaml,
}

impl ScenarioFormat {
    /// File extension used by the mirror filing policy.
    pub fn extension(self) -> &'static str {
        match self {
            ScenarioFormat::Json => "json",
            ScenarioFormat::Yaml => "yaml",
        }
    }

    pub fn mapper(self) -> Box<dyn Mapper> {
        match self {
            ScenarioFormat::Json => Box::new(JsonMapper),
            ScenarioFormat::Yaml => Box::new(YamlMapper),
        }
    }
}

impl<M: Mapper + ?Sized> Mapper for Box<M> {
    fn read_matches(&self, content: &[u8]) -> anyhow::Result<Vec<Matcher>> {
        (**self).read_matches(content)
    }
}
