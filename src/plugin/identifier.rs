use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// The role a plugin plays inside a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginType {
    Source,
    Sink,
    Transform,
}

impl PluginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginType::Source => "source",
            PluginType::Sink => "sink",
            PluginType::Transform => "transform",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PluginType {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" => Ok(PluginType::Source),
            "sink" => Ok(PluginType::Sink),
            "transform" => Ok(PluginType::Transform),
            _ => Err(IdentifierParseError::UnknownType(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierParseError {
    #[error("expected <engine>.<type>.<name>, got {0:?}")]
    Malformed(String),
    #[error("unknown plugin type {0:?} (expected source, sink or transform)")]
    UnknownType(String),
}

/// Names one logical plugin: which engine it runs on, its role and its name.
///
/// The engine is stored lowercase; the plugin name keeps its case because the
/// mapping table is keyed on it verbatim (`seatunnel.source.Jdbc`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub struct PluginIdentifier {
    engine: String,
    plugin_type: PluginType,
    plugin_name: String,
}

impl PluginIdentifier {
    pub fn new(
        engine: impl AsRef<str>,
        plugin_type: PluginType,
        plugin_name: impl Into<String>,
    ) -> Self {
        Self {
            engine: engine.as_ref().to_ascii_lowercase(),
            plugin_type,
            plugin_name: plugin_name.into(),
        }
    }

    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn plugin_type(&self) -> PluginType {
        self.plugin_type
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Key used in `plugin-mapping.properties`.
    pub fn mapping_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PluginIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.engine, self.plugin_type, self.plugin_name)
    }
}

impl FromStr for PluginIdentifier {
    type Err = IdentifierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().splitn(3, '.');
        let (engine, plugin_type, name) = match (parts.next(), parts.next(), parts.next()) {
            (Some(engine), Some(plugin_type), Some(name))
                if !engine.is_empty() && !name.is_empty() =>
            {
                (engine, plugin_type, name)
            }
            _ => return Err(IdentifierParseError::Malformed(s.to_string())),
        };

        Ok(Self::new(engine, plugin_type.parse()?, name))
    }
}

impl TryFrom<String> for PluginIdentifier {
    type Error = IdentifierParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
