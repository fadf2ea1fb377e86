use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::plugin::identifier::PluginIdentifier;

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("failed to read plugin mapping {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed plugin mapping entry on line {line}: {content:?}")]
    Malformed { line: usize, content: String },
}

/// `engine.type.name → install name` table read from `plugin-mapping.properties`.
///
/// The install name is both the primary artifact stem under `connectors/` and
/// the private dependency directory under `plugins/`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginMapping {
    entries: BTreeMap<String, String>,
}

impl PluginMapping {
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let raw = fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mapping = Self::parse(&raw)?;
        tracing::debug!(
            "loaded {} plugin mappings from {}",
            mapping.len(),
            path.display()
        );
        Ok(mapping)
    }

    /// Parse property-style `key=value` lines. `#` and `!` start comments,
    /// `:` is accepted as a separator, and a repeated key keeps the last value.
    pub fn parse(raw: &str) -> Result<Self, MappingError> {
        let mut entries = BTreeMap::new();

        for (index, line) in raw.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }

            let malformed = || MappingError::Malformed {
                line: index + 1,
                content: line.to_string(),
            };

            let split_at = trimmed.find(['=', ':']).ok_or_else(malformed)?;
            let key = trimmed[..split_at].trim();
            let value = trimmed[split_at + 1..].trim();
            if key.is_empty() || value.is_empty() {
                return Err(malformed());
            }

            entries.insert(key.to_string(), value.to_string());
        }

        Ok(Self { entries })
    }

    pub fn install_name(&self, identifier: &PluginIdentifier) -> Option<&str> {
        self.entries
            .get(&identifier.mapping_key())
            .map(String::as_str)
    }

    /// Every distinct install name, regardless of engine or plugin type.
    pub fn install_names(&self) -> BTreeSet<&str> {
        self.entries.values().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(PluginIdentifier, String)> for PluginMapping {
    fn from_iter<T: IntoIterator<Item = (PluginIdentifier, String)>>(iter: T) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(identifier, name)| (identifier.mapping_key(), name))
                .collect(),
        }
    }
}
