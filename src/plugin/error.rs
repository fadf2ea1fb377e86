use std::path::PathBuf;

use crate::plugin::identifier::PluginIdentifier;

/// Errors from a single resolution call. Any of them aborts the whole call.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The identifier has no entry in the plugin mapping.
    #[error("plugin {0} is not present in the plugin mapping")]
    UnmappedPlugin(PluginIdentifier),

    /// The identifier is mapped but its primary artifact is not on disk.
    #[error("primary artifact of plugin {identifier} not found at {}", path.display())]
    MissingPluginArtifact {
        identifier: PluginIdentifier,
        path: PathBuf,
    },

    /// The request cannot be resolved to one artifact per identifier.
    #[error("plugin {identifier} is ambiguous: {reason}")]
    AmbiguousPlugin {
        identifier: PluginIdentifier,
        reason: String,
    },

    #[error("failed to {operation} {}: {source}", path.display())]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ResolveError {
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        ResolveError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
