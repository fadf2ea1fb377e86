//! Install directory convention.
//!
//! ```text
//! <root>/connectors/<name>.jar          primary artifact
//! <root>/plugins/<name>/*.jar           private dependencies
//! <root>/plugins/<name>/lib/*.jar       private dependencies
//! <root>/plugins/other/*.jar            shared dependencies
//! <root>/plugins/*.jar                  common dependencies
//! <root>/plugins/<bundle>/lib/*.jar     shared library bundles
//! <root>/plugin-mapping.properties
//! ```
//!
//! Everything here is path arithmetic. Nothing checks what exists on disk.

use std::path::{Path, PathBuf};

use crate::plugin::error::ResolveError;
use crate::plugin::identifier::PluginIdentifier;
use crate::plugin::mapping::PluginMapping;

pub const CONNECTORS_DIR: &str = "connectors";
pub const PLUGINS_DIR: &str = "plugins";
pub const SHARED_DIR: &str = "other";
pub const LIB_DIR: &str = "lib";
pub const MAPPING_FILE: &str = "plugin-mapping.properties";
pub const ARTIFACT_EXTENSION: &str = "jar";

#[derive(Debug, Clone, Default)]
pub struct PluginLocationConvention {
    mapping: PluginMapping,
}

impl PluginLocationConvention {
    pub fn new(mapping: PluginMapping) -> Self {
        Self { mapping }
    }

    pub fn mapping(&self) -> &PluginMapping {
        &self.mapping
    }

    pub fn install_name(&self, identifier: &PluginIdentifier) -> Result<&str, ResolveError> {
        self.mapping
            .install_name(identifier)
            .ok_or_else(|| ResolveError::UnmappedPlugin(identifier.clone()))
    }

    pub fn primary_artifact_path(
        &self,
        identifier: &PluginIdentifier,
        root: &Path,
    ) -> Result<PathBuf, ResolveError> {
        let name = self.install_name(identifier)?;
        Ok(connectors_dir(root).join(artifact_file_name(name)))
    }

    pub fn private_dependency_directories(
        &self,
        identifier: &PluginIdentifier,
        root: &Path,
    ) -> Result<[PathBuf; 2], ResolveError> {
        let name = self.install_name(identifier)?;
        let dir = plugins_dir(root).join(name);
        let lib = dir.join(LIB_DIR);
        Ok([dir, lib])
    }
}

pub fn connectors_dir(root: &Path) -> PathBuf {
    root.join(CONNECTORS_DIR)
}

pub fn plugins_dir(root: &Path) -> PathBuf {
    root.join(PLUGINS_DIR)
}

pub fn shared_dependency_directories(root: &Path) -> [PathBuf; 1] {
    [plugins_dir(root).join(SHARED_DIR)]
}

/// Directory whose direct `.jar` children form the common dependency glob
/// `plugins/*.jar`.
pub fn common_dependency_files(root: &Path) -> PathBuf {
    plugins_dir(root)
}

pub fn bundle_library_directory(root: &Path, bundle: impl AsRef<Path>) -> PathBuf {
    plugins_dir(root).join(bundle).join(LIB_DIR)
}

pub fn mapping_file(root: &Path) -> PathBuf {
    root.join(MAPPING_FILE)
}

pub fn artifact_file_name(install_name: &str) -> String {
    format!("{install_name}.{ARTIFACT_EXTENSION}")
}

pub fn is_artifact(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension == ARTIFACT_EXTENSION)
}

/// Whether `file_name` in `connectors/` could be the primary artifact of
/// `install_name`: any archive whose name starts with it. That covers the exact
/// `connector-http.jar`, versioned builds such as `connector-http-2.3.4.jar`,
/// and also `connector-http-jira.jar`, so one install name that prefixes
/// another is caught as ambiguous rather than silently picking one.
pub fn is_primary_candidate(file_name: &str, install_name: &str) -> bool {
    file_name.starts_with(install_name) && is_artifact(Path::new(file_name))
}
