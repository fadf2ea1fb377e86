use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::mode::DeployMode;
use crate::plugin::identifier::PluginIdentifier;
use crate::plugin::layout::MAPPING_FILE;

pub const HOME_ENV: &str = "PLUGIN_LOADPATH_HOME";

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub install: InstallConfig,
    #[serde(default)]
    pub plugins: PluginsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstallConfig {
    pub home: String,
    #[serde(default)]
    pub deploy_mode: DeployMode,
    #[serde(default = "default_cluster_root")]
    pub cluster_root: String,
    #[serde(default = "default_mapping_file")]
    pub mapping_file: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginsConfig {
    /// Plugins installed on this host. Used to audit shared dependencies.
    #[serde(default)]
    pub active: Vec<PluginIdentifier>,
}

fn default_cluster_root() -> String {
    ".".to_string()
}

fn default_mapping_file() -> String {
    MAPPING_FILE.to_string()
}

/// Where an install lives. Passed to the resolver explicitly; nothing reads
/// it from process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutConfig {
    pub home: PathBuf,
    pub deploy_mode: DeployMode,
    pub cluster_root: PathBuf,
    /// Relative to [`LayoutConfig::root`] unless absolute.
    pub mapping_file: PathBuf,
}

impl LayoutConfig {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self {
            home: home.into(),
            deploy_mode: DeployMode::Client,
            cluster_root: PathBuf::from("."),
            mapping_file: PathBuf::from(MAPPING_FILE),
        }
    }

    pub fn with_deploy_mode(mut self, deploy_mode: DeployMode) -> Self {
        self.deploy_mode = deploy_mode;
        self
    }

    pub fn with_cluster_root(mut self, cluster_root: impl Into<PathBuf>) -> Self {
        self.cluster_root = cluster_root.into();
        self
    }

    pub fn with_mapping_file(mut self, mapping_file: impl Into<PathBuf>) -> Self {
        self.mapping_file = mapping_file.into();
        self
    }

    /// Install root that `connectors/` and `plugins/` are resolved against.
    pub fn root(&self) -> &Path {
        match self.deploy_mode {
            DeployMode::Client => &self.home,
            DeployMode::Cluster => &self.cluster_root,
        }
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.root().join(&self.mapping_file)
    }
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config → environment.
    pub fn load() -> Result<Self> {
        let user_path = directories::ProjectDirs::from("", "", "plugin-loadpath")
            .map(|dirs| dirs.config_dir().join("config.toml"));
        let env_home = std::env::var(HOME_ENV).ok();

        Self::load_from(user_path.as_deref(), env_home)
    }

    pub fn load_from(user_path: Option<&Path>, env_home: Option<String>) -> Result<Self> {
        let mut config = Self::from_toml(DEFAULTS).context("built-in defaults are invalid")?;

        if let Some(path) = user_path.filter(|path| path.exists()) {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            config = Self::from_toml(&raw)
                .with_context(|| format!("invalid config file {}", path.display()))?;
            tracing::debug!("loaded user config from {}", path.display());
        }

        if let Some(home) = env_home.filter(|home| !home.is_empty()) {
            tracing::debug!("{HOME_ENV} overrides install home with {home}");
            config.install.home = home;
        }

        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Resolve configured paths into an absolute [`LayoutConfig`].
    pub fn layout(&self) -> Result<LayoutConfig> {
        let home = absolute(&self.install.home)?;
        let cluster_root = absolute(&self.install.cluster_root)?;

        Ok(LayoutConfig {
            home,
            deploy_mode: self.install.deploy_mode,
            cluster_root,
            mapping_file: expand_tilde(&self.install.mapping_file)?,
        })
    }
}

fn absolute(path: &str) -> Result<PathBuf> {
    let expanded = expand_tilde(path)?;
    std::path::absolute(&expanded)
        .with_context(|| format!("cannot make {} absolute", expanded.display()))
}

fn expand_tilde(path: &str) -> Result<PathBuf> {
    if !path.starts_with('~') {
        return Ok(PathBuf::from(path));
    }

    let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(PathBuf::from(path.replacen('~', &home.to_string_lossy(), 1)))
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
