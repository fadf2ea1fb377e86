use serde::Deserialize;

/// Where the job runs, which decides the install root plugins resolve under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DeployMode {
    /// Submitting from an installation: resolve under the install home.
    #[default]
    Client,
    /// Running inside a cluster container: resolve under the directory the
    /// job's files were shipped into.
    Cluster,
}

impl DeployMode {
    pub fn label(&self) -> &'static str {
        match self {
            DeployMode::Client => "client",
            DeployMode::Cluster => "cluster",
        }
    }
}
