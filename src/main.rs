use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plugin_loadpath::model::config::AppConfig;
use plugin_loadpath::model::mode::DeployMode;
use plugin_loadpath::plugin::{ArtifactLocation, PluginDependencyResolver, PluginIdentifier};

/// Resolve connector plugins to the archives a loader needs
#[derive(Parser)]
#[command(name = "plugin-loadpath")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Install home (overrides config and PLUGIN_LOADPATH_HOME)
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Deploy mode deciding the install root
    #[arg(long, global = true, value_enum)]
    mode: Option<DeployMode>,

    /// Plugin mapping file, relative to the install root unless absolute
    #[arg(long, global = true)]
    mapping: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print primary, private and shared artifacts, sorted
    Resolve {
        /// Plugins as engine.type.name, e.g. seatunnel.source.Jdbc
        #[arg(required = true)]
        plugins: Vec<PluginIdentifier>,
    },

    /// Print the primary artifact of each plugin, in request order
    Primary {
        #[arg(required = true)]
        plugins: Vec<PluginIdentifier>,
    },

    /// Print shared artifacts that no active plugin vendors itself
    Unused {
        /// Active plugins; defaults to [plugins] active from the config
        plugins: Vec<PluginIdentifier>,
    },

    /// Report mapped plugins without a plugins/<name> directory
    Check,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("plugin_loadpath=info")),
        )
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("plugin-loadpath error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::load()?;
    let mut layout = config.layout()?;

    if let Some(home) = cli.home {
        layout.home = std::path::absolute(&home)
            .with_context(|| format!("cannot make {} absolute", home.display()))?;
    }
    if let Some(mode) = cli.mode {
        layout.deploy_mode = mode;
    }
    if let Some(mapping) = cli.mapping {
        layout.mapping_file = mapping;
    }

    tracing::info!(
        "resolving under {} ({} mode)",
        layout.root().display(),
        layout.deploy_mode.label()
    );

    let resolver = PluginDependencyResolver::open(&layout)?;

    match cli.command {
        Commands::Resolve { plugins } => {
            print_artifacts(&resolver.plugin_jar_and_dependency_paths(&plugins)?);
        }
        Commands::Primary { plugins } => {
            print_artifacts(&resolver.primary_artifacts(&plugins)?);
        }
        Commands::Unused { plugins } => {
            let active = if plugins.is_empty() {
                config.plugins.active
            } else {
                plugins
            };
            if active.is_empty() {
                bail!("no active plugins given and none configured under [plugins] active");
            }
            print_artifacts(&resolver.unused_shared_dependencies(&active)?);
        }
        Commands::Check => {
            let missing = resolver.missing_dependency_directories()?;
            if !missing.is_empty() {
                for dir in &missing {
                    println!("missing: {}", dir.display());
                }
                tracing::warn!("{} plugin directories missing", missing.len());
                return Ok(ExitCode::FAILURE);
            }
            tracing::info!(
                "all {} mapped plugin directories present",
                resolver.convention().mapping().install_names().len()
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn print_artifacts(artifacts: &[ArtifactLocation]) {
    for artifact in artifacts {
        println!("{}", artifact.to_url());
    }
}
