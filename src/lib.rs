//! Resolve connector plugins to the archives a class loader needs.
//!
//! Nothing here reads a per-artifact manifest. Where an artifact lives is
//! decided by the install layout alone:
//!
//! - `connectors/<name>.jar` is the plugin itself,
//! - `plugins/<name>/` and `plugins/<name>/lib/` hold its private dependencies,
//! - `plugins/other/`, `plugins/*.jar` and unmapped `plugins/<bundle>/lib/`
//!   hold dependencies shared by every plugin.
//!
//! `<name>` comes from `plugin-mapping.properties`, which maps
//! `engine.type.name` identifiers to install names.
//!
//! ```no_run
//! use plugin_loadpath::model::config::LayoutConfig;
//! use plugin_loadpath::plugin::{PluginDependencyResolver, PluginIdentifier};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = PluginDependencyResolver::open(&LayoutConfig::new("/opt/seatunnel"))?;
//! let jdbc: PluginIdentifier = "seatunnel.source.Jdbc".parse()?;
//! for artifact in resolver.plugin_jar_and_dependency_paths(&[jdbc])? {
//!     println!("{}", artifact.to_url());
//! }
//! # Ok(())
//! # }
//! ```

pub mod model;
pub mod plugin;
