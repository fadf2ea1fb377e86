pub mod artifact;
pub mod error;
pub mod fs;
pub mod identifier;
pub mod layout;
pub mod mapping;
pub mod resolver;

pub use artifact::ArtifactLocation;
pub use error::ResolveError;
pub use identifier::{PluginIdentifier, PluginType};
pub use layout::PluginLocationConvention;
pub use mapping::{MappingError, PluginMapping};
pub use resolver::PluginDependencyResolver;
