//! Agent registry: built-in agent definitions, external extensions, and
//! name resolution.

pub mod builtin;
pub mod error;
pub mod extensions;
pub mod resolve;
pub mod types;

use std::path::PathBuf;

pub use error::RegistryError;
pub use extensions::{RegistryProvider, TomlFileProvider};
pub use resolve::{normalize_agent_name, resolve_agent_id};
pub use types::*;

/// Built-in agents merged with extensions from the default providers.
pub fn default_registry() -> AgentRegistry {
    registry_with_config(None)
}

/// Like [`default_registry`] but with an explicit extension config file.
pub fn registry_with_config(config_path: Option<PathBuf>) -> AgentRegistry {
    registry_with_providers(&extensions::default_providers(config_path))
}

/// Built-in agents merged with definitions from `providers`; built-ins win on collision.
pub fn registry_with_providers(providers: &[Box<dyn RegistryProvider>]) -> AgentRegistry {
    let base = builtin::builtin_agents();
    let extra = extensions::load_extensions(providers);
    let agents = extensions::merge_agent_definitions(base, extra);
    tracing::debug!("registry built (agents={})", agents.len());
    AgentRegistry { agents }
}
