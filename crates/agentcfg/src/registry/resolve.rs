//! Agent name normalization and alias resolution.

use super::error::RegistryError;
use super::types::AgentRegistry;

/// Lowercase and drop everything that is not an ASCII letter or digit.
pub fn normalize_agent_name(name: &str) -> String {
    name.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Resolve a user-supplied agent name or alias to its registry id.
pub fn resolve_agent_id(name: &str, registry: &AgentRegistry) -> Result<String, RegistryError> {
    let normalized = normalize_agent_name(name);
    if normalized.is_empty() {
        return Err(RegistryError::MissingAgentName);
    }
    for agent in &registry.agents {
        if normalize_agent_name(&agent.agent_id) == normalized
            || agent
                .aliases
                .iter()
                .any(|alias| normalize_agent_name(alias) == normalized)
        {
            return Ok(agent.agent_id.clone());
        }
    }
    let mut supported: Vec<String> = registry.agent_ids().map(|s| s.to_string()).collect();
    supported.sort();
    Err(RegistryError::UnknownAgent {
        name: name.to_string(),
        supported,
    })
}
