//! Errors raised for malformed identifiers or registry schemas.

/// Registry lookup and validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("agent name is required")]
    MissingAgentName,
    #[error("unknown agent '{name}'; supported agents: {}", .supported.join(", "))]
    UnknownAgent { name: String, supported: Vec<String> },
    #[error("invalid registry entry{}: {reason}", agent_suffix(.agent))]
    InvalidDefinition {
        agent: Option<String>,
        reason: String,
    },
}

fn agent_suffix(agent: &Option<String>) -> String {
    match agent {
        Some(id) => format!(" for agent '{}'", id),
        None => String::new(),
    }
}

impl RegistryError {
    pub(crate) fn invalid(agent: Option<&str>, reason: impl Into<String>) -> Self {
        RegistryError::InvalidDefinition {
            agent: agent.map(|s| s.to_string()),
            reason: reason.into(),
        }
    }
}
