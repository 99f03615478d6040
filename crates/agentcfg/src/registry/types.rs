use std::fmt;

use serde::{Deserialize, Serialize};

/// How an artifact pattern is matched against the workspace tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    File,
    Glob,
    Directory,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::File => "file",
            ArtifactKind::Glob => "glob",
            ArtifactKind::Directory => "directory",
        }
    }

    /// Parse the lowercase kind name used in registry files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "file" => Some(ArtifactKind::File),
            "glob" => Some(ArtifactKind::Glob),
            "directory" => Some(ArtifactKind::Directory),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way an agent's configuration shows up on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentArtifact {
    pub pattern: String,
    pub kind: ArtifactKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Only match at the workspace root.
    #[serde(default, skip_serializing_if = "is_false")]
    pub root_only: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl AgentArtifact {
    pub fn new(pattern: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
            description: None,
            root_only: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn root_only(mut self) -> Self {
        self.root_only = true;
        self
    }
}

/// Static description of a known agent and its config conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub agent_id: String,
    pub display_name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub config_filenames: Vec<String>,
    #[serde(default)]
    pub directory_patterns: Vec<String>,
    #[serde(default)]
    pub precedence_rules: Vec<String>,
    pub artifacts: Vec<AgentArtifact>,
}

/// Ordered set of agent definitions, unique by `agent_id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRegistry {
    pub agents: Vec<AgentDefinition>,
}

impl AgentRegistry {
    pub fn get(&self, agent_id: &str) -> Option<&AgentDefinition> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    pub fn agent_ids(&self) -> impl Iterator<Item = &str> {
        self.agents.iter().map(|a| a.agent_id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_serializes_without_optional_fields() {
        let artifact = AgentArtifact::new("AGENTS.md", ArtifactKind::File);
        let v = serde_json::to_value(&artifact).expect("serialize");
        assert_eq!(v, serde_json::json!({"pattern": "AGENTS.md", "kind": "file"}));
    }

    #[test]
    fn artifact_kind_names_roundtrip() {
        for kind in [ArtifactKind::File, ArtifactKind::Glob, ArtifactKind::Directory] {
            assert_eq!(ArtifactKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ArtifactKind::from_name("symlink"), None);
    }

    #[test]
    fn registry_roundtrips_through_json() {
        let registry = AgentRegistry {
            agents: vec![AgentDefinition {
                agent_id: "x".into(),
                display_name: "X".into(),
                aliases: vec!["ex".into()],
                config_filenames: vec!["X.md".into()],
                directory_patterns: vec![".x".into()],
                precedence_rules: vec!["root wins".into()],
                artifacts: vec![
                    AgentArtifact::new(".x", ArtifactKind::Directory)
                        .with_description("dir")
                        .root_only(),
                ],
            }],
        };
        let s = serde_json::to_string(&registry).expect("serialize");
        let back: AgentRegistry = serde_json::from_str(&s).expect("deserialize");
        assert_eq!(back, registry);
        assert!(back.get("x").is_some());
        assert!(back.get("y").is_none());
    }
}
