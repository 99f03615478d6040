use super::types::{AgentArtifact, AgentDefinition, ArtifactKind};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Agents known without any external registry configuration.
pub fn builtin_agents() -> Vec<AgentDefinition> {
    vec![
        AgentDefinition {
            agent_id: "claude".into(),
            display_name: "Claude".into(),
            aliases: strings(&["claude", "claude code", "claude.md", "claude-md"]),
            config_filenames: strings(&["CLAUDE.md"]),
            directory_patterns: Vec::new(),
            precedence_rules: strings(&[
                "A single CLAUDE.md file carries the project instructions.",
            ]),
            artifacts: vec![
                AgentArtifact::new("CLAUDE.md", ArtifactKind::File)
                    .with_description("Single-file Claude instructions."),
            ],
        },
        AgentDefinition {
            agent_id: "codex".into(),
            display_name: "Codex".into(),
            aliases: strings(&["codex", "openai codex", "agents.md", "agents-md"]),
            config_filenames: strings(&["AGENTS.md"]),
            directory_patterns: Vec::new(),
            precedence_rules: strings(&[
                "The root AGENTS.md applies to the whole repository.",
                "A nested AGENTS.md overrides its ancestors for files below its directory.",
            ]),
            artifacts: vec![
                AgentArtifact::new("AGENTS.md", ArtifactKind::File)
                    .with_description("Codex instructions with root and nested overrides."),
            ],
        },
        AgentDefinition {
            agent_id: "gemini".into(),
            display_name: "Gemini".into(),
            aliases: strings(&["gemini", "gemini cli", "gemini.md", "gemini-md"]),
            config_filenames: strings(&["GEMINI.md"]),
            directory_patterns: Vec::new(),
            precedence_rules: strings(&[
                "A single GEMINI.md file carries the project instructions.",
            ]),
            artifacts: vec![
                AgentArtifact::new("GEMINI.md", ArtifactKind::File)
                    .with_description("Single-file Gemini instructions."),
            ],
        },
        AgentDefinition {
            agent_id: "kiro".into(),
            display_name: "Kiro".into(),
            aliases: strings(&["kiro", "kiro cli", "kiro.md", "kiro-md"]),
            config_filenames: Vec::new(),
            directory_patterns: strings(&[".kiro/steering"]),
            precedence_rules: strings(&[
                "Every markdown file under .kiro/steering is loaded as a steering document.",
            ]),
            artifacts: vec![
                AgentArtifact::new(".kiro/steering/*.md", ArtifactKind::Glob)
                    .with_description("Kiro steering bundle markdown files."),
            ],
        },
    ]
}
