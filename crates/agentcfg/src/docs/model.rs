//! Normalized per-agent documentation model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::extract::{DocEvidence, DocExtractInputs};

/// A distinct value and every piece of evidence that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocValueGroup {
    pub value: String,
    pub evidence: Vec<DocEvidence>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocModelWarning {
    NoConfigFilenamesDetected,
    DocVersionsMixed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDocModel {
    pub agent_id: String,
    pub agent_name: String,
    pub config_files: Vec<DocValueGroup>,
    pub config_globs: Vec<DocValueGroup>,
    pub config_directories: Vec<DocValueGroup>,
    pub structural_expectations: Vec<DocValueGroup>,
    pub constraints: Vec<DocValueGroup>,
    pub examples: Vec<DocValueGroup>,
    pub versions: Vec<String>,
    pub warnings: Vec<DocModelWarning>,
}

#[derive(Default)]
struct Grouper {
    groups: Vec<DocValueGroup>,
    index: HashMap<String, usize>,
}

impl Grouper {
    fn push(&mut self, value: &str, evidence: DocEvidence) {
        match self.index.get(value) {
            Some(&i) => self.groups[i].evidence.push(evidence),
            None => {
                self.index.insert(value.to_string(), self.groups.len());
                self.groups.push(DocValueGroup {
                    value: value.to_string(),
                    evidence: vec![evidence],
                });
            }
        }
    }

    fn finish(self) -> Vec<DocValueGroup> {
        self.groups
    }
}

fn group_by_value(items: &[DocEvidence]) -> Vec<DocValueGroup> {
    let mut grouper = Grouper::default();
    for item in items {
        let value = item.value.trim();
        if !value.is_empty() {
            grouper.push(value, item.clone());
        }
    }
    grouper.finish()
}

fn is_glob(value: &str) -> bool {
    value.contains('*') || value.contains('?')
}

/// Directory part of a `/`-separated path, or `None` for bare names.
fn parent_directory(value: &str) -> Option<&str> {
    let head = &value[..=value.rfind('/')?];
    let head = if head.chars().all(|c| c == '/') {
        head
    } else {
        head.trim_end_matches('/')
    };
    (!head.is_empty() && head != ".").then_some(head)
}

fn collect_versions<'a>(groups: impl IntoIterator<Item = &'a DocValueGroup>) -> Vec<String> {
    let mut versions: Vec<String> = Vec::new();
    for group in groups {
        for evidence in &group.evidence {
            if let Some(v) = evidence.version.as_deref()
                && !v.is_empty()
                && !versions.iter().any(|seen| seen == v)
            {
                versions.push(v.to_string());
            }
        }
    }
    versions
}

/// Fold extracted evidence into a per-agent model.
pub fn normalize_doc_inputs(
    agent_id: &str,
    agent_name: &str,
    inputs: &DocExtractInputs,
) -> AgentDocModel {
    let mut files = Grouper::default();
    let mut globs = Grouper::default();
    for evidence in &inputs.filenames {
        let value = evidence.value.trim();
        if value.is_empty() {
            continue;
        }
        if is_glob(value) {
            globs.push(value, evidence.clone());
        } else {
            files.push(value, evidence.clone());
        }
    }
    let config_files = files.finish();
    let config_globs = globs.finish();

    let mut dirs = Grouper::default();
    for group in config_files.iter().chain(&config_globs) {
        let Some(dir) = parent_directory(&group.value) else {
            continue;
        };
        for evidence in &group.evidence {
            dirs.push(dir, evidence.clone());
        }
    }
    let config_directories = dirs.finish();

    let structural_expectations = group_by_value(&inputs.structural_expectations);
    let constraints = group_by_value(&inputs.constraints);
    let examples = group_by_value(&inputs.examples);

    let versions = collect_versions(
        config_files
            .iter()
            .chain(&config_globs)
            .chain(&config_directories)
            .chain(&structural_expectations)
            .chain(&constraints)
            .chain(&examples),
    );

    let mut warnings = Vec::new();
    if config_files.is_empty() && config_globs.is_empty() {
        warnings.push(DocModelWarning::NoConfigFilenamesDetected);
    }
    if versions.len() > 1 {
        warnings.push(DocModelWarning::DocVersionsMixed);
    }
    if !warnings.is_empty() {
        tracing::warn!("doc model for '{}' has warnings: {:?}", agent_id, warnings);
    }

    AgentDocModel {
        agent_id: agent_id.to_string(),
        agent_name: agent_name.to_string(),
        config_files,
        config_globs,
        config_directories,
        structural_expectations,
        constraints,
        examples,
        versions,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ev(value: &str, source: &str, version: Option<&str>) -> DocEvidence {
        DocEvidence {
            value: value.into(),
            topic: "config_format".into(),
            source: source.into(),
            version: version.map(str::to_string),
        }
    }

    fn values(groups: &[DocValueGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.value.as_str()).collect()
    }

    #[test]
    fn splits_files_globs_and_directories() {
        let inputs = DocExtractInputs {
            filenames: vec![
                ev("docs/AGENTS.md", "a", Some("v1")),
                ev(".kiro/steering/*.md", "b", Some("v1")),
                ev("docs/AGENTS.md", "c", Some("v1")),
            ],
            ..Default::default()
        };
        let model = normalize_doc_inputs("codex", "Codex", &inputs);
        assert_eq!(values(&model.config_files), vec!["docs/AGENTS.md"]);
        assert_eq!(model.config_files[0].evidence.len(), 2);
        assert_eq!(values(&model.config_globs), vec![".kiro/steering/*.md"]);
        assert_eq!(values(&model.config_directories), vec!["docs", ".kiro/steering"]);
        assert_eq!(model.config_directories[0].evidence.len(), 2);
        assert_eq!(model.versions, vec!["v1"]);
        assert!(model.warnings.is_empty());
    }

    #[test]
    fn same_file_from_two_versions_is_one_group() {
        let inputs = DocExtractInputs {
            filenames: vec![
                ev("AGENTS.md", "docs", Some("v1")),
                ev("AGENTS.md", "docs", Some("v2")),
            ],
            ..Default::default()
        };
        let model = normalize_doc_inputs("codex", "Codex", &inputs);
        assert_eq!(model.config_files.len(), 1);
        assert_eq!(model.config_files[0].evidence.len(), 2);
        assert_eq!(model.versions, vec!["v1", "v2"]);
        assert_eq!(model.warnings, vec![DocModelWarning::DocVersionsMixed]);
    }

    #[test]
    fn warns_on_missing_filenames_and_mixed_versions() {
        let inputs = DocExtractInputs {
            structural_expectations: vec![ev("Use headings", "a", Some("v1"))],
            constraints: vec![ev("Max 10 lines", "b", Some("v2"))],
            ..Default::default()
        };
        let model = normalize_doc_inputs("kiro", "Kiro", &inputs);
        assert_eq!(model.versions, vec!["v1", "v2"]);
        assert_eq!(
            model.warnings,
            vec![
                DocModelWarning::NoConfigFilenamesDetected,
                DocModelWarning::DocVersionsMixed
            ]
        );
        let json = serde_json::to_value(&model.warnings).unwrap();
        assert_eq!(
            json,
            serde_json::json!(["no_config_filenames_detected", "doc_versions_mixed"])
        );
    }

    #[test]
    fn bare_and_dot_relative_names_have_no_directory() {
        let inputs = DocExtractInputs {
            filenames: vec![
                ev("CLAUDE.md", "a", None),
                ev("./GEMINI.md", "a", None),
                ev("/AGENTS.md", "a", None),
                ev("nested//rules.md", "a", None),
            ],
            ..Default::default()
        };
        let model = normalize_doc_inputs("x", "X", &inputs);
        assert_eq!(values(&model.config_directories), vec!["/", "nested"]);
        assert!(model.versions.is_empty());
    }

    #[test]
    fn trims_values_and_skips_blank_evidence() {
        let inputs = DocExtractInputs {
            filenames: vec![ev("  AGENTS.md ", "a", Some("")), ev("   ", "a", None)],
            examples: vec![ev(" # Example ", "a", None), ev("", "a", None)],
            ..Default::default()
        };
        let model = normalize_doc_inputs("codex", "Codex", &inputs);
        assert_eq!(values(&model.config_files), vec!["AGENTS.md"]);
        assert_eq!(values(&model.examples), vec!["# Example"]);
        assert!(model.versions.is_empty());
    }

    #[test]
    fn model_json_round_trips() {
        let inputs = DocExtractInputs {
            filenames: vec![ev("AGENTS.md", "a", Some("2025-01"))],
            constraints: vec![ev("Max 12,000 tokens", "a", Some("2025-01"))],
            ..Default::default()
        };
        let model = normalize_doc_inputs("codex", "Codex", &inputs);
        let json = serde_json::to_string(&model).expect("serialize");
        let back: AgentDocModel = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, model);
    }

    fn evidence_strategy() -> impl Strategy<Value = DocEvidence> {
        (
            prop::sample::select(vec![
                "AGENTS.md",
                " AGENTS.md",
                "docs/CLAUDE.md",
                ".kiro/steering/*.md",
                "a/b?.md",
                "",
            ]),
            prop::sample::select(vec!["s1", "s2"]),
            prop::option::of(prop::sample::select(vec!["v1", "v2", ""])),
        )
            .prop_map(|(v, s, ver)| ev(v, s, ver))
    }

    proptest! {
        #[test]
        fn normalization_is_deterministic(
            items in prop::collection::vec(evidence_strategy(), 0..12)
        ) {
            let inputs = DocExtractInputs {
                filenames: items.clone(),
                structural_expectations: items,
                ..Default::default()
            };
            let a = serde_json::to_string(&normalize_doc_inputs("id", "Name", &inputs)).unwrap();
            let b = serde_json::to_string(&normalize_doc_inputs("id", "Name", &inputs)).unwrap();
            prop_assert_eq!(a, b);
        }

        #[test]
        fn groups_partition_non_blank_evidence(
            items in prop::collection::vec(evidence_strategy(), 0..12)
        ) {
            let groups = group_by_value(&items);
            let non_blank = items.iter().filter(|e| !e.value.trim().is_empty()).count();
            let grouped: usize = groups.iter().map(|g| g.evidence.len()).sum();
            prop_assert_eq!(grouped, non_blank);
            for (i, g) in groups.iter().enumerate() {
                let expected: Vec<&DocEvidence> =
                    items.iter().filter(|e| e.value.trim() == g.value).collect();
                let actual: Vec<&DocEvidence> = g.evidence.iter().collect();
                prop_assert_eq!(actual, expected);
                prop_assert!(groups[i + 1..].iter().all(|o| o.value != g.value));
            }
        }
    }
}
