//! Heuristic evidence extraction from documentation snippets.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::fetch::{DocSnippet, TOPIC_EXAMPLES};

static FILENAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)`?([A-Za-z0-9._/-]+\.md)`?").expect("filename pattern is a valid regex")
});

static WILDCARD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)`?([A-Za-z0-9._/-]+/\*\.md)`?").expect("wildcard pattern is a valid regex")
});

static CONSTRAINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d[\d,.]*)\s*(bytes?|kb|mb|characters?|tokens?|lines?)\b")
        .expect("constraint pattern is a valid regex")
});

const STRUCTURE_HINT_TERMS: &[&str] = &[
    "section",
    "sections",
    "heading",
    "headings",
    "structure",
    "format",
    "schema",
    "layout",
    "precedence",
    "override",
];

/// A value pulled out of a snippet, with where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocEvidence {
    pub value: String,
    pub topic: String,
    pub source: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl DocEvidence {
    fn from_snippet(value: impl Into<String>, snippet: &DocSnippet) -> Self {
        Self {
            value: value.into(),
            topic: snippet.topic.clone(),
            source: snippet.source.clone(),
            version: snippet.version.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocExtractInputs {
    pub filenames: Vec<DocEvidence>,
    pub structural_expectations: Vec<DocEvidence>,
    pub constraints: Vec<DocEvidence>,
    pub examples: Vec<DocEvidence>,
}

/// Order-preserving collection that drops repeated `(value, topic, source, version)` tuples.
#[derive(Default)]
struct EvidenceSet {
    items: Vec<DocEvidence>,
    seen: HashSet<DocEvidence>,
}

impl EvidenceSet {
    fn extend(&mut self, evidence: impl IntoIterator<Item = DocEvidence>) {
        for e in evidence {
            if self.seen.insert(e.clone()) {
                self.items.push(e);
            }
        }
    }
}

/// Extract filename, structure, constraint, and example evidence from `snippets`.
pub fn extract_doc_inputs(snippets: &[DocSnippet]) -> DocExtractInputs {
    let mut filenames = EvidenceSet::default();
    let mut structure = EvidenceSet::default();
    let mut constraints = EvidenceSet::default();
    let mut examples = EvidenceSet::default();

    for snippet in snippets {
        filenames.extend(
            filename_candidates(&snippet.content)
                .into_iter()
                .map(|v| DocEvidence::from_snippet(v, snippet)),
        );
        structure.extend(
            structure_hints(&snippet.content)
                .into_iter()
                .map(|v| DocEvidence::from_snippet(v, snippet)),
        );
        constraints.extend(
            constraint_lines(&snippet.content)
                .into_iter()
                .map(|v| DocEvidence::from_snippet(v, snippet)),
        );
        let body = snippet.content.trim();
        if snippet.topic == TOPIC_EXAMPLES && !body.is_empty() {
            examples.extend([DocEvidence::from_snippet(body, snippet)]);
        }
    }

    let inputs = DocExtractInputs {
        filenames: filenames.items,
        structural_expectations: structure.items,
        constraints: constraints.items,
        examples: examples.items,
    };
    tracing::debug!(
        "extracted evidence from {} snippet(s): files={} structure={} constraints={} examples={}",
        snippets.len(),
        inputs.filenames.len(),
        inputs.structural_expectations.len(),
        inputs.constraints.len(),
        inputs.examples.len()
    );
    inputs
}

fn filename_candidates(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let captures = FILENAME_RE
        .captures_iter(content)
        .chain(WILDCARD_RE.captures_iter(content));
    for caps in captures {
        let Some(m) = caps.get(1) else { continue };
        let value = m.as_str();
        if value.contains("://") || value.starts_with("//") {
            continue;
        }
        let value = value.trim();
        if !value.is_empty() && seen.insert(value.to_string()) {
            out.push(value.to_string());
        }
    }
    out
}

fn structure_hints(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in content.lines() {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }
        if stripped.starts_with('#') {
            let heading = stripped.trim_start_matches('#').trim();
            if !heading.is_empty() && seen.insert(heading.to_string()) {
                out.push(heading.to_string());
            }
            continue;
        }
        let lowered = stripped.to_lowercase();
        if STRUCTURE_HINT_TERMS.iter().any(|t| lowered.contains(t))
            && seen.insert(stripped.to_string())
        {
            out.push(stripped.to_string());
        }
    }
    out
}

fn constraint_lines(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for line in content.lines() {
        let stripped = line.trim();
        if !stripped.is_empty()
            && CONSTRAINT_RE.is_match(stripped)
            && seen.insert(stripped.to_string())
        {
            out.push(stripped.to_string());
        }
    }
    out
}
