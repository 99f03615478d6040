//! Workspace detection of agent config artifacts.
//!
//! A single walk of the workspace tree tests every directory against
//! `directory` artifacts and every file against `file`/`glob` artifacts of
//! every registered agent. Matches are de-duplicated per
//! `(agent, path, pattern)` and each agent with at least one match gets a
//! confidence score derived from match depth and kind.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};
use walkdir::{DirEntry, WalkDir};

use crate::registry::{AgentArtifact, AgentRegistry, ArtifactKind};

/// Directory names never descended into.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".venv",
    "node_modules",
    "__pycache__",
];

const EXTRA_MATCH_BONUS: f64 = 0.05;
const DIRECTORY_WEIGHT: f64 = 0.4;

/// Walk settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectOptions {
    pub ignored_dirs: BTreeSet<String>,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            ignored_dirs: DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl DetectOptions {
    pub fn with_ignored_dirs<I, S>(dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ignored_dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDetectionMatch {
    /// Posix path relative to the workspace root (`.` for the root itself).
    pub path: String,
    pub artifact_pattern: String,
    pub artifact_kind: ArtifactKind,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDetection {
    pub agent_id: String,
    pub matches: Vec<AgentDetectionMatch>,
    pub confidence: f64,
}

struct CompiledArtifact<'a> {
    agent: usize,
    artifact: &'a AgentArtifact,
    glob: Option<GlobMatcher>,
}

impl CompiledArtifact<'_> {
    fn is_match(&self, rel_path: &str, file_name: &str) -> bool {
        if self.artifact.root_only && path_depth(rel_path) > 0 {
            return false;
        }
        match self.artifact.kind {
            ArtifactKind::File if !has_separator(&self.artifact.pattern) => {
                file_name == self.artifact.pattern
            }
            ArtifactKind::Directory if rel_path == "." => {
                self.glob_match("") || self.glob_match(".")
            }
            _ => self.glob_match(rel_path),
        }
    }

    fn glob_match(&self, candidate: &str) -> bool {
        match &self.glob {
            Some(m) => m.is_match(candidate),
            None => candidate == self.artifact.pattern,
        }
    }
}

fn has_separator(pattern: &str) -> bool {
    pattern.contains('/') || pattern.contains('\\')
}

fn compile(agent: usize, artifact: &AgentArtifact) -> CompiledArtifact<'_> {
    let needs_glob =
        !matches!(artifact.kind, ArtifactKind::File) || has_separator(&artifact.pattern);
    let glob = if needs_glob {
        // fnmatch-style: `*` crosses `/`, backslash is literal.
        match GlobBuilder::new(&artifact.pattern)
            .literal_separator(false)
            .backslash_escape(false)
            .build()
        {
            Ok(g) => Some(g.compile_matcher()),
            Err(e) => {
                tracing::warn!(
                    "artifact pattern '{}' is not a valid glob ({}); matching literally",
                    artifact.pattern,
                    e
                );
                None
            }
        }
    } else {
        None
    };
    CompiledArtifact {
        agent,
        artifact,
        glob,
    }
}

/// Number of path separators in a posix relative path.
pub fn path_depth(rel_path: &str) -> usize {
    if rel_path.is_empty() || rel_path == "." {
        return 0;
    }
    rel_path.matches('/').count()
}

fn relative_posix(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

fn is_ignored(entry: &DirEntry, ignored: &BTreeSet<String>) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| ignored.contains(name))
}

/// Scan `root` once and report every agent with at least one matching artifact.
///
/// Results are ordered by confidence (descending), then agent id.
pub fn detect_agent_configs(
    root: &Path,
    registry: &AgentRegistry,
    options: &DetectOptions,
) -> Vec<AgentDetection> {
    if !root.is_dir() {
        tracing::debug!("detect root {} is not a directory", root.display());
        return Vec::new();
    }
    let compiled: Vec<CompiledArtifact<'_>> = registry
        .agents
        .iter()
        .enumerate()
        .flat_map(|(i, agent)| agent.artifacts.iter().map(move |a| compile(i, a)))
        .collect();
    let (dir_artifacts, file_artifacts): (Vec<_>, Vec<_>) = compiled
        .iter()
        .partition(|c| c.artifact.kind == ArtifactKind::Directory);

    let mut matches_by_agent: Vec<Vec<AgentDetectionMatch>> =
        vec![Vec::new(); registry.agents.len()];
    let mut seen: HashSet<(usize, String, String)> = HashSet::new();
    let mut record = |c: &CompiledArtifact<'_>, rel_path: &str| {
        let key = (c.agent, rel_path.to_string(), c.artifact.pattern.clone());
        if !seen.insert(key) {
            return;
        }
        tracing::debug!(
            "match agent={} path={} pattern={}",
            registry.agents[c.agent].agent_id,
            rel_path,
            c.artifact.pattern
        );
        matches_by_agent[c.agent].push(AgentDetectionMatch {
            path: rel_path.to_string(),
            artifact_pattern: c.artifact.pattern.clone(),
            artifact_kind: c.artifact.kind,
            depth: path_depth(rel_path),
        });
    };

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(e, &options.ignored_dirs));
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        let rel_path = relative_posix(root, entry.path());
        let file_type = entry.file_type();
        if file_type.is_dir() {
            for &c in &dir_artifacts {
                if c.is_match(&rel_path, "") {
                    record(c, &rel_path);
                }
            }
            continue;
        }
        let is_file = file_type.is_file()
            || (file_type.is_symlink()
                && std::fs::metadata(entry.path()).is_ok_and(|m| m.is_file()));
        if !is_file {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy();
        for &c in &file_artifacts {
            if c.is_match(&rel_path, &file_name) {
                record(c, &rel_path);
            }
        }
    }

    let mut detections: Vec<AgentDetection> = registry
        .agents
        .iter()
        .zip(matches_by_agent)
        .filter(|(_, matches)| !matches.is_empty())
        .map(|(agent, mut matches)| {
            matches.sort_by(|a, b| {
                (a.depth, &a.path, &a.artifact_pattern, a.artifact_kind.as_str()).cmp(&(
                    b.depth,
                    &b.path,
                    &b.artifact_pattern,
                    b.artifact_kind.as_str(),
                ))
            });
            let confidence = confidence_for_matches(&matches);
            AgentDetection {
                agent_id: agent.agent_id.clone(),
                matches,
                confidence,
            }
        })
        .collect();
    detections.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.agent_id.cmp(&b.agent_id))
    });
    tracing::info!(
        "detected {} agent(s) under {}",
        detections.len(),
        root.display()
    );
    detections
}

fn match_score(m: &AgentDetectionMatch) -> f64 {
    let score = 1.0 / (m.depth as f64 + 1.0);
    if m.artifact_kind == ArtifactKind::Directory {
        score * DIRECTORY_WEIGHT
    } else {
        score
    }
}

/// Best per-match score plus a small bonus per extra match, capped at 1.0.
pub fn confidence_for_matches(matches: &[AgentDetectionMatch]) -> f64 {
    let Some(base) = matches.iter().map(match_score).reduce(f64::max) else {
        return 0.0;
    };
    let bonus = EXTRA_MATCH_BONUS * (matches.len() - 1) as f64;
    (base + bonus).min(1.0)
}
