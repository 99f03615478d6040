//! External registry extensions.
//!
//! Providers hand back raw TOML records which are validated against a fixed
//! schema before they become [`AgentDefinition`]s. Loading is best-effort: a
//! failing provider or an invalid record is logged and skipped, and ids that
//! collide with an earlier entry are dropped.

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Context as _;
use toml::Value as TomlValue;

use super::error::RegistryError;
use super::types::{AgentArtifact, AgentDefinition, ArtifactKind};

/// Environment variable naming an explicit registry extension file.
pub const REGISTRY_CONFIG_ENV: &str = "AGENTCFG_REGISTRY_CONFIG";
/// File picked up from the current directory when no path is configured.
pub const DEFAULT_CONFIG_NAME: &str = "agentcfg.registry.toml";

/// Source of extra agent definitions, resolved once at startup.
pub trait RegistryProvider {
    fn name(&self) -> &str;
    fn load(&self) -> anyhow::Result<Vec<TomlValue>>;
}

/// Reads `[[agent_registry.agents]]` entries from a TOML file.
pub struct TomlFileProvider {
    name: String,
    path: PathBuf,
}

impl TomlFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("config:{}", path.display()),
            path,
        }
    }
}

impl RegistryProvider for TomlFileProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> anyhow::Result<Vec<TomlValue>> {
        if !self.path.exists() {
            anyhow::bail!("registry config path '{}' does not exist", self.path.display());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("read {}", self.path.display()))?;
        records_from_toml_str(&content)
            .with_context(|| format!("parse {}", self.path.display()))
    }
}

/// Extract raw agent records from a registry TOML document.
pub fn records_from_toml_str(s: &str) -> anyhow::Result<Vec<TomlValue>> {
    let mut tbl: toml::Table = s.parse().context("invalid TOML")?;
    let Some(TomlValue::Table(mut registry)) = tbl.remove("agent_registry") else {
        return Ok(Vec::new());
    };
    match registry.remove("agents") {
        Some(TomlValue::Array(items)) => Ok(items),
        Some(other) => {
            tracing::warn!(
                "ignoring non-array 'agent_registry.agents' (found: {})",
                other.type_str()
            );
            Ok(Vec::new())
        }
        None => Ok(Vec::new()),
    }
}

/// Pick the registry config file: explicit path, then env, then the current directory.
pub fn registry_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p);
    }
    if let Ok(p) = std::env::var(REGISTRY_CONFIG_ENV)
        && !p.trim().is_empty()
    {
        return Some(PathBuf::from(p));
    }
    let cwd_default = std::env::current_dir().ok()?.join(DEFAULT_CONFIG_NAME);
    cwd_default.exists().then_some(cwd_default)
}

/// Providers consulted by the default registry build.
pub fn default_providers(config_path: Option<PathBuf>) -> Vec<Box<dyn RegistryProvider>> {
    let mut providers: Vec<Box<dyn RegistryProvider>> = Vec::new();
    if let Some(path) = registry_config_path(config_path) {
        tracing::debug!("registry extension config: {}", path.display());
        providers.push(Box::new(TomlFileProvider::new(path)));
    }
    providers
}

/// Load and validate definitions from every provider, skipping failures.
pub fn load_extensions(providers: &[Box<dyn RegistryProvider>]) -> Vec<AgentDefinition> {
    let mut out = Vec::new();
    for provider in providers {
        let records = match provider.load() {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("failed to load registry provider '{}': {:#}", provider.name(), e);
                continue;
            }
        };
        for record in &records {
            match definition_from_value(record) {
                Ok(def) => out.push(def),
                Err(e) => tracing::warn!(
                    "skipping registry entry from '{}': {}",
                    provider.name(),
                    e
                ),
            }
        }
    }
    out
}

/// Append extensions to `base`, dropping any whose id is already taken.
pub fn merge_agent_definitions(
    base: Vec<AgentDefinition>,
    extensions: Vec<AgentDefinition>,
) -> Vec<AgentDefinition> {
    let mut seen: HashSet<String> = base.iter().map(|a| a.agent_id.clone()).collect();
    let mut merged = base;
    for entry in extensions {
        if !seen.insert(entry.agent_id.clone()) {
            tracing::warn!(
                "skipping extension agent '{}' because it collides with an existing registry entry",
                entry.agent_id
            );
            continue;
        }
        merged.push(entry);
    }
    merged
}

/// Validate one raw record against the registry schema.
pub fn definition_from_value(value: &TomlValue) -> Result<AgentDefinition, RegistryError> {
    let Some(tbl) = value.as_table() else {
        return Err(RegistryError::invalid(
            None,
            format!("agent entry must be a table (found: {})", value.type_str()),
        ));
    };
    let agent_id = require_str(tbl, "agent_id", None)?;
    let display_name = require_str(tbl, "display_name", Some(&agent_id))?;
    let artifacts = match tbl.get("artifacts") {
        Some(TomlValue::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|item| artifact_from_value(&agent_id, item))
            .collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(RegistryError::invalid(
                Some(&agent_id),
                "must define at least one artifact",
            ));
        }
    };
    Ok(AgentDefinition {
        aliases: string_list(tbl, "aliases", &agent_id)?,
        config_filenames: string_list(tbl, "config_filenames", &agent_id)?,
        directory_patterns: string_list(tbl, "directory_patterns", &agent_id)?,
        precedence_rules: string_list(tbl, "precedence_rules", &agent_id)?,
        agent_id,
        display_name,
        artifacts,
    })
}

fn artifact_from_value(agent_id: &str, value: &TomlValue) -> Result<AgentArtifact, RegistryError> {
    let Some(tbl) = value.as_table() else {
        return Err(RegistryError::invalid(Some(agent_id), "artifact must be a table"));
    };
    let pattern = require_str(tbl, "pattern", Some(agent_id))?;
    let kind_raw = require_str(tbl, "kind", Some(agent_id))?;
    let kind = ArtifactKind::from_name(&kind_raw).ok_or_else(|| {
        RegistryError::invalid(
            Some(agent_id),
            format!("artifact kind '{}' is not supported", kind_raw),
        )
    })?;
    let description = match tbl.get("description") {
        None => None,
        Some(TomlValue::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(RegistryError::invalid(
                Some(agent_id),
                "artifact 'description' must be a string",
            ));
        }
    };
    let root_only = match tbl.get("root_only") {
        None => false,
        Some(TomlValue::Boolean(b)) => *b,
        Some(_) => {
            return Err(RegistryError::invalid(
                Some(agent_id),
                "artifact 'root_only' must be a boolean",
            ));
        }
    };
    Ok(AgentArtifact {
        pattern,
        kind,
        description,
        root_only,
    })
}

fn require_str(tbl: &toml::Table, key: &str, agent: Option<&str>) -> Result<String, RegistryError> {
    match tbl.get(key) {
        Some(TomlValue::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(RegistryError::invalid(
            agent,
            format!("missing required '{}' value", key),
        )),
    }
}

fn string_list(tbl: &toml::Table, key: &str, agent_id: &str) -> Result<Vec<String>, RegistryError> {
    match tbl.get(key) {
        None => Ok(Vec::new()),
        Some(TomlValue::Array(items)) => items
            .iter()
            .map(|it| {
                it.as_str().map(|s| s.to_string()).ok_or_else(|| {
                    RegistryError::invalid(
                        Some(agent_id),
                        format!("'{}' entries must be strings", key),
                    )
                })
            })
            .collect(),
        Some(_) => Err(RegistryError::invalid(
            Some(agent_id),
            format!("'{}' must be an array of strings", key),
        )),
    }
}
