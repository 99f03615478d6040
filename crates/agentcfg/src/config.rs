use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
pub struct UserConfig {
    pub logging: Option<LoggingCfg>,
    pub registry: Option<RegistryCfg>,
    pub detect: Option<DetectCfg>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoggingCfg {
    pub to_file: Option<bool>,
    pub dir: Option<String>,
    pub json: Option<bool>,
    pub compact: Option<bool>,
    pub pretty: Option<bool>,
    pub level: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RegistryCfg {
    /// Registry extension file; `~/` is expanded.
    pub config: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DetectCfg {
    /// Replaces the default ignored directory names when set.
    pub ignored_dirs: Option<Vec<String>>,
}

impl UserConfig {
    pub fn registry_config_path(&self) -> Option<PathBuf> {
        self.registry
            .as_ref()
            .and_then(|r| r.config.as_deref())
            .filter(|s| !s.trim().is_empty())
            .map(expand_home)
    }

    pub fn ignored_dirs(&self) -> Option<&[String]> {
        self.detect.as_ref().and_then(|d| d.ignored_dirs.as_deref())
    }
}

/// Resolve the agentcfg home: explicit override, then `$HOME/.agentcfg`, then `./.agentcfg`.
pub fn agentcfg_home(explicit: &str) -> PathBuf {
    if !explicit.is_empty() {
        return expand_home(explicit);
    }
    match std::env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".agentcfg"),
        Err(_) => std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".agentcfg"),
    }
}

pub fn load_user_config(home: &Path) -> anyhow::Result<Option<UserConfig>> {
    let path = home.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    let s = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    let cfg: UserConfig =
        toml::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(cfg))
}

pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(load_user_config(dir.path()).expect("load").is_none());
    }

    #[test]
    fn reads_all_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            r#"
[logging]
level = "debug"
to_file = false

[registry]
config = "/etc/agentcfg/registry.toml"

[detect]
ignored_dirs = [".git", "target"]
"#,
        )
        .expect("write");
        let cfg = load_user_config(dir.path()).expect("load").expect("present");
        let logging = cfg.logging.as_ref().expect("logging");
        assert_eq!(logging.level.as_deref(), Some("debug"));
        assert_eq!(logging.to_file, Some(false));
        assert_eq!(
            cfg.registry_config_path(),
            Some(PathBuf::from("/etc/agentcfg/registry.toml"))
        );
        assert_eq!(
            cfg.ignored_dirs(),
            Some(&[".git".to_string(), "target".to_string()][..])
        );
    }

    #[test]
    fn malformed_config_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[logging\n").expect("write");
        let err = load_user_config(dir.path()).expect_err("should fail");
        assert!(format!("{:#}", err).contains("config.toml"));
    }

    #[test]
    fn blank_registry_path_is_ignored() {
        let cfg: UserConfig = toml::from_str("[registry]\nconfig = \"  \"\n").expect("toml");
        assert!(cfg.registry_config_path().is_none());
        assert!(cfg.ignored_dirs().is_none());
    }

    #[test]
    fn explicit_home_wins() {
        assert_eq!(agentcfg_home("/opt/agentcfg"), PathBuf::from("/opt/agentcfg"));
        assert_eq!(expand_home("relative/x"), PathBuf::from("relative/x"));
    }
}
