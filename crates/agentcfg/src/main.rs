use std::io::Read;
use std::path::PathBuf;

use agentcfg::config::{UserConfig, agentcfg_home, load_user_config};
use agentcfg::detect::{DEFAULT_IGNORED_DIRS, DetectOptions, detect_agent_configs};
use agentcfg::docs::{
    DocFetchOrchestrator, DocFetchOutcome, DocFetchRequest, DocSnippet, extract_doc_inputs,
    normalize_doc_inputs,
};
use agentcfg::registry::{AgentRegistry, registry_with_config, resolve_agent_id};
use anyhow::Context;
use clap::{Parser, Subcommand};
use env_flags::env_flags;
use serde::Serialize;

env_flags! {
    /// agentcfg home directory (absolute). Defaults to $HOME/.agentcfg
    AGENTCFG_HOME: &str = "";
}

/// Detect, parse, and model AI coding agent configuration files
#[derive(Parser, Debug)]
#[command(name = "agentcfg")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Registry extension file (overrides AGENTCFG_REGISTRY_CONFIG and config.toml)
    #[arg(long, global = true)]
    registry: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the agent registry as JSON
    Registry,
    /// Scan a workspace for agent configuration artifacts
    Detect {
        /// Workspace root
        #[arg(default_value = ".")]
        path: PathBuf,
        /// Additional directory name to skip (repeatable)
        #[arg(long = "ignore", value_name = "NAME")]
        ignore: Vec<String>,
    },
    /// Resolve a user-supplied agent name to its canonical id
    Resolve { name: String },
    /// Parse a markdown file ("-" for stdin) into structural nodes
    Parse { file: String },
    /// Print the documentation queries planned for an agent
    Plan {
        #[arg(long)]
        agent: String,
        /// Configuration scope hint, e.g. "project" or "global"
        #[arg(long)]
        scope: Option<String>,
    },
    /// Extract and normalize doc evidence from a JSON array of snippets
    Extract {
        #[arg(long)]
        agent: String,
        #[arg(value_name = "SNIPPETS.json")]
        file: PathBuf,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{}", s);
    Ok(())
}

fn display_name(registry: &AgentRegistry, agent_id: &str) -> String {
    registry
        .get(agent_id)
        .map(|a| a.display_name.clone())
        .unwrap_or_else(|| agent_id.to_string())
}

fn detect_options(user_cfg: Option<&UserConfig>, extra: Vec<String>) -> DetectOptions {
    let base: Vec<String> = match user_cfg.and_then(|c| c.ignored_dirs()) {
        Some(dirs) => dirs.to_vec(),
        None => DEFAULT_IGNORED_DIRS.iter().map(|s| s.to_string()).collect(),
    };
    DetectOptions::with_ignored_dirs(base.into_iter().chain(extra))
}

fn read_markdown(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        let mut s = String::new();
        std::io::stdin()
            .read_to_string(&mut s)
            .context("reading markdown from stdin")?;
        return Ok(s);
    }
    std::fs::read_to_string(file).with_context(|| format!("reading {}", file))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let home = agentcfg_home(*AGENTCFG_HOME);
    let user_cfg = match load_user_config(&home) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("ignoring user config: {:#}", e);
            None
        }
    };
    agentcfg::logging::init_tracing(&home, user_cfg.as_ref());
    tracing::debug!("agentcfg_home={}", home.display());

    let registry_path = cli
        .registry
        .clone()
        .or_else(|| user_cfg.as_ref().and_then(|c| c.registry_config_path()));
    let registry = registry_with_config(registry_path);

    match cli.command {
        Commands::Registry => print_json(&registry),
        Commands::Detect { path, ignore } => {
            let options = detect_options(user_cfg.as_ref(), ignore);
            let detections = detect_agent_configs(&path, &registry, &options);
            print_json(&detections)
        }
        Commands::Resolve { name } => {
            let agent_id = resolve_agent_id(&name, &registry)?;
            println!("{}", agent_id);
            Ok(())
        }
        Commands::Parse { file } => {
            let text = read_markdown(&file)?;
            print_json(&agentcfg::parser::parse_markdown(&text))
        }
        Commands::Plan { agent, scope } => {
            let agent_id = resolve_agent_id(&agent, &registry)?;
            let mut request = DocFetchRequest::new(display_name(&registry, &agent_id), agent_id);
            if let Some(scope) = scope {
                request = request.with_scope(scope);
            }
            // No transport is wired into the CLI, so this always yields a plan.
            let orchestrator = DocFetchOrchestrator::new(None, false);
            match orchestrator.fetch(&request, None).await? {
                DocFetchOutcome::Planned(plan) => print_json(&plan),
                DocFetchOutcome::Fetched(result) => print_json(&result),
            }
        }
        Commands::Extract { agent, file } => {
            let agent_id = resolve_agent_id(&agent, &registry)?;
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let snippets: Vec<DocSnippet> = serde_json::from_str(&raw)
                .with_context(|| format!("parsing snippets in {}", file.display()))?;
            let inputs = extract_doc_inputs(&snippets);
            let name = display_name(&registry, &agent_id);
            let model = normalize_doc_inputs(&agent_id, &name, &inputs);
            print_json(&model)
        }
    }
}
