//! Documentation fetch contract and orchestration.
//!
//! The transport that actually queries documentation sources lives outside
//! this crate behind the [`DocFetcher`] trait. This module builds the topic
//! queries, decides whether a fetch should happen at all, and keeps an
//! optional in-memory TTL cache of fetched snippets.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

pub const TOPIC_CONFIG_FORMAT: &str = "config_format";
pub const TOPIC_INSTRUCTION_PRECEDENCE: &str = "instruction_precedence";
pub const TOPIC_EXAMPLES: &str = "examples";

const QUERY_ORDER: [&str; 3] = [
    TOPIC_CONFIG_FORMAT,
    TOPIC_INSTRUCTION_PRECEDENCE,
    TOPIC_EXAMPLES,
];

/// Query templates keyed by topic. `{agent_name}`, `{agent_id}` and
/// `{config_scope}` are substituted.
pub fn default_query_templates() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert(
        TOPIC_CONFIG_FORMAT.to_string(),
        "Find the official, up-to-date documentation for {agent_name} configuration files.\n\
         Return the canonical filename(s), expected location(s), and required structure.\n\
         Include any size limits, required headings, or reserved sections.\n\
         Provide citations and the doc version or last-updated date when available."
            .to_string(),
    );
    m.insert(
        TOPIC_INSTRUCTION_PRECEDENCE.to_string(),
        "Find the official documentation for {agent_name} instruction precedence.\n\
         Describe how global, project, and nested config files are discovered and merged.\n\
         Include the exact precedence order, override rules, and any special cases.\n\
         Provide citations and the doc version or last-updated date when available."
            .to_string(),
    );
    m.insert(
        TOPIC_EXAMPLES.to_string(),
        "Find official example configurations for {agent_name}.\n\
         Return a minimal example and a full example if available.\n\
         Include headings, section ordering, and any recommended best practices.\n\
         Provide citations and the doc version or last-updated date when available."
            .to_string(),
    );
    m
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocFetchRequest {
    pub agent_name: String,
    pub agent_id: String,
    #[serde(default)]
    pub config_scope: Option<String>,
}

impl DocFetchRequest {
    pub fn new(agent_name: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            agent_name: agent_name.into(),
            agent_id: agent_id.into(),
            config_scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.config_scope = Some(scope.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocFetchQuery {
    pub topic: String,
    pub query: String,
}

/// One piece of documentation text returned by a fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocSnippet {
    pub topic: String,
    pub source: String,
    pub content: String,
    #[serde(default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// The host model answers the queries itself; nothing is fetched here.
    LlmDirect,
    FallbackFetcher,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocFetchWarning {
    FallbackFetcherUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocFetchPlan {
    pub mode: FetchMode,
    pub queries: Vec<DocFetchQuery>,
    #[serde(default)]
    pub warnings: Vec<DocFetchWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocFetchResult {
    pub mode: FetchMode,
    pub queries: Vec<DocFetchQuery>,
    pub snippets: Vec<DocSnippet>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocFetchOutcome {
    Planned(DocFetchPlan),
    Fetched(DocFetchResult),
}

/// Render the topic queries for `request` in canonical topic order.
pub fn build_doc_queries(
    request: &DocFetchRequest,
    templates: Option<&HashMap<String, String>>,
) -> Vec<DocFetchQuery> {
    let defaults;
    let templates = match templates {
        Some(t) => t,
        None => {
            defaults = default_query_templates();
            &defaults
        }
    };
    let scope = request.config_scope.as_deref().unwrap_or("");
    let mut queries = Vec::new();
    for topic in QUERY_ORDER {
        let Some(template) = templates.get(topic).filter(|t| !t.is_empty()) else {
            continue;
        };
        let mut query = template
            .replace("{agent_name}", &request.agent_name)
            .replace("{agent_id}", &request.agent_id)
            .replace("{config_scope}", scope);
        if !scope.is_empty() && !template.contains("{config_scope}") {
            query.push_str(&format!("\nFocus on {} scope when relevant.", scope));
        }
        queries.push(DocFetchQuery {
            topic: topic.to_string(),
            query,
        });
    }
    queries
}

/// Transport that turns queries into documentation snippets.
#[async_trait]
pub trait DocFetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &DocFetchRequest,
        queries: &[DocFetchQuery],
    ) -> anyhow::Result<Vec<DocSnippet>>;
}

type CacheKey = (String, String, Option<String>, Vec<DocFetchQuery>);

struct CacheEntry {
    stored_at: Instant,
    snippets: Vec<DocSnippet>,
}

/// In-memory snippet cache with a wall-clock TTL.
pub struct DocFetchCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl DocFetchCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn key(request: &DocFetchRequest, queries: &[DocFetchQuery]) -> CacheKey {
        (
            request.agent_id.clone(),
            request.agent_name.clone(),
            request.config_scope.clone(),
            queries.to_vec(),
        )
    }

    pub fn get(
        &self,
        request: &DocFetchRequest,
        queries: &[DocFetchQuery],
    ) -> Option<Vec<DocSnippet>> {
        let key = Self::key(request, queries);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let fresh = entries
            .get(&key)
            .map(|e| e.stored_at.elapsed() < self.ttl)?;
        if !fresh {
            entries.remove(&key);
            return None;
        }
        entries.get(&key).map(|e| e.snippets.clone())
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Store `snippets` and drop every entry that has outlived the TTL.
    pub fn insert(
        &self,
        request: &DocFetchRequest,
        queries: &[DocFetchQuery],
        snippets: Vec<DocSnippet>,
    ) {
        let key = Self::key(request, queries);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
        entries.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                snippets,
            },
        );
    }
}

/// Decides between direct answering and the fallback fetcher, and runs the
/// fetcher through the cache when one is configured.
pub struct DocFetchOrchestrator {
    fetcher: Option<Arc<dyn DocFetcher>>,
    prefer_llm_direct: bool,
    cache: Option<DocFetchCache>,
}

impl DocFetchOrchestrator {
    pub fn new(fetcher: Option<Arc<dyn DocFetcher>>, prefer_llm_direct: bool) -> Self {
        Self {
            fetcher,
            prefer_llm_direct,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: DocFetchCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn plan(
        &self,
        request: &DocFetchRequest,
        templates: Option<&HashMap<String, String>>,
    ) -> DocFetchPlan {
        let queries = build_doc_queries(request, templates);
        let (mode, warnings) = if self.prefer_llm_direct {
            (FetchMode::LlmDirect, Vec::new())
        } else if self.fetcher.is_none() {
            (
                FetchMode::LlmDirect,
                vec![DocFetchWarning::FallbackFetcherUnavailable],
            )
        } else {
            (FetchMode::FallbackFetcher, Vec::new())
        };
        tracing::debug!(
            "doc fetch plan for '{}': mode={:?} queries={}",
            request.agent_id,
            mode,
            queries.len()
        );
        DocFetchPlan {
            mode,
            queries,
            warnings,
        }
    }

    pub async fn fetch(
        &self,
        request: &DocFetchRequest,
        templates: Option<&HashMap<String, String>>,
    ) -> anyhow::Result<DocFetchOutcome> {
        let plan = self.plan(request, templates);
        let (FetchMode::FallbackFetcher, Some(fetcher)) = (plan.mode, self.fetcher.as_ref()) else {
            return Ok(DocFetchOutcome::Planned(plan));
        };
        if let Some(snippets) = self.cache.as_ref().and_then(|c| c.get(request, &plan.queries)) {
            tracing::debug!("doc fetch cache hit for '{}'", request.agent_id);
            return Ok(DocFetchOutcome::Fetched(DocFetchResult {
                mode: plan.mode,
                queries: plan.queries,
                snippets,
            }));
        }
        let snippets = fetcher.fetch(request, &plan.queries).await?;
        tracing::info!(
            "fetched {} doc snippet(s) for '{}'",
            snippets.len(),
            request.agent_id
        );
        if let Some(cache) = self.cache.as_ref() {
            cache.insert(request, &plan.queries, snippets.clone());
        }
        Ok(DocFetchOutcome::Fetched(DocFetchResult {
            mode: plan.mode,
            queries: plan.queries,
            snippets,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DocFetcher for CountingFetcher {
        async fn fetch(
            &self,
            _request: &DocFetchRequest,
            queries: &[DocFetchQuery],
        ) -> anyhow::Result<Vec<DocSnippet>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![DocSnippet {
                topic: queries[0].topic.clone(),
                source: "https://example.com".into(),
                content: "doc snippet".into(),
                version: Some("v1".into()),
            }])
        }
    }

    fn fetched(outcome: DocFetchOutcome) -> DocFetchResult {
        match outcome {
            DocFetchOutcome::Fetched(r) => r,
            DocFetchOutcome::Planned(p) => panic!("expected fetch, got plan {:?}", p),
        }
    }

    #[test]
    fn queries_follow_topic_order_and_scope_hint() {
        let request = DocFetchRequest::new("Claude", "claude").with_scope("project");
        let queries = build_doc_queries(&request, None);
        let topics: Vec<&str> = queries.iter().map(|q| q.topic.as_str()).collect();
        assert_eq!(topics, QUERY_ORDER.to_vec());
        assert!(queries[0].query.contains("Claude"));
        assert!(queries[0].query.ends_with("\nFocus on project scope when relevant."));
    }

    #[test]
    fn custom_templates_skip_missing_topics() {
        let mut templates = HashMap::new();
        templates.insert(
            TOPIC_EXAMPLES.to_string(),
            "{agent_id} examples for {config_scope}".to_string(),
        );
        let request = DocFetchRequest::new("Kiro", "kiro").with_scope("global");
        let queries = build_doc_queries(&request, Some(&templates));
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].query, "kiro examples for global");
    }

    #[test]
    fn plan_prefers_llm_direct() {
        let fetcher: Arc<dyn DocFetcher> = Arc::new(CountingFetcher::default());
        let orchestrator = DocFetchOrchestrator::new(Some(fetcher), true);
        let plan = orchestrator.plan(&DocFetchRequest::new("Codex", "codex"), None);
        assert_eq!(plan.mode, FetchMode::LlmDirect);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn plan_warns_when_fallback_missing() {
        let orchestrator = DocFetchOrchestrator::new(None, false);
        let plan = orchestrator.plan(&DocFetchRequest::new("Kiro", "kiro"), None);
        assert_eq!(plan.mode, FetchMode::LlmDirect);
        assert_eq!(plan.warnings, vec![DocFetchWarning::FallbackFetcherUnavailable]);
        assert_eq!(
            serde_json::to_value(&plan.warnings).unwrap(),
            serde_json::json!(["fallback_fetcher_unavailable"])
        );
    }

    #[tokio::test]
    async fn llm_direct_fetch_returns_plan() {
        let fetcher = Arc::new(CountingFetcher::default());
        let orchestrator = DocFetchOrchestrator::new(Some(fetcher.clone()), true);
        let outcome = orchestrator
            .fetch(&DocFetchRequest::new("Codex", "codex"), None)
            .await
            .expect("fetch ok");
        assert!(matches!(outcome, DocFetchOutcome::Planned(_)));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn falls_back_to_fetcher() {
        let fetcher = Arc::new(CountingFetcher::default());
        let orchestrator = DocFetchOrchestrator::new(Some(fetcher.clone()), false);
        let result = fetched(
            orchestrator
                .fetch(&DocFetchRequest::new("Gemini", "gemini"), None)
                .await
                .expect("fetch ok"),
        );
        assert_eq!(result.mode, FetchMode::FallbackFetcher);
        assert_eq!(result.snippets[0].content, "doc snippet");
        assert_eq!(result.snippets[0].topic, TOPIC_CONFIG_FORMAT);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_serves_repeat_fetches() {
        let fetcher = Arc::new(CountingFetcher::default());
        let orchestrator = DocFetchOrchestrator::new(Some(fetcher.clone()), false)
            .with_cache(DocFetchCache::new(Duration::from_secs(60)));
        let request = DocFetchRequest::new("Claude", "claude");
        let first = fetched(orchestrator.fetch(&request, None).await.expect("fetch ok"));
        let second = fetched(orchestrator.fetch(&request, None).await.expect("fetch ok"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.snippets, second.snippets);

        let scoped = request.clone().with_scope("project");
        orchestrator.fetch(&scoped, None).await.expect("fetch ok");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn insert_sweeps_stale_entries() {
        let cache = DocFetchCache::new(Duration::from_secs(5));
        let queries = build_doc_queries(&DocFetchRequest::new("Codex", "codex"), None);
        for i in 0..100 {
            let request = DocFetchRequest::new("Codex", "codex").with_scope(format!("scope-{i}"));
            cache.insert(&request, &queries, Vec::new());
        }
        assert_eq!(cache.entry_count(), 100);
        tokio::time::advance(Duration::from_secs(6)).await;
        cache.insert(&DocFetchRequest::new("Codex", "codex"), &queries, Vec::new());
        assert_eq!(cache.entry_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cache_entries_expire() {
        let fetcher = Arc::new(CountingFetcher::default());
        let orchestrator = DocFetchOrchestrator::new(Some(fetcher.clone()), false)
            .with_cache(DocFetchCache::new(Duration::from_secs(5)));
        let request = DocFetchRequest::new("Gemini", "gemini");
        orchestrator.fetch(&request, None).await.expect("fetch ok");
        tokio::time::advance(Duration::from_secs(10)).await;
        orchestrator.fetch(&request, None).await.expect("fetch ok");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }
}
