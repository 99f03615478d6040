//! Documentation pipeline: fetch snippets, extract evidence, normalize into
//! a per-agent model.

pub mod extract;
pub mod fetch;
pub mod model;

pub use extract::{DocEvidence, DocExtractInputs, extract_doc_inputs};
pub use fetch::{
    DocFetchCache, DocFetchOrchestrator, DocFetchOutcome, DocFetchPlan, DocFetchQuery,
    DocFetchRequest, DocFetchResult, DocFetchWarning, DocFetcher, DocSnippet, FetchMode,
    build_doc_queries, default_query_templates,
};
pub use model::{AgentDocModel, DocModelWarning, DocValueGroup, normalize_doc_inputs};
