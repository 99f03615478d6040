//! Parsers for agent instruction sources.
//!
//! Agent instruction files are markdown; [`markdown`] turns them into an
//! ordered list of typed blocks for downstream rendering.

pub mod markdown;

pub use markdown::{MarkdownNode, parse_markdown, parse_markdown_lines};
