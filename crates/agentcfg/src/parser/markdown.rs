//! Line-oriented markdown block parser.
//!
//! The parser makes a single forward pass and emits one node per contiguous
//! structural unit. Node line ranges are 1-based, end-exclusive, and together
//! cover every input line exactly once. Malformed input (an unterminated code
//! fence, say) degrades to a best-effort node instead of failing.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-+*]|\d+[.)])\s").expect("LIST_RE is a valid regex"));
static ORDERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\d+[.)]\s").expect("ORDERED_RE is a valid regex"));

const MAX_HEADING_LEVEL: usize = 6;
const MIN_FENCE_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingNode {
    pub level: usize,
    pub text: String,
    pub raw_line: String,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphNode {
    pub lines: Vec<String>,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItemNode {
    /// Marker line followed by its indented continuation lines.
    pub lines: Vec<String>,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBlockNode {
    pub ordered: bool,
    pub items: Vec<ListItemNode>,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlockNode {
    pub fence: String,
    pub info: Option<String>,
    pub lines: Vec<String>,
    pub opening_line: String,
    /// `None` when the input ended before the fence was closed.
    pub closing_line: Option<String>,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlankLineNode {
    pub lines: Vec<String>,
    pub line_start: usize,
    pub line_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkdownNode {
    Heading(HeadingNode),
    Paragraph(ParagraphNode),
    List(ListBlockNode),
    CodeBlock(CodeBlockNode),
    Blank(BlankLineNode),
}

impl MarkdownNode {
    /// 1-based `(start, end)` with `end` exclusive.
    pub fn line_range(&self) -> (usize, usize) {
        match self {
            MarkdownNode::Heading(n) => (n.line_start, n.line_end),
            MarkdownNode::Paragraph(n) => (n.line_start, n.line_end),
            MarkdownNode::List(n) => (n.line_start, n.line_end),
            MarkdownNode::CodeBlock(n) => (n.line_start, n.line_end),
            MarkdownNode::Blank(n) => (n.line_start, n.line_end),
        }
    }
}

/// Parse raw text; lines keep their terminators.
pub fn parse_markdown(text: &str) -> Vec<MarkdownNode> {
    parse_markdown_lines(split_lines(text))
}

/// Split after `\n`, `\r\n`, or a lone `\r`, keeping the terminator.
fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let end = match bytes[i] {
            b'\n' => Some(i),
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => Some(i + 1),
            b'\r' => Some(i),
            _ => None,
        };
        if let Some(end) = end {
            out.push(&text[start..=end]);
            start = end + 1;
            i = end;
        }
        i += 1;
    }
    if start < text.len() {
        out.push(&text[start..]);
    }
    out
}

/// Parse an already-split sequence of lines.
pub fn parse_markdown_lines<I, S>(lines: I) -> Vec<MarkdownNode>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
    let mut nodes = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = &lines[i];
        i = if is_blank(line) {
            consume_blank(&lines, i, &mut nodes)
        } else if let Some(fence) = fence_of(line) {
            consume_code_block(&lines, i, fence, &mut nodes)
        } else if let Some((level, text)) = heading_of(line) {
            nodes.push(MarkdownNode::Heading(HeadingNode {
                level,
                text,
                raw_line: line.clone(),
                line_start: i + 1,
                line_end: i + 2,
            }));
            i + 1
        } else if LIST_RE.is_match(content(line)) {
            consume_list(&lines, i, &mut nodes)
        } else {
            consume_paragraph(&lines, i, &mut nodes)
        };
    }
    nodes
}

fn content(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

struct Fence {
    marker: String,
    info: Option<String>,
}

fn fence_of(line: &str) -> Option<Fence> {
    let t = content(line).trim_start();
    let ch = t.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = t.chars().take_while(|c| *c == ch).count();
    if len < MIN_FENCE_LEN {
        return None;
    }
    let marker: String = std::iter::repeat_n(ch, len).collect();
    let info = t[marker.len()..].trim();
    Some(Fence {
        marker,
        info: (!info.is_empty()).then(|| info.to_string()),
    })
}

fn heading_of(line: &str) -> Option<(usize, String)> {
    let t = content(line).trim_start();
    let level = t.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > MAX_HEADING_LEVEL {
        return None;
    }
    Some((level, t[level..].trim().to_string()))
}

/// Lines that end a paragraph or list item.
fn is_block_start(line: &str) -> bool {
    is_blank(line) || fence_of(line).is_some() || heading_of(line).is_some()
}

fn consume_blank(lines: &[String], start: usize, nodes: &mut Vec<MarkdownNode>) -> usize {
    let end = start
        + lines[start..]
            .iter()
            .take_while(|l| is_blank(l))
            .count();
    nodes.push(MarkdownNode::Blank(BlankLineNode {
        lines: lines[start..end].to_vec(),
        line_start: start + 1,
        line_end: end + 1,
    }));
    end
}

fn consume_code_block(
    lines: &[String],
    start: usize,
    fence: Fence,
    nodes: &mut Vec<MarkdownNode>,
) -> usize {
    let close = lines[start + 1..]
        .iter()
        .position(|l| content(l).trim_start().starts_with(&fence.marker))
        .map(|offset| start + 1 + offset);
    let body_end = close.unwrap_or(lines.len());
    let next = close.map_or(lines.len(), |c| c + 1);
    nodes.push(MarkdownNode::CodeBlock(CodeBlockNode {
        fence: fence.marker,
        info: fence.info,
        lines: lines[start + 1..body_end].to_vec(),
        opening_line: lines[start].clone(),
        closing_line: close.map(|c| lines[c].clone()),
        line_start: start + 1,
        line_end: next + 1,
    }));
    next
}

fn consume_list(lines: &[String], start: usize, nodes: &mut Vec<MarkdownNode>) -> usize {
    let ordered = ORDERED_RE.is_match(content(&lines[start]));
    let mut items = Vec::new();
    let mut i = start;
    while i < lines.len() && !is_block_start(&lines[i]) && LIST_RE.is_match(content(&lines[i])) {
        let item_start = i;
        i += 1;
        while i < lines.len() {
            let next = &lines[i];
            if is_block_start(next) || LIST_RE.is_match(content(next)) {
                break;
            }
            if !next.starts_with([' ', '\t']) {
                break;
            }
            i += 1;
        }
        items.push(ListItemNode {
            lines: lines[item_start..i].to_vec(),
            line_start: item_start + 1,
            line_end: i + 1,
        });
    }
    nodes.push(MarkdownNode::List(ListBlockNode {
        ordered,
        items,
        line_start: start + 1,
        line_end: i + 1,
    }));
    i
}

fn consume_paragraph(lines: &[String], start: usize, nodes: &mut Vec<MarkdownNode>) -> usize {
    let mut i = start;
    while i < lines.len() && !is_block_start(&lines[i]) && !LIST_RE.is_match(content(&lines[i])) {
        i += 1;
    }
    nodes.push(MarkdownNode::Paragraph(ParagraphNode {
        lines: lines[start..i].to_vec(),
        line_start: start + 1,
        line_end: i + 1,
    }));
    i
}
