//! Portable Text rendering
//!
//! The content store keeps article bodies as a flat array of typed blocks.
//! Each block holds spans of text with marks (decorators such as `strong`,
//! or keys into the block's `markDefs` for annotations such as links).
//! List items are ordinary blocks carrying `listItem` and `level`, so lists
//! are reassembled here from runs of consecutive items.
//!
//! Markup is produced through a [`Components`] table the caller supplies,
//! one entry per block style, list kind, list item kind and mark.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::helpers::html_escape;

/// A top-level body block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(rename = "_type", default)]
    pub kind: String,
    #[serde(rename = "_key", default)]
    pub key: Option<String>,
    #[serde(default)]
    pub style: Option<String>,
    #[serde(default)]
    pub list_item: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub children: Vec<Span>,
    #[serde(default)]
    pub mark_defs: Vec<MarkDef>,
}

impl Block {
    /// A text block with a single unmarked span
    pub fn text(style: &str, text: &str) -> Self {
        Self {
            kind: "block".to_string(),
            style: Some(style.to_string()),
            children: vec![Span::plain(text)],
            ..Default::default()
        }
    }

    /// A list item block with a single unmarked span
    pub fn list_item(kind: &str, level: u32, text: &str) -> Self {
        Self {
            list_item: Some(kind.to_string()),
            level: Some(level),
            ..Self::text("normal", text)
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == "block"
    }

    pub fn level(&self) -> u32 {
        self.level.unwrap_or(1).max(1)
    }

    fn style(&self) -> &str {
        self.style.as_deref().unwrap_or("normal")
    }

    /// Concatenated span text
    pub fn plain_text(&self) -> String {
        self.children.iter().map(|s| s.text.as_str()).collect()
    }
}

/// An inline run of text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "_type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub marks: Vec<String>,
}

impl Span {
    pub fn plain(text: &str) -> Self {
        Self {
            kind: "span".to_string(),
            text: text.to_string(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: &str, marks: &[&str]) -> Self {
        Self {
            marks: marks.iter().map(|m| m.to_string()).collect(),
            ..Self::plain(text)
        }
    }
}

/// Annotation referenced from span marks by key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(default)]
    pub href: Option<String>,
}

/// Wraps already-rendered children
pub type WrapFn = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Wraps rendered children with access to the annotation, if any
pub type MarkFn = Box<dyn Fn(&str, Option<&MarkDef>) -> String + Send + Sync>;

/// Mapping table from document node types to markup
pub struct Components {
    block: HashMap<String, WrapFn>,
    list: HashMap<String, WrapFn>,
    list_item: HashMap<String, WrapFn>,
    marks: HashMap<String, MarkFn>,
}

impl Components {
    /// An empty table; unmapped nodes pass their children through
    pub fn empty() -> Self {
        Self {
            block: HashMap::new(),
            list: HashMap::new(),
            list_item: HashMap::new(),
            marks: HashMap::new(),
        }
    }

    pub fn block<F>(mut self, style: &str, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.block.insert(style.to_string(), Box::new(f));
        self
    }

    pub fn list<F>(mut self, kind: &str, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.list.insert(kind.to_string(), Box::new(f));
        self
    }

    pub fn list_item<F>(mut self, kind: &str, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.list_item.insert(kind.to_string(), Box::new(f));
        self
    }

    /// Register a decorator (`strong`) or annotation type (`link`)
    pub fn mark<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&str, Option<&MarkDef>) -> String + Send + Sync + 'static,
    {
        self.marks.insert(name.to_string(), Box::new(f));
        self
    }
}

impl Default for Components {
    /// Plain HTML without classes
    fn default() -> Self {
        Self::empty()
            .block("normal", |c| format!("<p>{}</p>", c))
            .block("h1", |c| format!("<h1>{}</h1>", c))
            .block("h2", |c| format!("<h2>{}</h2>", c))
            .block("h3", |c| format!("<h3>{}</h3>", c))
            .block("blockquote", |c| format!("<blockquote>{}</blockquote>", c))
            .list("bullet", |c| format!("<ul>{}</ul>", c))
            .list("number", |c| format!("<ol>{}</ol>", c))
            .list_item("bullet", |c| format!("<li>{}</li>", c))
            .list_item("number", |c| format!("<li>{}</li>", c))
            .mark("strong", |c, _| format!("<strong>{}</strong>", c))
            .mark("em", |c, _| format!("<em>{}</em>", c))
            .mark("link", |c, def| match def.and_then(|d| d.href.as_deref()) {
                Some(href) => match safe_href(href) {
                    Some(href) => format!(r#"<a href="{}">{}</a>"#, html_escape(href), c),
                    None => c.to_string(),
                },
                None => c.to_string(),
            })
    }
}

/// Return the href if it is safe to emit as a link target
///
/// Relative references and `http`, `https`, `mailto` and `tel` URLs pass.
pub fn safe_href(href: &str) -> Option<&str> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    match url::Url::parse(href) {
        Ok(url) => matches!(url.scheme(), "http" | "https" | "mailto" | "tel").then_some(href),
        Err(url::ParseError::RelativeUrlWithoutBase) => Some(href),
        Err(_) => None,
    }
}

/// Renders Portable Text through a [`Components`] table
pub struct PortableTextRenderer {
    components: Components,
}

impl PortableTextRenderer {
    pub fn new(components: Components) -> Self {
        Self { components }
    }

    /// Render a whole document
    pub fn render(&self, blocks: &[Block]) -> String {
        let mut out = String::new();
        let mut i = 0;

        while i < blocks.len() {
            let block = &blocks[i];
            if !block.is_text() {
                tracing::debug!("Skipping unsupported block type {:?}", block.kind);
                i += 1;
                continue;
            }

            if block.list_item.is_some() {
                let end = blocks[i..]
                    .iter()
                    .position(|b| !b.is_text() || b.list_item.is_none())
                    .map_or(blocks.len(), |n| i + n);
                let items: Vec<&Block> = blocks[i..end].iter().collect();
                out.push_str(&self.render_list(&items));
                i = end;
                continue;
            }

            let children = self.render_spans(block);
            out.push_str(&self.wrap_block(block.style(), &children));
            i += 1;
        }

        out
    }

    /// Render a run of list items whose first item sets the list level
    fn render_list(&self, items: &[&Block]) -> String {
        let level = items[0].level();
        let mut out = String::new();
        let mut i = 0;

        while i < items.len() {
            let kind = list_kind(items[i]);
            let mut inner = String::new();

            while i < items.len() && list_kind(items[i]) == kind {
                let mut content = self.render_spans(items[i]);
                let start = i + 1;
                let mut end = start;
                while end < items.len() && items[end].level() > level {
                    end += 1;
                }
                if end > start {
                    content.push_str(&self.render_list(&items[start..end]));
                }
                inner.push_str(&apply(&self.components.list_item, kind, "bullet", &content));
                i = end;
            }

            out.push_str(&apply(&self.components.list, kind, "bullet", &inner));
        }

        out
    }

    fn wrap_block(&self, style: &str, children: &str) -> String {
        apply(&self.components.block, style, "normal", children)
    }

    /// Render the spans of a block, nesting marks that span several runs
    fn render_spans(&self, block: &Block) -> String {
        let spans = &block.children;
        let mut nodes = vec![MarkNode::default()];
        let mut stack = vec![0usize];

        for (i, span) in spans.iter().enumerate() {
            // Marks that run longest open first so they enclose shorter ones
            let mut needed: Vec<&String> = span.marks.iter().collect();
            needed.sort_by(|a, b| {
                run_length(spans, i, b)
                    .cmp(&run_length(spans, i, a))
                    .then_with(|| a.cmp(b))
            });
            needed.dedup();

            let mut keep = 1;
            while keep < stack.len() {
                let open = nodes[stack[keep]].mark.as_ref();
                match open.and_then(|m| needed.iter().position(|n| *n == m)) {
                    Some(idx) => {
                        needed.remove(idx);
                        keep += 1;
                    }
                    None => break,
                }
            }
            stack.truncate(keep);

            for mark in needed {
                let id = nodes.len();
                nodes.push(MarkNode {
                    mark: Some(mark.clone()),
                    children: Vec::new(),
                });
                let parent = *stack.last().unwrap_or(&0);
                nodes[parent].children.push(Child::Node(id));
                stack.push(id);
            }

            let top = *stack.last().unwrap_or(&0);
            nodes[top].children.push(Child::Text(html_escape(&span.text)));
        }

        self.render_node(&nodes, 0, block)
    }

    fn render_node(&self, nodes: &[MarkNode], id: usize, block: &Block) -> String {
        let node = &nodes[id];
        let inner: String = node
            .children
            .iter()
            .map(|child| match child {
                Child::Text(text) => text.clone(),
                Child::Node(child) => self.render_node(nodes, *child, block),
            })
            .collect();

        let Some(mark) = node.mark.as_deref() else {
            return inner;
        };

        let def = block.mark_defs.iter().find(|d| d.key == mark);
        let name = def.map_or(mark, |d| d.kind.as_str());
        match self.components.marks.get(name) {
            Some(f) => f(&inner, def),
            None => {
                tracing::debug!("No component for mark {:?}", name);
                inner
            }
        }
    }
}

impl Default for PortableTextRenderer {
    fn default() -> Self {
        Self::new(Components::default())
    }
}

/// Plain text of a document, one line per text block
pub fn to_plain_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .filter(|b| b.is_text())
        .map(Block::plain_text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[derive(Default)]
struct MarkNode {
    mark: Option<String>,
    children: Vec<Child>,
}

enum Child {
    Text(String),
    Node(usize),
}

fn list_kind(block: &Block) -> &str {
    block.list_item.as_deref().unwrap_or("bullet")
}

fn apply(table: &HashMap<String, WrapFn>, key: &str, fallback: &str, children: &str) -> String {
    match table.get(key).or_else(|| table.get(fallback)) {
        Some(f) => f(children),
        None => children.to_string(),
    }
}

/// Number of consecutive spans from `start` carrying `mark`
fn run_length(spans: &[Span], start: usize, mark: &str) -> usize {
    spans[start..]
        .iter()
        .take_while(|s| s.marks.iter().any(|m| m == mark))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(blocks: &[Block]) -> String {
        PortableTextRenderer::default().render(blocks)
    }

    #[test]
    fn test_paragraph_and_headings() {
        let html = render(&[
            Block::text("h2", "Overview"),
            Block::text("normal", "Body text"),
            Block::text("h9", "Unknown style"),
        ]);
        assert_eq!(
            html,
            "<h2>Overview</h2><p>Body text</p><p>Unknown style</p>"
        );
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render(&[Block::text("normal", "a < b & \"c\"")]);
        assert_eq!(html, "<p>a &lt; b &amp; &quot;c&quot;</p>");
    }

    #[test]
    fn test_lists_are_grouped() {
        let html = render(&[
            Block::list_item("bullet", 1, "one"),
            Block::list_item("bullet", 1, "two"),
            Block::list_item("number", 1, "first"),
            Block::text("normal", "after"),
        ]);
        assert_eq!(
            html,
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>after</p>"
        );
    }

    #[test]
    fn test_nested_list() {
        let html = render(&[
            Block::list_item("bullet", 1, "parent"),
            Block::list_item("number", 2, "child"),
            Block::list_item("bullet", 1, "sibling"),
        ]);
        assert_eq!(
            html,
            "<ul><li>parent<ol><li>child</li></ol></li><li>sibling</li></ul>"
        );
    }

    #[test]
    fn test_decorators_nest_by_run_length() {
        let block = Block {
            children: vec![
                Span::marked("bold ", &["strong"]),
                Span::marked("both", &["em", "strong"]),
                Span::plain(" plain"),
            ],
            ..Block::text("normal", "")
        };
        assert_eq!(
            render(&[block]),
            "<p><strong>bold <em>both</em></strong> plain</p>"
        );
    }

    #[test]
    fn test_link_annotation() {
        let block = Block {
            children: vec![Span::marked("docs", &["k1"])],
            mark_defs: vec![MarkDef {
                key: "k1".to_string(),
                kind: "link".to_string(),
                href: Some("https://example.com/?a=1&b=2".to_string()),
            }],
            ..Block::text("normal", "")
        };
        assert_eq!(
            render(&[block]),
            r#"<p><a href="https://example.com/?a=1&amp;b=2">docs</a></p>"#
        );
    }

    #[test]
    fn test_unsafe_link_is_dropped() {
        let block = Block {
            children: vec![Span::marked("click", &["k1"])],
            mark_defs: vec![MarkDef {
                key: "k1".to_string(),
                kind: "link".to_string(),
                href: Some("javascript:alert(1)".to_string()),
            }],
            ..Block::text("normal", "")
        };
        assert_eq!(render(&[block]), "<p>click</p>");
    }

    #[test]
    fn test_safe_href() {
        assert_eq!(safe_href("/contact"), Some("/contact"));
        assert_eq!(safe_href("mailto:a@b.com"), Some("mailto:a@b.com"));
        assert_eq!(safe_href("data:text/html,x"), None);
        assert_eq!(safe_href("  "), None);
    }

    #[test]
    fn test_non_text_blocks_skipped() {
        let image = Block {
            kind: "image".to_string(),
            ..Default::default()
        };
        let html = render(&[image, Block::text("normal", "kept")]);
        assert_eq!(html, "<p>kept</p>");
    }

    #[test]
    fn test_custom_components() {
        let components = Components::empty().block("normal", |c| format!("<div>{}</div>", c));
        let html = PortableTextRenderer::new(components).render(&[Block::text("h1", "x")]);
        assert_eq!(html, "<div>x</div>");
    }

    #[test]
    fn test_plain_text() {
        let text = to_plain_text(&[Block::text("h1", "Title"), Block::text("normal", "Body")]);
        assert_eq!(text, "Title\n\nBody");
    }
}
