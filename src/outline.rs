//! Section nesting.
//!
//! Turns the flat list of top-level blocks of a document into a tree of
//! sections. Every heading opens a section whose first child is the heading
//! itself; the blocks that follow it, up to the next heading of the same or
//! a shallower level, become children of that section.
//!
//! ```text
//! h1 p h2 p h1 p   =>   section1[h1 p section2[h2 p]] section1[h1 p]
//! ```

use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::element::{Element, ElementKind};
use crate::error::OutlineError;

/// Number of characters of element text shown by [`Outline::dump`].
const DUMP_TEXT_CHARS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementKind),
    Section,
}

/// A node of the nested tree: either an original element or a synthesized
/// section.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    Element(Arc<Element>),
    Section(Section),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Element(element) => NodeKind::Element(element.kind()),
            Node::Section(_) => NodeKind::Section,
        }
    }

    /// Heading level for headings, nesting level for sections.
    pub fn level(&self) -> Option<u8> {
        match self {
            Node::Element(element) => element.heading_level(),
            Node::Section(section) => Some(section.level),
        }
    }

    /// Child nodes of a section. Elements are leaves of the outline.
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(_) => &[],
            Node::Section(section) => &section.children,
        }
    }

    pub fn as_element(&self) -> Option<&Arc<Element>> {
        match self {
            Node::Element(element) => Some(element),
            Node::Section(_) => None,
        }
    }

    pub fn as_section(&self) -> Option<&Section> {
        match self {
            Node::Section(section) => Some(section),
            Node::Element(_) => None,
        }
    }
}

/// A section container opened by a heading.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub level: u8,
    pub children: Vec<Node>,
}

impl Section {
    fn open(level: u8, heading: Arc<Element>) -> Self {
        Self {
            level,
            children: vec![Node::Element(heading)],
        }
    }

    /// The heading that opened this section.
    pub fn heading(&self) -> Option<&Arc<Element>> {
        self.children.first().and_then(Node::as_element)
    }
}

/// The nested document produced by [`outline`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct Outline {
    pub children: Vec<Node>,
}

impl Outline {
    /// Original elements in document order, with sections unwrapped.
    pub fn flatten(&self) -> Vec<Arc<Element>> {
        let mut elements = Vec::new();
        collect_elements(&self.children, &mut elements);
        elements
    }

    /// Total number of sections at any depth.
    pub fn section_count(&self) -> usize {
        count_sections(&self.children)
    }

    pub fn to_json(&self) -> Result<String, OutlineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Indented textual dump of the tree, one node per line.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            dump_node(node, 0, &mut out);
        }
        out
    }
}

fn collect_elements(nodes: &[Node], out: &mut Vec<Arc<Element>>) {
    for node in nodes {
        match node {
            Node::Element(element) => out.push(Arc::clone(element)),
            Node::Section(section) => collect_elements(&section.children, out),
        }
    }
}

fn count_sections(nodes: &[Node]) -> usize {
    nodes
        .iter()
        .filter_map(Node::as_section)
        .map(|section| 1 + count_sections(&section.children))
        .sum()
}

fn dump_node(node: &Node, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match node {
        Node::Section(section) => {
            let _ = writeln!(out, "{}<section> level={}", indent, section.level);
            for child in &section.children {
                dump_node(child, depth + 1, out);
            }
        }
        Node::Element(element) => {
            // Fragments carry no text; show the start of their markup.
            let source = match element.markup.as_deref() {
                Some(markup) if element.is_fragment() => markup.to_string(),
                _ => element.plain_text(),
            };
            let text: String = source
                .chars()
                .take(DUMP_TEXT_CHARS)
                .collect::<String>()
                .trim()
                .replace('\n', " ");
            let tag = if element.is_fragment() {
                "#html"
            } else {
                element.tag.as_str()
            };
            let _ = writeln!(out, "{}<{}> \"{}\"", indent, tag, text);
        }
    }
}

/// Open sections during one pass, innermost last. Levels strictly increase
/// from bottom to top; an empty stack stands for the level-0 document root.
struct LevelStack {
    open: Vec<Section>,
}

impl LevelStack {
    fn new() -> Self {
        Self { open: Vec::new() }
    }

    fn current_level(&self) -> u8 {
        self.open.last().map_or(0, |section| section.level)
    }

    /// Appends a node to the innermost open section, or to the root.
    fn push_node(&mut self, root: &mut Vec<Node>, node: Node) {
        match self.open.last_mut() {
            Some(section) => section.children.push(node),
            None => root.push(node),
        }
    }

    fn start_section(&mut self, level: u8, heading: Arc<Element>) {
        self.open.push(Section::open(level, heading));
    }

    /// Closes the innermost section and attaches it to its parent. A parent
    /// receives no children while a subsection is open above it, so
    /// attaching on close keeps document order.
    fn end_section(&mut self, root: &mut Vec<Node>) {
        if let Some(section) = self.open.pop() {
            self.push_node(root, Node::Section(section));
        }
    }
}

/// Nests `elements` into sections by heading level.
///
/// The input is left untouched; the output shares its elements.
pub fn outline(elements: &[Arc<Element>]) -> Outline {
    let mut root = Vec::with_capacity(elements.len());
    let mut stack = LevelStack::new();

    for element in elements {
        match element.heading_level() {
            None => stack.push_node(&mut root, Node::Element(Arc::clone(element))),
            Some(level) => {
                while stack.current_level() >= level {
                    stack.end_section(&mut root);
                }
                stack.start_section(level, Arc::clone(element));
            }
        }
    }

    while stack.current_level() > 0 {
        stack.end_section(&mut root);
    }

    Outline { children: root }
}
