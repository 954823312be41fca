//! Generic block-level elements as produced by the Markdown front end.
//!
//! An element is identified by its tag name. Tags of the form `h1`..`h6`
//! are headings; everything else is opaque content to the outliner.

use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// Classification of an element by its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// A heading carrying its level (1 to 6).
    Heading(u8),
    /// Any other block.
    Block,
}

/// Returns the heading level encoded in `tag`, if it is a heading tag.
///
/// Only two-character tags made of `h` (either case) and a digit from
/// `1` to `6` qualify. `h0`, `h7`, `h10` and the bare `h` are content.
pub fn heading_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h' | b'H', digit @ b'1'..=b'6'] => Some(digit - b'0'),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Element {
    /// Tag name. Empty for raw HTML fragments, which render verbatim.
    pub tag: String,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub attrs: IndexMap<String, String>,
    /// Plain text content, used for titles, slugs and debug output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Pre-rendered markup for the whole element. When present the element
    /// is emitted verbatim instead of being serialized from its parts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Arc<Element>>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// A raw HTML block with no wrapping tag.
    pub fn fragment(html: impl Into<String>) -> Self {
        Self {
            markup: Some(html.into()),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_markup(mut self, html: impl Into<String>) -> Self {
        self.markup = Some(html.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: impl Into<Arc<Element>>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn kind(&self) -> ElementKind {
        match heading_level(&self.tag) {
            Some(level) => ElementKind::Heading(level),
            None => ElementKind::Block,
        }
    }

    pub fn heading_level(&self) -> Option<u8> {
        heading_level(&self.tag)
    }

    pub fn is_fragment(&self) -> bool {
        self.tag.is_empty()
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Plain text of this element and, failing that, of its descendants.
    pub fn plain_text(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        self.children
            .iter()
            .map(|child| child.plain_text())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
