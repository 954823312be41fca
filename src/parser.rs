use log::debug;
use pulldown_cmark::{html, CowStr, Event, Options, Parser as MarkdownParser, Tag, TagEnd};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::MarkdownOptions;
use crate::element::Element;

/// Flat result of parsing one Markdown source.
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    pub title: String,
    /// Top-level blocks in document order.
    pub elements: Vec<Arc<Element>>,
}

/// Splits Markdown into top-level block elements.
pub struct Parser {
    options: Options,
}

impl Parser {
    pub fn new(markdown: &MarkdownOptions) -> Self {
        let mut options = Options::empty();
        options.set(Options::ENABLE_TABLES, markdown.tables);
        options.set(Options::ENABLE_FOOTNOTES, markdown.footnotes);
        options.set(Options::ENABLE_STRIKETHROUGH, markdown.strikethrough);
        options.set(Options::ENABLE_TASKLISTS, markdown.tasklists);
        options.set(Options::ENABLE_HEADING_ATTRIBUTES, markdown.heading_attributes);
        Self { options }
    }

    pub fn parse(&self, content: &str) -> ParsedDocument {
        let elements = self.parse_blocks(content);
        let title = extract_title(&elements);

        debug!(
            "Parsed markdown: {} top-level blocks ({} chars), title {:?}",
            elements.len(),
            content.len(),
            title
        );

        ParsedDocument { title, elements }
    }

    fn parse_blocks(&self, content: &str) -> Vec<Arc<Element>> {
        let mut elements = Vec::new();
        let mut block: Option<BlockBuilder> = None;
        let mut depth = 0usize;
        let mut footnotes = FootnoteNumbers::default();

        for event in MarkdownParser::new_ext(content, self.options) {
            match event {
                Event::Start(tag) => {
                    if depth == 0 {
                        block = Some(BlockBuilder::start(&tag));
                    }
                    depth += 1;
                    if let Some(builder) = block.as_mut() {
                        builder.events.push(footnotes.rewrite(Event::Start(tag)));
                    }
                }
                Event::End(tag_end) => {
                    depth = depth.saturating_sub(1);
                    if let Some(builder) = block.as_mut() {
                        builder.events.push(footnotes.rewrite(Event::End(tag_end)));
                    }
                    if depth == 0 {
                        if let Some(builder) = block.take() {
                            elements.push(Arc::new(builder.finish()));
                        }
                    }
                }
                Event::Rule if depth == 0 => {
                    elements.push(Arc::new(Element::new("hr").with_markup("<hr />\n")));
                }
                other if depth == 0 => {
                    // Stray inline content outside any block.
                    let mut markup = String::new();
                    html::push_html(&mut markup, std::iter::once(other));
                    elements.push(Arc::new(Element::fragment(markup)));
                }
                other => {
                    if let Some(builder) = block.as_mut() {
                        builder.push_text(&other);
                        builder.events.push(footnotes.rewrite(other));
                    }
                }
            }
        }

        elements
    }
}

/// Footnote numbers shared by every block of one document.
///
/// Blocks are rendered separately, so the HTML writer's own numbering would
/// restart at 1 in each block. References and definitions are written here
/// instead, numbered by first appearance the way pulldown-cmark does it.
#[derive(Default)]
struct FootnoteNumbers {
    numbers: HashMap<String, usize>,
}

impl FootnoteNumbers {
    fn number(&mut self, name: &str) -> usize {
        let next = self.numbers.len() + 1;
        *self.numbers.entry(name.to_string()).or_insert(next)
    }

    fn rewrite<'a>(&mut self, event: Event<'a>) -> Event<'a> {
        match event {
            Event::FootnoteReference(name) => {
                let number = self.number(&name);
                let markup = format!(
                    "<sup class=\"footnote-reference\"><a href=\"#{}\">{}</a></sup>",
                    html_escape::encode_double_quoted_attribute(&*name),
                    number
                );
                Event::InlineHtml(CowStr::from(markup))
            }
            Event::Start(Tag::FootnoteDefinition(name)) => {
                let number = self.number(&name);
                let markup = format!(
                    "<div class=\"footnote-definition\" id=\"{}\"><sup class=\"footnote-definition-label\">{}</sup>",
                    html_escape::encode_double_quoted_attribute(&*name),
                    number
                );
                Event::Html(CowStr::from(markup))
            }
            Event::End(TagEnd::FootnoteDefinition) => Event::Html(CowStr::Borrowed("</div>\n")),
            other => other,
        }
    }
}

/// Events of one top-level block, accumulated until its end tag.
struct BlockBuilder<'a> {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    events: Vec<Event<'a>>,
}

impl<'a> BlockBuilder<'a> {
    fn start(tag: &Tag<'a>) -> Self {
        let mut attrs = Vec::new();
        if let Tag::Heading { id, classes, .. } = tag {
            if let Some(id) = id {
                attrs.push(("id".to_string(), id.to_string()));
            }
            if !classes.is_empty() {
                let classes: Vec<&str> = classes.iter().map(|c| &**c).collect();
                attrs.push(("class".to_string(), classes.join(" ")));
            }
        }

        Self {
            tag: block_tag(tag).to_string(),
            attrs,
            text: String::new(),
            events: Vec::new(),
        }
    }

    fn push_text(&mut self, event: &Event<'a>) {
        match event {
            Event::Text(text) | Event::Code(text) => self.text.push_str(text),
            Event::SoftBreak | Event::HardBreak => self.text.push(' '),
            _ => {}
        }
    }

    fn finish(self) -> Element {
        let mut markup = String::new();
        html::push_html(&mut markup, self.events.into_iter());

        let mut element = Element::new(self.tag).with_markup(markup);
        for (name, value) in self.attrs {
            element = element.with_attr(name, value);
        }
        let text = self.text.trim();
        if !text.is_empty() {
            element = element.with_text(text);
        }
        element
    }
}

/// HTML tag name a top-level block renders as. Raw HTML blocks have none.
fn block_tag(tag: &Tag<'_>) -> &'static str {
    match tag {
        Tag::Paragraph => "p",
        Tag::Heading { level, .. } => match *level as usize {
            1 => "h1",
            2 => "h2",
            3 => "h3",
            4 => "h4",
            5 => "h5",
            _ => "h6",
        },
        Tag::BlockQuote(_) => "blockquote",
        Tag::CodeBlock(_) => "pre",
        Tag::HtmlBlock | Tag::MetadataBlock(_) => "",
        Tag::List(Some(_)) => "ol",
        Tag::List(None) => "ul",
        Tag::Table(_) => "table",
        Tag::DefinitionList => "dl",
        _ => "div",
    }
}

fn extract_title(elements: &[Arc<Element>]) -> String {
    elements
        .iter()
        .find(|element| element.heading_level() == Some(1))
        .and_then(|heading| heading.text.clone())
        .unwrap_or_else(|| "Untitled".to_string())
}
