//! Outline-to-HTML renderer.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::config::OutlineConfig;
use crate::element::Element;
use crate::outline::{Node, Outline, Section};

/// Tags written without a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img", "input", "meta", "link", "wbr"];

/// HTML renderer for nested outlines.
pub struct HtmlRenderer {
    section_tag: String,
    class_prefix: String,
    section_ids: bool,
    standalone: bool,
    stylesheet: Option<String>,
}

impl Default for HtmlRenderer {
    fn default() -> Self {
        Self::new(&OutlineConfig::default())
    }
}

impl HtmlRenderer {
    pub fn new(config: &OutlineConfig) -> Self {
        Self {
            section_tag: config.outline.section_tag.clone(),
            class_prefix: config.outline.class_prefix.clone(),
            section_ids: config.outline.section_ids,
            standalone: config.output.standalone,
            stylesheet: config.output.stylesheet.clone(),
        }
    }

    /// Render an outline to an HTML fragment.
    pub fn render_outline(&self, outline: &Outline) -> String {
        let mut html = String::new();
        let mut slugs = SlugRegistry::default();
        for node in &outline.children {
            self.render_node(node, &mut slugs, &mut html);
        }
        html
    }

    /// Wrap a rendered body in a full page when standalone output is on.
    pub fn render_page(&self, title: &str, body: &str) -> String {
        if !self.standalone {
            return body.to_string();
        }

        let mut page = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
        let _ = writeln!(page, "<title>{}</title>", html_escape::encode_text(title));
        if let Some(stylesheet) = &self.stylesheet {
            let _ = writeln!(
                page,
                "<link rel=\"stylesheet\" href=\"{}\">",
                html_escape::encode_double_quoted_attribute(stylesheet)
            );
        }
        page.push_str("</head>\n<body>\n");
        page.push_str(body);
        page.push_str("</body>\n</html>\n");
        page
    }

    fn render_node(&self, node: &Node, slugs: &mut SlugRegistry, html: &mut String) {
        match node {
            Node::Section(section) => self.render_section(section, slugs, html),
            Node::Element(element) => {
                if let Some(markup) = &element.markup {
                    html.push_str(markup);
                    if !markup.ends_with('\n') {
                        html.push('\n');
                    }
                } else {
                    write_element(element, html);
                    html.push('\n');
                }
            }
        }
    }

    fn render_section(&self, section: &Section, slugs: &mut SlugRegistry, html: &mut String) {
        let _ = write!(
            html,
            "<{} class=\"{}{}\"",
            self.section_tag,
            html_escape::encode_double_quoted_attribute(&self.class_prefix),
            section.level
        );

        if self.section_ids {
            // Headings with an explicit id keep it; the section stays anonymous.
            if let Some(heading) = section.heading().filter(|h| h.attr("id").is_none()) {
                let id = slugs.unique(&slugify(&heading.plain_text()));
                let _ = write!(html, " id=\"{}\"", html_escape::encode_double_quoted_attribute(&id));
            }
        }
        html.push_str(">\n");

        for child in &section.children {
            self.render_node(child, slugs, html);
        }

        let _ = writeln!(html, "</{}>", self.section_tag);
    }
}

/// Serialize an element from its tag, attributes, text and children.
fn write_element(element: &Element, html: &mut String) {
    if let Some(markup) = &element.markup {
        html.push_str(markup.trim_end());
        return;
    }

    let _ = write!(html, "<{}", element.tag);
    for (name, value) in &element.attrs {
        let _ = write!(
            html,
            " {}=\"{}\"",
            name,
            html_escape::encode_double_quoted_attribute(value)
        );
    }
    html.push('>');

    if VOID_TAGS.contains(&element.tag.to_ascii_lowercase().as_str()) {
        return;
    }

    if let Some(text) = &element.text {
        html.push_str(&html_escape::encode_text(text));
    }
    for child in &element.children {
        write_element(child, html);
    }
    let _ = write!(html, "</{}>", element.tag);
}

/// Hands out document-unique anchor ids.
#[derive(Default)]
struct SlugRegistry {
    seen: HashMap<String, usize>,
}

impl SlugRegistry {
    fn unique(&mut self, slug: &str) -> String {
        let base = if slug.is_empty() { "section" } else { slug };
        let count = self.seen.entry(base.to_string()).or_insert(0);
        let id = if *count == 0 {
            base.to_string()
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;
        id
    }
}

/// Convert text to a URL-safe slug for anchor IDs.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c
            } else if c.is_whitespace() || c == '-' || c == '_' || c == '.' {
                '-'
            } else {
                '\0'
            }
        })
        .filter(|c| *c != '\0')
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}
