//! PSS Outline
//!
//! Nests the flat block sequence of a Markdown document into `section`
//! containers by heading level, and renders the result as HTML.

pub mod builder;
pub mod config;
pub mod element;
pub mod error;
pub mod outline;
pub mod parser;
pub mod renderer;

pub use builder::{BuildStats, OutlineBuilder, RenderedDocument};
pub use crate::config::OutlineConfig;
pub use element::{heading_level, Element, ElementKind};
pub use error::{BuildErrorReport, OutlineError};
pub use outline::{outline, Node, NodeKind, Outline, Section};
pub use parser::{ParsedDocument, Parser};
pub use renderer::HtmlRenderer;
