use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::OutlineError;

/// Prefix of environment variables that override file settings, e.g.
/// `PSS_OUTLINE_OUTLINE__CLASS_PREFIX=level`.
pub const ENV_PREFIX: &str = "PSS_OUTLINE";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutlineConfig {
    pub outline: SectionOptions,
    pub markdown: MarkdownOptions,
    pub output: OutputOptions,
    pub build: BuildOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SectionOptions {
    /// Tag used for synthesized section containers.
    pub section_tag: String,
    /// Sections get `class="{class_prefix}{level}"`.
    pub class_prefix: String,
    /// Give each section an id slugged from its heading.
    pub section_ids: bool,
}

impl Default for SectionOptions {
    fn default() -> Self {
        Self {
            section_tag: "section".to_string(),
            class_prefix: "section".to_string(),
            section_ids: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MarkdownOptions {
    pub tables: bool,
    pub footnotes: bool,
    pub strikethrough: bool,
    pub tasklists: bool,
    pub heading_attributes: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            tables: true,
            footnotes: true,
            strikethrough: true,
            tasklists: true,
            heading_attributes: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputOptions {
    /// Wrap rendered bodies in a complete HTML page.
    pub standalone: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stylesheet: Option<String>,
    /// Extension given to rendered files.
    pub extension: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            standalone: false,
            stylesheet: None,
            extension: "html".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildOptions {
    pub source_extensions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_jobs: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            source_extensions: vec!["md".to_string(), "markdown".to_string()],
            parallel_jobs: None,
        }
    }
}

impl OutlineConfig {
    /// Loads configuration from an optional TOML file, with environment
    /// variables layered on top.
    pub fn load(path: Option<&Path>) -> Result<Self, OutlineError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(OutlineError::io(
                    path,
                    std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
                ));
            }
            builder = builder.add_source(config::File::from(path).format(config::FileFormat::Toml));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: OutlineConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parses configuration from a TOML string, without environment overrides.
    pub fn from_toml_str(source: &str) -> Result<Self, OutlineError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        let config: OutlineConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, OutlineError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), OutlineError> {
        let tag = &self.outline.section_tag;
        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(OutlineError::InvalidInput(format!(
                "section_tag must be a plain tag name, got {:?}",
                tag
            )));
        }
        if self.output.extension.is_empty() {
            return Err(OutlineError::InvalidInput(
                "output extension must not be empty".to_string(),
            ));
        }
        if self.build.parallel_jobs == Some(0) {
            return Err(OutlineError::InvalidInput(
                "parallel_jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = OutlineConfig::default();
        assert_eq!(config.outline.section_tag, "section");
        assert_eq!(config.outline.class_prefix, "section");
        assert!(!config.outline.section_ids);
        assert!(config.markdown.tables);
        assert_eq!(config.output.extension, "html");
        assert_eq!(config.build.source_extensions, vec!["md", "markdown"]);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = OutlineConfig::from_toml_str(
            r#"
[outline]
class_prefix = "level"

[output]
standalone = true
"#,
        )
        .unwrap();

        assert_eq!(config.outline.class_prefix, "level");
        assert_eq!(config.outline.section_tag, "section");
        assert!(config.output.standalone);
        assert_eq!(config.output.extension, "html");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[outline]\nsection_ids = true\n[build]\nparallel_jobs = 2").unwrap();
        file.flush().unwrap();

        let config = OutlineConfig::load(Some(file.path())).unwrap();
        assert!(config.outline.section_ids);
        assert_eq!(config.build.parallel_jobs, Some(2));
    }

    #[test]
    fn test_environment_overrides_defaults() {
        std::env::set_var("PSS_OUTLINE_OUTLINE__CLASS_PREFIX", "level");
        std::env::set_var("PSS_OUTLINE_OUTPUT__STANDALONE", "true");
        let result = OutlineConfig::load(None);
        std::env::remove_var("PSS_OUTLINE_OUTLINE__CLASS_PREFIX");
        std::env::remove_var("PSS_OUTLINE_OUTPUT__STANDALONE");

        let config = result.unwrap();
        assert_eq!(config.outline.class_prefix, "level");
        assert!(config.output.standalone);
        assert_eq!(config.outline.section_tag, "section");
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[output]\nextension = \"htm\"\nstylesheet = \"site.css\"").unwrap();
        file.flush().unwrap();

        std::env::set_var("PSS_OUTLINE_OUTPUT__EXTENSION", "xhtml");
        let result = OutlineConfig::load(Some(file.path()));
        std::env::remove_var("PSS_OUTLINE_OUTPUT__EXTENSION");

        let config = result.unwrap();
        assert_eq!(config.output.extension, "xhtml");
        assert_eq!(config.output.stylesheet.as_deref(), Some("site.css"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = OutlineConfig::load(Some(Path::new("/nonexistent/pss-outline.toml")));
        assert!(matches!(result, Err(OutlineError::Io { .. })));
    }

    #[test]
    fn test_rejects_bad_section_tag() {
        let result = OutlineConfig::from_toml_str("[outline]\nsection_tag = \"div class\"");
        assert!(matches!(result, Err(OutlineError::InvalidInput(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = OutlineConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("class_prefix = \"section\""));
        assert_eq!(OutlineConfig::from_toml_str(&text).unwrap(), config);
    }
}
