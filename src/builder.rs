use anyhow::{bail, Context, Result};
use log::{debug, error, info, trace, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use walkdir::{DirEntry, WalkDir};

use crate::config::OutlineConfig;
use crate::error::BuildErrorReport;
use crate::outline::{outline, Outline};
use crate::parser::Parser;
use crate::renderer::HtmlRenderer;

/// Directory skipped during discovery; also the default output of a
/// directory build.
pub const DEFAULT_OUTPUT_DIR: &str = "_build";

#[derive(Debug, Clone)]
pub struct BuildStats {
    pub files_processed: usize,
    pub files_failed: usize,
    pub sections_created: usize,
    pub build_time: Duration,
    pub error_details: Vec<BuildErrorReport>,
}

/// One document taken through parse, outline and render.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub title: String,
    pub outline: Outline,
    pub html: String,
}

pub struct OutlineBuilder {
    config: OutlineConfig,
    parser: Parser,
    renderer: HtmlRenderer,
    parallel_jobs: usize,
}

impl OutlineBuilder {
    pub fn new(config: OutlineConfig) -> Self {
        let parser = Parser::new(&config.markdown);
        let renderer = HtmlRenderer::new(&config);

        let parallel_jobs = config.build.parallel_jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        });

        Self {
            config,
            parser,
            renderer,
            parallel_jobs,
        }
    }

    pub fn config(&self) -> &OutlineConfig {
        &self.config
    }

    pub fn set_parallel_jobs(&mut self, jobs: usize) {
        self.parallel_jobs = jobs.max(1);
    }

    /// Parse, nest and render one Markdown source.
    pub fn build_source(&self, content: &str) -> RenderedDocument {
        let parsed = self.parser.parse(content);

        if log::log_enabled!(log::Level::Trace) {
            let flat = Outline {
                children: parsed
                    .elements
                    .iter()
                    .cloned()
                    .map(crate::outline::Node::Element)
                    .collect(),
            };
            trace!("Tree before nesting:\n{}", flat.dump());
        }

        let outline = outline(&parsed.elements);
        trace!("Tree after nesting:\n{}", outline.dump());

        let body = self.renderer.render_outline(&outline);
        let html = self.renderer.render_page(&parsed.title, &body);

        RenderedDocument {
            title: parsed.title,
            outline,
            html,
        }
    }

    /// Convert a single Markdown file and write the result. Refuses to
    /// write over its own input.
    pub fn build_file(&self, input: &Path, output: &Path) -> Result<RenderedDocument> {
        if same_file(input, output) {
            bail!(
                "Output {} would overwrite its input; choose another output path or extension",
                output.display()
            );
        }

        let content = std::fs::read_to_string(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;

        let document = self.build_source(&content);

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        std::fs::write(output, &document.html)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        debug!(
            "Wrote {} ({} sections) -> {}",
            input.display(),
            document.outline.section_count(),
            output.display()
        );

        Ok(document)
    }

    /// Output path for `input` when writing next to it.
    pub fn output_path_for(&self, input: &Path) -> PathBuf {
        input.with_extension(&self.config.output.extension)
    }

    /// Convert every Markdown file under `source_dir` into `output_dir`,
    /// mirroring relative paths. Failures are collected, not fatal.
    pub fn build_dir(&self, source_dir: &Path, output_dir: &Path) -> Result<BuildStats> {
        let start_time = Instant::now();
        info!("Starting build of {}", source_dir.display());

        std::fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create output directory: {}", output_dir.display())
        })?;

        let source_files = self.discover_source_files(source_dir, output_dir)?;
        info!("Discovered {} source files", source_files.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallel_jobs)
            .build()?;

        let processed = AtomicUsize::new(0);
        let sections = AtomicUsize::new(0);
        let errors = Mutex::new(Vec::new());

        pool.install(|| {
            source_files.par_iter().for_each(|file_path| {
                let relative = file_path.strip_prefix(source_dir).unwrap_or(file_path);
                let target = output_dir
                    .join(relative)
                    .with_extension(&self.config.output.extension);

                match self.build_file(file_path, &target) {
                    Ok(document) => {
                        processed.fetch_add(1, Ordering::Relaxed);
                        sections.fetch_add(document.outline.section_count(), Ordering::Relaxed);
                    }
                    Err(e) => {
                        error!("{}: {:#}", file_path.display(), e);
                        let report = BuildErrorReport::new(file_path, format!("{:#}", e));
                        if let Ok(mut errors) = errors.lock() {
                            errors.push(report);
                        }
                    }
                }
            });
        });

        let error_details = errors.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());

        let stats = BuildStats {
            files_processed: processed.into_inner(),
            files_failed: error_details.len(),
            sections_created: sections.into_inner(),
            build_time: start_time.elapsed(),
            error_details,
        };

        info!(
            "Build completed in {:?}: {} files, {} sections, {} failed",
            stats.build_time, stats.files_processed, stats.sections_created, stats.files_failed
        );
        Ok(stats)
    }

    fn discover_source_files(&self, source_dir: &Path, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let canonical_output = output_dir.canonicalize().ok();
        let mut files = Vec::new();

        let walker = WalkDir::new(source_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if is_hidden(entry) || entry.file_name() == DEFAULT_OUTPUT_DIR {
                    return false;
                }
                match (&canonical_output, entry.file_type().is_dir()) {
                    (Some(output), true) => entry
                        .path()
                        .canonicalize()
                        .map_or(true, |path| &path != output),
                    _ => true,
                }
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if entry.file_type().is_file() && self.is_source_file(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.config
                    .build
                    .source_extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

fn same_file(input: &Path, output: &Path) -> bool {
    if input == output {
        return true;
    }
    match (input.canonicalize(), output.canonicalize()) {
        (Ok(input), Ok(output)) => input == output,
        _ => false,
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_source() {
        let builder = OutlineBuilder::new(OutlineConfig::default());
        let document = builder.build_source("# Guide\n\nIntro.\n\n## Install\n\nSteps.\n");

        assert_eq!(document.title, "Guide");
        assert_eq!(document.outline.section_count(), 2);
        assert!(document.html.starts_with("<section class=\"section1\">\n<h1>Guide</h1>\n"));
        assert!(document
            .html
            .contains("<section class=\"section2\">\n<h2>Install</h2>\n<p>Steps.</p>\n</section>\n</section>\n"));
    }

    #[test]
    fn test_output_path_for() {
        let mut config = OutlineConfig::default();
        config.output.extension = "htm".to_string();
        let builder = OutlineBuilder::new(config);
        assert_eq!(
            builder.output_path_for(Path::new("docs/intro.md")),
            PathBuf::from("docs/intro.htm")
        );
    }

    #[test]
    fn test_is_source_file() {
        let builder = OutlineBuilder::new(OutlineConfig::default());
        assert!(builder.is_source_file(Path::new("a/b.md")));
        assert!(builder.is_source_file(Path::new("a/b.MARKDOWN")));
        assert!(!builder.is_source_file(Path::new("a/b.rst")));
        assert!(!builder.is_source_file(Path::new("a/README")));
    }
}
