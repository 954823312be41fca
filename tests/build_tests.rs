//! End-to-end builds of Markdown files and directories.

use std::fs;
use tempfile::TempDir;

use pss_outline::{OutlineBuilder, OutlineConfig};

const GUIDE: &str = "\
Preface text.

# User Guide

Welcome.

## Installing

Run the installer.

### On Windows

Double-click.

## Running

Start the app.

# Reference

See below.
";

#[test]
fn test_build_file_nests_sections() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("guide.md");
    fs::write(&input, GUIDE).unwrap();

    let builder = OutlineBuilder::new(OutlineConfig::default());
    let output = builder.output_path_for(&input);
    let document = builder.build_file(&input, &output).unwrap();

    assert_eq!(document.title, "User Guide");
    assert_eq!(document.outline.section_count(), 5);

    let html = fs::read_to_string(&output).unwrap();
    assert_eq!(
        html,
        "<p>Preface text.</p>\n\
         <section class=\"section1\">\n\
         <h1>User Guide</h1>\n\
         <p>Welcome.</p>\n\
         <section class=\"section2\">\n\
         <h2>Installing</h2>\n\
         <p>Run the installer.</p>\n\
         <section class=\"section3\">\n\
         <h3>On Windows</h3>\n\
         <p>Double-click.</p>\n\
         </section>\n\
         </section>\n\
         <section class=\"section2\">\n\
         <h2>Running</h2>\n\
         <p>Start the app.</p>\n\
         </section>\n\
         </section>\n\
         <section class=\"section1\">\n\
         <h1>Reference</h1>\n\
         <p>See below.</p>\n\
         </section>\n"
    );
}

#[test]
fn test_build_file_standalone_page_with_ids() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("guide.md");
    let output = temp_dir.path().join("out/nested/guide.html");
    fs::write(&input, GUIDE).unwrap();

    let config = OutlineConfig::from_toml_str(
        "[outline]\nsection_ids = true\n[output]\nstandalone = true\nstylesheet = \"docs.css\"\n",
    )
    .unwrap();
    let builder = OutlineBuilder::new(config);
    builder.build_file(&input, &output).unwrap();

    let html = fs::read_to_string(&output).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>User Guide</title>"));
    assert!(html.contains("<section class=\"section3\" id=\"on-windows\">"));
    assert!(html.contains("<section class=\"section1\" id=\"reference\">"));
}

#[test]
fn test_build_file_missing_input() {
    let temp_dir = TempDir::new().unwrap();
    let builder = OutlineBuilder::new(OutlineConfig::default());
    let err = builder
        .build_file(&temp_dir.path().join("absent.md"), &temp_dir.path().join("absent.html"))
        .unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read"));
}

#[test]
fn test_build_file_refuses_to_overwrite_input() {
    let temp_dir = TempDir::new().unwrap();
    let input = temp_dir.path().join("page.html");
    fs::write(&input, "# Kept\n").unwrap();

    let builder = OutlineBuilder::new(OutlineConfig::default());
    let output = builder.output_path_for(&input);
    assert_eq!(output, input);

    let err = builder.build_file(&input, &output).unwrap_err();
    assert!(format!("{:#}", err).contains("would overwrite its input"));

    // A different spelling of the same path is caught too.
    let dotted = temp_dir.path().join(".").join("page.html");
    assert!(builder.build_file(&input, &dotted).is_err());

    assert_eq!(fs::read_to_string(&input).unwrap(), "# Kept\n");
}

#[test]
fn test_build_dir_mirrors_tree() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("docs");
    fs::create_dir_all(source.join("tools/modeling")).unwrap();
    fs::create_dir_all(source.join(".hidden")).unwrap();
    fs::create_dir_all(source.join("_build")).unwrap();

    fs::write(source.join("index.md"), "# Home\n\nHello.\n").unwrap();
    fs::write(source.join("tools/modeling/extrude.markdown"), "# Extrude\n\n## Options\n").unwrap();
    fs::write(source.join("notes.txt"), "# Not markdown\n").unwrap();
    fs::write(source.join(".hidden/secret.md"), "# Hidden\n").unwrap();
    fs::write(source.join("_build/stale.md"), "# Stale\n").unwrap();

    let output = source.join("_build");
    let builder = OutlineBuilder::new(OutlineConfig::default());
    let stats = builder.build_dir(&source, &output).unwrap();

    assert_eq!(stats.files_processed, 2);
    assert_eq!(stats.files_failed, 0);
    assert_eq!(stats.sections_created, 3);

    assert!(output.join("index.html").exists());
    assert!(output.join("tools/modeling/extrude.html").exists());
    assert!(!output.join("notes.html").exists());
    assert!(!output.join(".hidden").exists());
    assert!(!output.join("_build").exists());
}

#[test]
fn test_build_dir_reports_failures_and_continues() {
    let temp_dir = TempDir::new().unwrap();
    let source = temp_dir.path().join("docs");
    let output = temp_dir.path().join("site");
    fs::create_dir_all(&source).unwrap();

    fs::write(source.join("good.md"), "# Good\n").unwrap();
    // Not valid UTF-8, so reading it as text fails.
    fs::write(source.join("bad.md"), [0xff, 0xfe, 0x00, 0x80]).unwrap();

    let mut builder = OutlineBuilder::new(OutlineConfig::default());
    builder.set_parallel_jobs(2);
    let stats = builder.build_dir(&source, &output).unwrap();

    assert_eq!(stats.files_processed, 1);
    assert_eq!(stats.files_failed, 1);
    assert!(stats.error_details[0].file.ends_with("bad.md"));
    assert!(output.join("good.html").exists());
}

#[test]
fn test_concurrent_directory_builds_keep_their_own_failures() {
    let temp_dir = TempDir::new().unwrap();
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");
    fs::create_dir_all(&first).unwrap();
    fs::create_dir_all(&second).unwrap();

    fs::write(first.join("ok.md"), "# Ok\n").unwrap();
    fs::write(first.join("broken-one.md"), [0xff, 0xfe]).unwrap();
    fs::write(second.join("broken-two.md"), [0xc3, 0x28]).unwrap();

    let builder = OutlineBuilder::new(OutlineConfig::default());
    let (first_stats, second_stats) = std::thread::scope(|scope| {
        let a = scope.spawn(|| builder.build_dir(&first, &temp_dir.path().join("out1")));
        let b = scope.spawn(|| builder.build_dir(&second, &temp_dir.path().join("out2")));
        (a.join().unwrap().unwrap(), b.join().unwrap().unwrap())
    });

    assert_eq!(first_stats.files_failed, 1);
    assert!(first_stats.error_details[0].file.ends_with("broken-one.md"));
    assert_eq!(second_stats.files_failed, 1);
    assert!(second_stats.error_details[0].file.ends_with("broken-two.md"));

    // A later build on the same builder starts with an empty error list.
    let again = builder.build_dir(&first, &temp_dir.path().join("out3")).unwrap();
    assert_eq!(again.files_failed, 1);
    assert_eq!(again.files_processed, 1);
}
