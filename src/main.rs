use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, LevelFilter};
use std::path::PathBuf;

use pss_outline::builder::DEFAULT_OUTPUT_DIR;
use pss_outline::{OutlineBuilder, OutlineConfig};

#[derive(Parser)]
#[command(name = "pss-outline")]
#[command(about = "Nest Markdown headings into section containers and render HTML")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a Markdown file, or every Markdown file under a directory
    Build {
        /// Source file or directory
        input: PathBuf,

        /// Output file or directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of parallel jobs for directory builds
        #[arg(short, long)]
        jobs: Option<usize>,
    },
    /// Print the nested outline of a Markdown file
    Tree {
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = TreeFormat::Text)]
        format: TreeFormat,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum TreeFormat {
    Text,
    Json,
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        LevelFilter::Error
    } else {
        match cli.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = OutlineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Build { input, output, jobs } => {
            let mut builder = OutlineBuilder::new(config);
            if let Some(jobs) = jobs {
                builder.set_parallel_jobs(jobs);
            }

            if input.is_dir() {
                let output = output.unwrap_or_else(|| input.join(DEFAULT_OUTPUT_DIR));
                let stats = builder.build_dir(&input, &output)?;

                println!(
                    "Built {} files ({} sections) in {:.2?} -> {}",
                    stats.files_processed,
                    stats.sections_created,
                    stats.build_time,
                    output.display()
                );
                if stats.files_failed > 0 {
                    for report in &stats.error_details {
                        eprintln!("error: {}", report);
                    }
                    bail!("{} file(s) failed to build", stats.files_failed);
                }
            } else {
                let output = output.unwrap_or_else(|| builder.output_path_for(&input));
                let document = builder.build_file(&input, &output)?;
                info!(
                    "Built \"{}\" ({} sections) -> {}",
                    document.title,
                    document.outline.section_count(),
                    output.display()
                );
            }
        }
        Command::Tree { input, format } => {
            let builder = OutlineBuilder::new(config);
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let document = builder.build_source(&content);

            match format {
                TreeFormat::Text => print!("{}", document.outline.dump()),
                TreeFormat::Json => println!("{}", document.outline.to_json()?),
            }
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
