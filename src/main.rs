use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use covmeasure::cli::{self, ConfigOverrides};

/// covmeasure — Turn Clover, JaCoCo and Cobertura XML reports into coverage measures.
#[derive(Parser)]
#[command(name = "covmeasure", version, about)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a coverage report and print the measures it yields.
    Ingest {
        /// Path to the coverage report.
        report: PathBuf,

        /// Override format detection (clover, jacoco, cobertura).
        #[arg(long)]
        format: Option<String>,

        /// TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Absolute source directory; may be repeated.
        #[arg(long = "source-root")]
        source_roots: Vec<String>,

        /// Prefix tried when resolving report paths; may be repeated.
        #[arg(long = "search-path")]
        search_paths: Vec<String>,

        /// File listing the tracked source files, one per line.
        #[arg(long)]
        tracked_files: Option<PathBuf>,

        /// Only measure files matching this pattern; may be repeated.
        #[arg(long = "include")]
        inclusions: Vec<String>,

        /// Skip files matching this pattern; may be repeated.
        #[arg(long = "exclude")]
        exclusions: Vec<String>,

        /// Source file extension (default: groovy).
        #[arg(long)]
        extension: Option<String>,

        /// Print the summary and measures as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the detected format of a coverage report.
    Detect {
        /// Path to the coverage report.
        report: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let output = match cli.command {
        Commands::Ingest {
            report,
            format,
            config,
            source_roots,
            search_paths,
            tracked_files,
            inclusions,
            exclusions,
            extension,
            json,
        } => {
            let config = cli::load_config(
                config.as_deref(),
                ConfigOverrides {
                    source_roots,
                    search_paths,
                    tracked_files,
                    inclusions,
                    exclusions,
                    extension,
                },
            )?;
            cli::cmd_ingest(&report, format.as_deref(), &config, json)
                .with_context(|| format!("Failed to ingest {}", report.display()))?
        }
        Commands::Detect { report } => cli::cmd_detect(&report)?,
    };
    print!("{output}");
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
