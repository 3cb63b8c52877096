use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use darwin::index::{IndexBuilder, IndexConfig};
use darwin::output;
use darwin::utils::Tokenizer;
use darwin::utils::progress::BuildProgress;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Parser)]
#[command(name = "darwin")]
#[command(about = "Exact-word line search over a small document corpus")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an index from a manifest and save a snapshot
    Index {
        /// Manifest listing `<id> <file name>` per line
        manifest: PathBuf,

        /// Where to write the snapshot
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Find every line containing a word
    Search {
        /// The word to look up
        word: String,

        /// Build from this manifest before searching
        #[arg(short, long, conflicts_with = "snapshot")]
        manifest: Option<PathBuf>,

        /// Load this snapshot instead of building
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Show snapshot statistics
    Stats {
        /// Snapshot written by `darwin index`
        snapshot: PathBuf,
    },
}

#[derive(Args)]
struct ConfigArgs {
    /// JSON file with `delimiters`, `avg_word_length`, `skip_missing_documents`
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl ConfigArgs {
    fn load(&self) -> Result<IndexConfig> {
        match &self.config {
            Some(path) => IndexConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display())),
            None => Ok(IndexConfig::default()),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Index {
            manifest,
            output: snapshot,
            config,
        } => {
            let config = config.load()?;
            let builder = build(&manifest, config, true)?;
            builder
                .save(&snapshot)
                .with_context(|| format!("Failed to save snapshot {}", snapshot.display()))?;
            output::print_stats(&builder.stats(), io::stdout().is_terminal())?;
        }
        Commands::Search {
            word,
            manifest,
            snapshot,
            json,
            no_color,
            config,
        } => {
            let config = config.load()?;
            let builder = match (manifest, snapshot) {
                (Some(manifest), _) => build(&manifest, config, false)?,
                (None, Some(snapshot)) => IndexBuilder::load(&snapshot, config)
                    .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?,
                (None, None) => bail!("search needs --manifest or --snapshot"),
            };

            let matches = builder.search(&word)?;
            if json {
                output::print_matches_json(&matches)?;
            } else {
                output::print_matches(&matches, !no_color && io::stdout().is_terminal())?;
            }
        }
        Commands::Stats { snapshot } => {
            let builder = IndexBuilder::load(&snapshot, IndexConfig::default())
                .with_context(|| format!("Failed to load snapshot {}", snapshot.display()))?;
            output::print_stats(&builder.stats(), io::stdout().is_terminal())?;
        }
    }

    Ok(())
}

fn build(manifest: &Path, config: IndexConfig, show_progress: bool) -> Result<IndexBuilder> {
    let tokenizer = Tokenizer::new(config.avg_word_length);
    let mut builder = IndexBuilder::with_config(tokenizer, config);

    let progress = if show_progress {
        BuildProgress::visible()
    } else {
        BuildProgress::hidden()
    };
    builder
        .build_with_progress(manifest, &progress)
        .with_context(|| format!("Failed to build index from {}", manifest.display()))?;
    Ok(builder)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
