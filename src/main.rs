// src/main.rs
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nehoda::dataset::{self, table, DatasetStore};
use nehoda::{stats, Region};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "nehoda", about = "Czech traffic-accident dataset scraper")]
struct Cli {
    /// Directory for downloaded archives and cache blobs.
    #[arg(long, default_value = dataset::DEFAULT_DIR, global = true)]
    data_dir: PathBuf,

    /// Archive index URL.
    #[arg(long, default_value = dataset::DEFAULT_URL, global = true)]
    url: String,

    /// Per-region cache file pattern; `{}` is replaced by the region code.
    #[arg(long, default_value = dataset::DEFAULT_CACHE_PATTERN, global = true)]
    cache_pattern: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download any archives missing locally, invalidating caches if
    /// anything new arrived.
    Update,

    /// Assemble regions into one combined dataset and write a Parquet
    /// snapshot.
    Export {
        /// Comma-separated region codes; all regions when omitted.
        #[arg(long, value_delimiter = ',')]
        regions: Option<Vec<Region>>,

        /// Snapshot destination.
        #[arg(long, default_value = "accidents.parquet")]
        output: PathBuf,

        /// Print row count and in-memory size.
        #[arg(long)]
        verbose: bool,
    },

    /// Print per-year, per-region accident counts.
    Stats {
        /// Read a snapshot instead of assembling live.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Emit a booktabs LaTeX table instead of plain text.
        #[arg(long)]
        latex: bool,

        /// Lowest year to report.
        #[arg(long, default_value_t = stats::DEFAULT_SINCE_YEAR)]
        since: i32,
    },
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let cli = Cli::parse();

    match cli.command {
        Command::Update => {
            let mut store = open_store(&cli)?;
            let downloaded = store.refresh()?;
            if downloaded > 0 {
                println!("downloaded {downloaded} archive(s); caches invalidated");
            } else {
                println!("already up to date");
            }
        }

        Command::Export {
            ref regions,
            ref output,
            verbose,
        } => {
            let mut store = open_store(&cli)?;
            let batch = store.get(regions.as_deref())?;
            table::write_table(&output, &batch)?;
            if verbose {
                let mb = batch.get_array_memory_size() as f64 / 1_048_576.0;
                println!("{} rows, {mb:.1} MB in memory", batch.num_rows());
            }
            println!("snapshot written to {}", output.display());
        }

        Command::Stats {
            ref input,
            latex,
            since,
        } => {
            let batch = match input {
                Some(path) => table::read_table(&path)
                    .with_context(|| format!("reading snapshot {}", path.display()))?,
                None => open_store(&cli)?.get(None)?,
            };
            let counts = stats::yearly_region_counts(&batch, since)?;
            let rendered = if latex {
                stats::render_latex(&counts)
            } else {
                stats::render_text(&counts)
            };
            print!("{rendered}");
        }
    }

    info!("done");
    Ok(())
}

fn open_store(cli: &Cli) -> Result<DatasetStore> {
    DatasetStore::open(&cli.url, &cli.data_dir, &cli.cache_pattern)
        .with_context(|| format!("opening dataset store in {}", cli.data_dir.display()))
}
