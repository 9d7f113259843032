use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::encode::Format;

#[derive(Parser)]
#[command(name = "tgvmax-archive")]
#[command(about = "Daily archiver for the TGVmax seat availability export")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to ./tgvmax-archive.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Show debug logging
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download today's export and add it to the archive
    Fetch(FetchArgs),

    /// Report archived days, missing days and gaps
    Coverage(CoverageArgs),

    /// Regenerate the README from its template
    Readme(ReadmeArgs),

    /// List catalogued snapshots
    List(ListArgs),

    /// Compare two snapshots
    Diff(DiffArgs),

    /// Rebuild the catalog from the files in the data directory
    Reindex,
}

#[derive(Parser)]
pub struct FetchArgs {
    /// Output format, overrides archive.format
    #[arg(long, value_enum)]
    pub format: Option<Format>,

    /// Data directory, overrides archive.data_dir. Its catalog defaults to
    /// <DATA_DIR>/catalog.db
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Catalog database, overrides archive.catalog
    #[arg(long)]
    pub catalog: Option<PathBuf>,

    /// Read the export from a local file instead of downloading it
    #[arg(long)]
    pub from_file: Option<PathBuf>,

    /// Download and encode but write nothing
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct CoverageArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Exit with status 2 when the archive has gaps
    #[arg(long, default_value_t = false)]
    pub fail_on_gaps: bool,
}

#[derive(Parser)]
pub struct ReadmeArgs {
    /// Exit with status 1 if the README is out of date instead of writing it
    #[arg(long, default_value_t = false)]
    pub check: bool,
}

#[derive(Parser)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct DiffArgs {
    /// Starting snapshot ID for comparison
    #[arg(long)]
    pub from: Option<u64>,

    /// Ending snapshot ID for comparison
    #[arg(long)]
    pub to: Option<u64>,
}
