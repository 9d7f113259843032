//! Subcommand runners. Each prints its result to stdout and returns the
//! process exit code; errors propagate to the binary, which exits with
//! [`EXIT_FAILURE`].

use chrono::Local;

use crate::archive::Archive;
use crate::cli::{Cli, Command, CoverageArgs, DiffArgs, FetchArgs, ListArgs, ReadmeArgs};
use crate::config::Config;
use crate::coverage::{self, Coverage};
use crate::error::{Error, Result};
use crate::fetch::{self, FileSource, HttpSource, Outcome, Source};
use crate::readme;
use crate::report::{self, table};
use crate::snapshot;
use crate::store::{diff, Store};
use crate::util::format_bytes;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_GAPS: i32 = 2;

pub fn run(cli: Cli) -> Result<i32> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Fetch(args) => run_fetch(config, &args),
        Command::Coverage(args) => run_coverage(&config, &args),
        Command::Readme(args) => run_readme(&config, &args),
        Command::List(args) => run_list(&config, &args),
        Command::Diff(args) => run_diff(&config, &args),
        Command::Reindex => run_reindex(&config),
    }
}

/// Coverage of every snapshot file in the data directory.
pub fn archive_coverage(config: &Config) -> Result<Coverage> {
    let archive = Archive::at(&config.archive.data_dir);
    let requests: Vec<_> = archive
        .request_dates()?
        .into_iter()
        .map(|(_, requested_at)| requested_at)
        .collect();
    Ok(coverage::compute(&requests))
}

pub fn run_fetch(mut config: Config, args: &FetchArgs) -> Result<i32> {
    config.apply_fetch_args(args);

    let source: Box<dyn Source> = match &args.from_file {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(HttpSource::new(&config.source)?),
    };

    // A dry run reads an existing catalog for the duplicate check but never
    // creates one.
    let mut store = if args.dry_run && !config.archive.catalog.exists() {
        Store::open_in_memory()?
    } else {
        Store::open(&config.archive.catalog)?
    };

    let now = || Local::now().naive_local();
    match fetch::run(&config, source.as_ref(), &mut store, now, args.dry_run)? {
        Outcome::Written(snapshot) => {
            println!(
                "File downloaded to {}",
                config.archive.data_dir.join(&snapshot.file_name).display()
            );
        }
        Outcome::Unchanged { duplicate_of } => {
            println!("Export unchanged since snapshot {duplicate_of}, nothing written");
        }
        Outcome::DryRun {
            file_name,
            row_count,
            size_bytes,
        } => {
            println!(
                "[dry-run] would write {file_name} ({row_count} rows, {})",
                format_bytes(size_bytes)
            );
        }
    }
    Ok(EXIT_OK)
}

pub fn run_coverage(config: &Config, args: &CoverageArgs) -> Result<i32> {
    let coverage = archive_coverage(config)?;
    report::print(&coverage, args.json, table::render_coverage)?;
    Ok(coverage_exit_code(&coverage, args.fail_on_gaps))
}

pub fn coverage_exit_code(coverage: &Coverage, fail_on_gaps: bool) -> i32 {
    if fail_on_gaps && coverage.has_gaps() {
        EXIT_GAPS
    } else {
        EXIT_OK
    }
}

pub fn run_readme(config: &Config, args: &ReadmeArgs) -> Result<i32> {
    let coverage = archive_coverage(config)?;
    let output = config.readme.output.display();

    match readme::regenerate(&config.readme, &coverage, args.check)? {
        readme::Outcome::Written => println!("Updated {output}"),
        readme::Outcome::Unchanged => println!("{output} is up to date"),
        readme::Outcome::Stale => {
            eprintln!("{output} is out of date. Run 'tgvmax-archive readme'.");
            return Ok(EXIT_FAILURE);
        }
    }
    Ok(EXIT_OK)
}

pub fn run_list(config: &Config, args: &ListArgs) -> Result<i32> {
    let store = Store::open(&config.archive.catalog)?;
    let snapshots = store.list_snapshots()?;
    report::print(snapshots.as_slice(), args.json, table::render_snapshots)?;
    Ok(EXIT_OK)
}

/// Resolves `--from`/`--to`, defaulting to the two most recent snapshots.
pub fn diff_ids(store: &Store, args: &DiffArgs) -> Result<(u64, u64)> {
    match (args.from, args.to) {
        (Some(from), Some(to)) => Ok((from, to)),
        (None, None) => {
            let snapshots = store.list_snapshots()?;
            match snapshots.as_slice() {
                [latest, previous, ..] => Ok((previous.id, latest.id)),
                _ => Err(Error::Usage(
                    "need at least 2 snapshots to compare".to_string(),
                )),
            }
        }
        _ => Err(Error::Usage(
            "both --from and --to must be specified together".to_string(),
        )),
    }
}

pub fn diff(store: &Store, args: &DiffArgs) -> Result<diff::DiffResult> {
    let (from_id, to_id) = diff_ids(store, args)?;

    let from = store
        .get_snapshot(from_id)?
        .ok_or(Error::SnapshotNotFound(from_id))?;
    let to = store
        .get_snapshot(to_id)?
        .ok_or(Error::SnapshotNotFound(to_id))?;

    Ok(diff::compare_snapshots(
        &from,
        &store.load_snapshot_columns(from_id)?,
        &to,
        &store.load_snapshot_columns(to_id)?,
    ))
}

pub fn run_diff(config: &Config, args: &DiffArgs) -> Result<i32> {
    let store = Store::open(&config.archive.catalog)?;
    print!("{}", table::render_diff(&diff(&store, args)?));
    Ok(EXIT_OK)
}

pub fn run_reindex(config: &Config) -> Result<i32> {
    let archive = Archive::at(&config.archive.data_dir);
    let mut store = Store::open(&config.archive.catalog)?;
    let count = snapshot::reindex(&archive, &mut store)?;
    println!("Indexed {count} snapshots");
    Ok(EXIT_OK)
}
