use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tgvmax_archive::archive::Archive;
use tgvmax_archive::cli::{CoverageArgs, DiffArgs, FetchArgs, ReadmeArgs};
use tgvmax_archive::commands::{self, EXIT_FAILURE, EXIT_GAPS, EXIT_OK};
use tgvmax_archive::config::Config;
use tgvmax_archive::coverage;
use tgvmax_archive::encode::Format;
use tgvmax_archive::fetch::{self, FileSource, Outcome};
use tgvmax_archive::readme;
use tgvmax_archive::snapshot;
use tgvmax_archive::store::{diff, Store};
use tgvmax_archive::Error;

const EXPORT_V1: &str = "\u{feff}date;train_no;entity;axe;origine_iata;destination_iata;origine;destination;heure_depart;heure_arrivee;od_happy_card\n\
2024-06-10;6201;SNCF;SUD EST;FRPAR;FRLYS;PARIS (intramuros);LYON (gares intramuros);06:00;07:56;OUI\n\
2024-06-10;6611;SNCF;SUD EST;FRPAR;FRMSC;PARIS (intramuros);MARSEILLE ST CHARLES;06:37;09:58;NON\n";

const EXPORT_V2: &str = "date;train_no;entity;axe;origine_iata;destination_iata;origine;destination;heure_depart;heure_arrivee;od_happy_card;train_type\n\
2024-06-11;6201;SNCF;SUD EST;FRPAR;FRLYS;PARIS (intramuros);LYON (gares intramuros);06:00;07:56;NON;TGV\n\
2024-06-11;6611;SNCF;SUD EST;FRPAR;FRMSC;PARIS (intramuros);MARSEILLE ST CHARLES;06:37;09:58;NON;TGV\n\
2024-06-11;5302;SNCF;ATLANTIQUE;FRPMO;FRBOJ;PARIS (intramuros);BORDEAUX ST JEAN;07:08;09:12;OUI;TGV\n";

fn stamp(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, day)
        .unwrap()
        .and_hms_opt(hour, 15, 0)
        .unwrap()
}

fn setup(root: &Path, format: Format) -> Config {
    let mut config = Config::default();
    config.archive.data_dir = root.join("data/maxjeune");
    config.archive.catalog = root.join("data/catalog.db");
    config.archive.format = format;
    config.readme.template = root.join("README.template.md");
    config.readme.output = root.join("README.md");
    fs::write(root.join("v1.csv"), EXPORT_V1).unwrap();
    fs::write(root.join("v2.csv"), EXPORT_V2).unwrap();
    config
}

fn fetch_from(config: &Config, store: &mut Store, file: &Path, at: NaiveDateTime) -> u64 {
    match fetch::run(config, &FileSource::new(file), store, || at, false).unwrap() {
        Outcome::Written(snapshot) => snapshot.id,
        other => panic!("expected a written snapshot, got {other:?}"),
    }
}

fn archive_coverage(config: &Config) -> coverage::Coverage {
    let archive = Archive::open(&config.archive.data_dir).unwrap();
    let requests: Vec<NaiveDateTime> = archive
        .request_dates()
        .unwrap()
        .into_iter()
        .map(|(_, at)| at)
        .collect();
    coverage::compute(&requests)
}

#[test]
fn daily_runs_build_archive_and_readme() {
    let root = tempfile::tempdir().unwrap();
    let config = setup(root.path(), Format::Csv);
    let mut store = Store::open(&config.archive.catalog).unwrap();

    let v1 = root.path().join("v1.csv");
    let v2 = root.path().join("v2.csv");
    assert_eq!(fetch_from(&config, &mut store, &v1, stamp(10, 4)), 1);
    assert_eq!(fetch_from(&config, &mut store, &v2, stamp(11, 4)), 2);
    assert_eq!(fetch_from(&config, &mut store, &v2, stamp(14, 4)), 3);

    let first = fs::read_to_string(config.archive.data_dir.join("1.csv")).unwrap();
    assert!(first.starts_with("date,train_no,"));
    assert!(first.lines().nth(1).unwrap().ends_with(",OUI,2024-06-10T04:15:00.000000"));

    let coverage = archive_coverage(&config);
    assert_eq!(coverage.snapshot_count, 3);
    assert_eq!(coverage.archived_days, 3);
    assert_eq!(coverage.missing_days, 2);
    assert_eq!(coverage.gaps.len(), 1);

    fs::write(
        &config.readme.template,
        "# TGVmax archive\n\n{{archived_days}} days archived, {{missing_days}} missing, \
         from {{first_day}} to {{last_day}}.\n",
    )
    .unwrap();
    assert_eq!(
        readme::regenerate(&config.readme, &coverage, false).unwrap(),
        readme::Outcome::Written
    );
    assert_eq!(
        fs::read_to_string(&config.readme.output).unwrap(),
        "# TGVmax archive\n\n3 days archived, 2 missing, from 2024-06-10 to 2024-06-14.\n"
    );
    assert_eq!(
        readme::regenerate(&config.readme, &archive_coverage(&config), true).unwrap(),
        readme::Outcome::Unchanged
    );
}

#[test]
fn catalog_diff_reports_schema_change_and_duplicates() {
    let root = tempfile::tempdir().unwrap();
    let config = setup(root.path(), Format::Parquet);
    let mut store = Store::open(&config.archive.catalog).unwrap();

    let v1 = root.path().join("v1.csv");
    let v2 = root.path().join("v2.csv");
    fetch_from(&config, &mut store, &v1, stamp(10, 4));
    fetch_from(&config, &mut store, &v2, stamp(11, 4));
    fetch_from(&config, &mut store, &v2, stamp(12, 4));

    let load = |id| {
        (
            store.get_snapshot(id).unwrap().unwrap(),
            store.load_snapshot_columns(id).unwrap(),
        )
    };

    let (s1, c1) = load(1);
    let (s2, c2) = load(2);
    let (s3, c3) = load(3);

    let change = diff::compare_snapshots(&s1, &c1, &s2, &c2);
    assert_eq!(change.row_delta, 1);
    assert_eq!(change.identical_upstream, Some(false));
    assert_eq!(change.added_columns().collect::<Vec<_>>(), vec!["train_type"]);

    let repeat = diff::compare_snapshots(&s2, &c2, &s3, &c3);
    assert_eq!(repeat.identical_upstream, Some(true));
    assert_eq!(repeat.row_delta, 0);
    assert!(repeat.columns.is_empty());
}

#[test]
fn reindex_recovers_lost_catalog() {
    let root = tempfile::tempdir().unwrap();
    let config = setup(root.path(), Format::Parquet);

    {
        let mut store = Store::open(&config.archive.catalog).unwrap();
        fetch_from(&config, &mut store, &root.path().join("v1.csv"), stamp(10, 4));
        fetch_from(&config, &mut store, &root.path().join("v2.csv"), stamp(11, 4));
    }
    fs::remove_file(&config.archive.catalog).unwrap();

    let archive = Archive::open(&config.archive.data_dir).unwrap();
    let mut store = Store::open(&config.archive.catalog).unwrap();
    assert!(store.list_snapshots().unwrap().is_empty());

    assert_eq!(snapshot::reindex(&archive, &mut store).unwrap(), 2);

    let latest = store.get_latest_snapshot().unwrap().unwrap();
    assert_eq!(latest.id, 2);
    assert_eq!(latest.row_count, 3);
    assert_eq!(latest.upstream_sha256, None);
    assert_eq!(
        latest.requested_at,
        tgvmax_archive::util::stamp_to_micros(stamp(11, 4))
    );
}

#[test]
fn mixed_formats_share_one_id_sequence() {
    let root = tempfile::tempdir().unwrap();
    let mut config = setup(root.path(), Format::Csv);
    let mut store = Store::open(&config.archive.catalog).unwrap();

    fetch_from(&config, &mut store, &root.path().join("v1.csv"), stamp(10, 4));
    config.archive.format = Format::Parquet;
    let id = fetch_from(&config, &mut store, &root.path().join("v2.csv"), stamp(11, 4));

    assert_eq!(id, 2);
    assert!(config.archive.data_dir.join("1.csv").is_file());
    assert!(config.archive.data_dir.join("2.parquet").is_file());
    assert_eq!(archive_coverage(&config).archived_days, 2);
}

fn fetch_args(file: &Path, dry_run: bool) -> FetchArgs {
    FetchArgs {
        format: None,
        data_dir: None,
        catalog: None,
        from_file: Some(file.to_path_buf()),
        dry_run,
    }
}

#[test]
fn dry_run_creates_neither_data_dir_nor_catalog() {
    let root = tempfile::tempdir().unwrap();
    let config = setup(root.path(), Format::Parquet);

    let code = commands::run_fetch(config.clone(), &fetch_args(&root.path().join("v1.csv"), true)).unwrap();

    assert_eq!(code, EXIT_OK);
    assert!(!config.archive.data_dir.exists());
    assert!(!config.archive.catalog.exists());
    assert!(!root.path().join("data").exists());
}

#[test]
fn redirected_data_dir_keeps_main_catalog_intact() {
    let root = tempfile::tempdir().unwrap();
    let config = setup(root.path(), Format::Csv);

    let main_run = fetch_args(&root.path().join("v1.csv"), false);
    commands::run_fetch(config.clone(), &main_run).unwrap();
    let before = Store::open(&config.archive.catalog).unwrap().get_snapshot(1).unwrap().unwrap();

    let backfill_dir = root.path().join("backfill");
    let mut backfill = fetch_args(&root.path().join("v2.csv"), false);
    backfill.data_dir = Some(backfill_dir.clone());
    commands::run_fetch(config.clone(), &backfill).unwrap();

    let main = Store::open(&config.archive.catalog).unwrap();
    assert_eq!(main.get_snapshot(1).unwrap(), Some(before));
    assert_eq!(main.list_snapshots().unwrap().len(), 1);

    let side = Store::open(&backfill_dir.join("catalog.db")).unwrap();
    let latest = side.get_latest_snapshot().unwrap().unwrap();
    assert_eq!((latest.id, latest.row_count), (1, 3));
    assert!(backfill_dir.join("1.csv").is_file());
}

#[test]
fn coverage_gaps_set_exit_code_only_when_asked() {
    let root = tempfile::tempdir().unwrap();
    let config = setup(root.path(), Format::Csv);
    let mut store = Store::open(&config.archive.catalog).unwrap();

    fetch_from(&config, &mut store, &root.path().join("v1.csv"), stamp(10, 4));
    fetch_from(&config, &mut store, &root.path().join("v2.csv"), stamp(11, 4));
    let contiguous = CoverageArgs {
        json: true,
        fail_on_gaps: true,
    };
    assert_eq!(commands::run_coverage(&config, &contiguous).unwrap(), EXIT_OK);

    fetch_from(&config, &mut store, &root.path().join("v2.csv"), stamp(13, 4));
    assert_eq!(commands::run_coverage(&config, &contiguous).unwrap(), EXIT_GAPS);

    let lenient = CoverageArgs {
        json: false,
        fail_on_gaps: false,
    };
    assert_eq!(commands::run_coverage(&config, &lenient).unwrap(), EXIT_OK);
}

#[test]
fn readme_check_fails_until_regenerated() {
    let root = tempfile::tempdir().unwrap();
    let config = setup(root.path(), Format::Csv);
    let mut store = Store::open(&config.archive.catalog).unwrap();
    fs::write(&config.readme.template, "Last update: {{updated_at}}\n").unwrap();

    fetch_from(&config, &mut store, &root.path().join("v1.csv"), stamp(10, 4));
    let check = ReadmeArgs { check: true };
    let write = ReadmeArgs { check: false };

    assert_eq!(commands::run_readme(&config, &check).unwrap(), EXIT_FAILURE);
    assert!(!config.readme.output.exists());

    assert_eq!(commands::run_readme(&config, &write).unwrap(), EXIT_OK);
    assert_eq!(commands::run_readme(&config, &check).unwrap(), EXIT_OK);

    fetch_from(&config, &mut store, &root.path().join("v2.csv"), stamp(11, 4));
    assert_eq!(commands::run_readme(&config, &check).unwrap(), EXIT_FAILURE);
}

#[test]
fn diff_defaults_to_two_latest_and_validates_arguments() {
    let root = tempfile::tempdir().unwrap();
    let config = setup(root.path(), Format::Csv);
    let mut store = Store::open(&config.archive.catalog).unwrap();
    let neither = DiffArgs { from: None, to: None };

    fetch_from(&config, &mut store, &root.path().join("v1.csv"), stamp(10, 4));
    assert!(matches!(commands::diff_ids(&store, &neither), Err(Error::Usage(_))));

    fetch_from(&config, &mut store, &root.path().join("v2.csv"), stamp(11, 4));
    fetch_from(&config, &mut store, &root.path().join("v1.csv"), stamp(12, 4));
    assert_eq!(commands::diff_ids(&store, &neither).unwrap(), (2, 3));

    let latest = commands::diff(&store, &neither).unwrap();
    assert_eq!((latest.from_id, latest.to_id), (2, 3));
    assert_eq!(latest.removed_columns().collect::<Vec<_>>(), vec!["train_type"]);

    let explicit = DiffArgs {
        from: Some(1),
        to: Some(3),
    };
    assert_eq!(commands::diff(&store, &explicit).unwrap().row_delta, 0);

    for half in [
        DiffArgs { from: Some(1), to: None },
        DiffArgs { from: None, to: Some(2) },
    ] {
        assert!(matches!(commands::diff_ids(&store, &half), Err(Error::Usage(_))));
    }

    let missing = DiffArgs {
        from: Some(1),
        to: Some(9),
    };
    assert!(matches!(commands::diff(&store, &missing), Err(Error::SnapshotNotFound(9))));
}
