//! Ingest dataset split trees into the signpal database.

use std::path::PathBuf;

use signpal::artifacts::linker::{self, IngestReport};
use signpal::config;
use signpal::store::DatasetDb;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let Some(options) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    if let Err(err) = signpal::logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let settings = config::load_or_default().map_err(|err| err.to_string())?;
    let db_path = options
        .db_path
        .or(settings.database_path)
        .ok_or("No database path; pass --db or set database_path in the config")?;
    let continuous = options.continuous.or(settings.continuous_root);
    let isolated = options.isolated.or(settings.isolated_root);
    if continuous.is_none() && isolated.is_none() {
        return Err("Nothing to ingest; pass --continuous and/or --isolated".to_string());
    }

    let db = DatasetDb::open(&db_path).map_err(|err| err.to_string())?;
    println!("DB: {}", db_path.display());

    if let Some(root) = continuous {
        let report = linker::ingest_continuous(&db, &root).map_err(|err| err.to_string())?;
        print_report(&report);
    }
    if let Some(root) = isolated {
        let report = linker::ingest_isolated(&db, &root).map_err(|err| err.to_string())?;
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &IngestReport) {
    println!();
    println!("Split '{}':", report.split);
    println!("- instances: {}", report.instances);
    println!("- videos: {}", report.videos);
    println!("- word annotations: {}", report.word_annotations);
    println!("- subtitles: {}", report.subtitles);
    println!("- poses: {}", report.poses);
    if !report.skipped.is_empty() {
        println!("- skipped (unknown instance): {}", report.skipped.len());
    }
    for extra in &report.duplicate_videos {
        println!(
            "- extra video for {}: {}",
            extra.instance_id,
            extra.path.display()
        );
    }
    for failure in &report.failures {
        println!("- FAILED category {}: {}", failure.category, failure.error);
    }
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    db_path: Option<PathBuf>,
    continuous: Option<PathBuf>,
    isolated: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut options = CliOptions::default();
    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            "--db" => options.db_path = Some(expect_value(&mut iter, "--db")?),
            "--continuous" => options.continuous = Some(expect_value(&mut iter, "--continuous")?),
            "--isolated" => options.isolated = Some(expect_value(&mut iter, "--isolated")?),
            other => return Err(format!("Unknown argument: {other}")),
        }
    }
    Ok(Some(options))
}

fn expect_value(iter: &mut impl Iterator<Item = String>, flag: &str) -> Result<PathBuf, String> {
    iter.next()
        .map(PathBuf::from)
        .ok_or_else(|| format!("{flag} requires a path"))
}

fn print_usage() {
    println!("Usage: signpal-ingest [--db <file>] [--continuous <root>] [--isolated <root>]");
    println!();
    println!("Paths omitted on the command line fall back to the config file.");
}
