//! Compare two dataset roots and report per-instance artifact coverage.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use signpal::artifacts::BodyPart;
use signpal::artifacts::coverage;

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

    let parts: Vec<&str> = options.parts.iter().map(String::as_str).collect();
    let rows = coverage::reconcile(&options.first, &options.second, &parts)
        .map_err(|err| err.to_string())?;

    let first_label = label_for(&options.first);
    let second_label = label_for(&options.second);
    match &options.out {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| format!("Failed to create {}: {err}", path.display()))?;
            let mut writer = BufWriter::new(file);
            coverage::write_csv(&rows, &first_label, &second_label, &mut writer)
                .and_then(|()| writer.flush())
                .map_err(|err| format!("Failed to write {}: {err}", path.display()))?;
            println!("Wrote {} rows to {}", rows.len(), path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            coverage::write_csv(&rows, &first_label, &second_label, &mut stdout)
                .map_err(|err| err.to_string())?;
        }
    }
    Ok(())
}

fn label_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone)]
struct CliOptions {
    first: PathBuf,
    second: PathBuf,
    parts: Vec<String>,
    out: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<Option<CliOptions>, String> {
    let mut positional = Vec::new();
    let mut parts: Vec<String> = BodyPart::ALL
        .iter()
        .map(|part| part.dir_name().to_string())
        .collect();
    let mut out = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(None);
            }
            "--parts" => {
                let value = iter.next().ok_or("--parts requires a comma-separated list")?;
                parts = value
                    .split(',')
                    .map(|part| part.trim().to_string())
                    .filter(|part| !part.is_empty())
                    .collect();
                if parts.is_empty() {
                    return Err("--parts requires at least one subfolder name".to_string());
                }
            }
            "--out" => {
                out = Some(PathBuf::from(
                    iter.next().ok_or("--out requires a file path")?,
                ));
            }
            other => positional.push(PathBuf::from(other)),
        }
    }
    let [first, second] = positional.as_slice() else {
        print_usage();
        return Err("Expected exactly two roots to compare".to_string());
    };
    Ok(Some(CliOptions {
        first: first.clone(),
        second: second.clone(),
        parts,
        out,
    }))
}

fn print_usage() {
    println!("Usage: signpal-coverage <first_root> <second_root> [--parts face,pose,...] [--out report.csv]");
    println!();
    println!("Lists each instance id found under <root>/<part> on either side");
    println!("and whether it is present on each. Defaults to the four pose");
    println!("body parts; output goes to stdout unless --out is given.");
}
