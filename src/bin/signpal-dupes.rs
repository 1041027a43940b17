//! Report filename collisions across directory trees.

use std::path::PathBuf;

use signpal::artifacts::duplicates;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_usage();
        return Ok(());
    }
    if args.is_empty() {
        print_usage();
        return Err("Expected at least one directory to scan".to_string());
    }
    if let Err(err) = signpal::logging::init() {
        eprintln!("Logging disabled: {err}");
    }

    let directories: Vec<PathBuf> = args.into_iter().map(PathBuf::from).collect();
    let duplicates = duplicates::find_duplicates(&directories);
    if duplicates.is_empty() {
        println!("No duplicates found.");
        return Ok(());
    }

    println!("Duplicates found: {}", duplicates.len());
    for (name, paths) in &duplicates {
        println!();
        println!("{name}:");
        for path in paths {
            println!("  - {}", path.display());
        }
    }
    Ok(())
}

fn print_usage() {
    println!("Usage: signpal-dupes <dir> [<dir> ...]");
    println!();
    println!("Walks every tree recursively and lists file names (extension");
    println!("included) that occur more than once across all of them.");
}
