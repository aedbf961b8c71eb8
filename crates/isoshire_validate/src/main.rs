//! Validate community collection maps before they are merged
//!
//! Run with: isoshire_validate [MAPS_DIR]
//!
//! Every `*.json` file in the directory is checked. All problems are listed
//! and the process exits with status 1 if any file fails.

use clap::Parser;
use isoshire_core::collection::{audit_document, CollectionStore};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "isoshire_validate",
    about = "Check Isoshire collection map files against the collection schema"
)]
struct Args {
    /// Directory holding one `<id>.json` file per map
    #[arg(default_value = "collections/maps", value_name = "MAPS_DIR")]
    maps_dir: PathBuf,
}

/// Outcome of checking a directory
#[derive(Debug, Default)]
struct Report {
    files: usize,
    issues: Vec<String>,
}

fn validate_dir(dir: &Path) -> Report {
    let files = match CollectionStore::new(dir).json_files() {
        Ok(files) => files,
        Err(e) => {
            tracing::debug!("Cannot list {:?}: {}", dir, e);
            Vec::new()
        }
    };

    let mut report = Report {
        files: files.len(),
        issues: Vec::new(),
    };
    let mut seen_ids = HashSet::new();

    for path in &files {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                report
                    .issues
                    .push(format!("{}: could not read file ({}).", path.display(), e));
                continue;
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(data) => report
                .issues
                .extend(audit_document(path, &data, &mut seen_ids)),
            Err(e) => report
                .issues
                .push(format!("{}: invalid JSON ({}).", path.display(), e)),
        }
    }

    report
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();
    let report = validate_dir(&args.maps_dir);

    if report.files == 0 {
        println!(
            "No map files found in {}, nothing to validate.",
            args.maps_dir.display()
        );
        return ExitCode::SUCCESS;
    }

    if report.issues.is_empty() {
        println!("Validated {} map file(s).", report.files);
        return ExitCode::SUCCESS;
    }

    eprintln!("Collection validation failed:");
    for issue in &report.issues {
        eprintln!("- {}", issue);
    }
    ExitCode::FAILURE
}
