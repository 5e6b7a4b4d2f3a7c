//! Command implementations.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use animator_model::{CompressionLevel, Document, LoadReport};
use anyhow::{ensure, Context, Result};
use clap::Subcommand;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::{AnimatorConfig, CONFIG_FILE};

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a file and report every problem found
    Check {
        /// Animation file
        file: PathBuf,
        /// Exit with an error status if any problem was found
        #[arg(long)]
        strict: bool,
    },
    /// Re-encode a file
    Print {
        /// Animation file
        file: PathBuf,
        /// Compression level: none, medium or full
        #[arg(long)]
        level: Option<CompressionLevel>,
        /// Wrap every line in HTML highlighting markup
        #[arg(long)]
        colorize: bool,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show what a file contains
    Stats {
        /// Animation file
        file: PathBuf,
    },
    /// Write the effective configuration to a file
    InitConfig {
        /// Target file (defaults to ./animator.toml)
        path: Option<PathBuf>,
    },
}

/// Runs a command. Returns false if the command should exit unsuccessfully.
pub fn run(command: Command, config: &AnimatorConfig) -> Result<bool> {
    match command {
        Command::Check { file, strict } => {
            let (_, report) = open(&file)?;
            print!("{}", describe_report(&file, &report));
            Ok(!strict || report.is_clean())
        },
        Command::Print {
            file,
            level,
            colorize,
            output,
        } => {
            let (doc, _) = open(&file)?;
            let level = level.unwrap_or(config.compression);
            let Some(text) = doc.print(Some(level), colorize || config.colorize) else {
                warn!("{} has no content, nothing to print", file.display());
                return Ok(true);
            };
            match output {
                Some(path) => {
                    fs::write(&path, text)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!("Wrote {} ({} compression)", path.display(), level);
                },
                None => println!("{text}"),
            }
            Ok(true)
        },
        Command::Stats { file } => {
            let (doc, report) = open(&file)?;
            print!("{}", describe_document(&doc, &report));
            Ok(true)
        },
        Command::InitConfig { path } => {
            let path = path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
            config
                .save_to(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Ok(true)
        },
    }
}

/// Reads and loads an animation file.
pub fn open(path: &Path) -> Result<(Document, LoadReport)> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let data: Value = serde_json::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    ensure!(
        data.is_object(),
        "Invalid animation file {}: expected an object at the root",
        path.display()
    );

    let mut doc = Document::new();
    let report = doc.load_with_report(&data);
    Ok((doc, report))
}

fn describe_report(path: &Path, report: &LoadReport) -> String {
    let mut out = format!("{}: {} errors\n", path.display(), report.error_count());
    for warning in report.warnings() {
        let _ = writeln!(out, "  {warning}");
    }
    out
}

fn describe_document(doc: &Document, report: &LoadReport) -> String {
    let mut out = String::new();
    let rows = [
        ("tags", doc.tags().count()),
        ("sound pools", doc.sound_pools().len()),
        ("transformation groups", doc.transformation_groups().len()),
        ("state types", doc.state_types().len()),
        (
            "states",
            doc.state_types().iter().map(|t| t.states().len()).sum(),
        ),
        ("parts", doc.parts().len()),
        (
            "part states",
            doc.parts().iter().map(|p| p.part_states().len()).sum(),
        ),
        ("particle emitters", doc.particle_emitters().len()),
        (
            "particles",
            doc.particle_emitters().iter().map(|e| e.particles().len()).sum(),
        ),
    ];
    for (label, count) in rows {
        let _ = writeln!(out, "{label:>22}: {count}");
    }
    let _ = writeln!(out, "{:>22}: {}", "load errors", report.error_count());
    let _ = writeln!(out, "{}", doc.registry().statistic());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
        "globalTagDefaults": {"frame": "1"},
        "animatedParts": {
            "stateTypes": {"Pose": {"states": {"walk": {"frames": 4}}}},
            "parts": {
                "leg": {
                    "properties": {"anchorPart": "Ghost"},
                    "partStates": {"Pose": {"walk": {"properties": {"image": "leg.png"}}}}
                }
            }
        }
    }"#;

    fn sample_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("leg.animation");
        fs::write(&path, SAMPLE).expect("write sample");
        path
    }

    #[test]
    fn test_open_reports_problems() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = sample_file(&dir);
        let (doc, report) = open(&path).expect("sample loads");
        assert_eq!(report.error_count(), 1);
        assert_eq!(doc.parts().len(), 1);

        let text = describe_report(&path, &report);
        assert!(text.contains("1 errors"));
        assert!(text.contains("Ghost"));
    }

    #[test]
    fn test_open_rejects_bad_files() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("list.animation");
        fs::write(&path, "[]").expect("write file");
        assert!(open(&path).is_err());
        assert!(open(&dir.path().join("missing.animation")).is_err());
    }

    #[test]
    fn test_strict_check_fails_on_errors() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let file = sample_file(&dir);
        let config = AnimatorConfig::default();
        let ok = run(Command::Check { file: file.clone(), strict: false }, &config).expect("check runs");
        assert!(ok);
        let ok = run(Command::Check { file, strict: true }, &config).expect("check runs");
        assert!(!ok);
    }

    #[test]
    fn test_print_to_file() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let file = sample_file(&dir);
        let output = dir.path().join("out.animation");
        let command = Command::Print {
            file,
            level: Some(CompressionLevel::Full),
            colorize: false,
            output: Some(output.clone()),
        };
        assert!(run(command, &AnimatorConfig::default()).expect("print runs"));

        let written = fs::read_to_string(&output).expect("output written");
        assert!(!written.contains('\n'));
        let tree: Value = serde_json::from_str(&written).expect("valid json");
        assert_eq!(tree["animatedParts"]["stateTypes"]["Pose"]["states"]["walk"]["frames"], 4);
    }

    #[test]
    fn test_init_config_round_trips() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join(CONFIG_FILE);
        let config = AnimatorConfig {
            colorize: true,
            ..AnimatorConfig::default()
        };
        assert!(run(Command::InitConfig { path: Some(path.clone()) }, &config).expect("config written"));
        assert_eq!(AnimatorConfig::load_from(&path), config);
    }

    #[test]
    fn test_stats() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let (doc, report) = open(&sample_file(&dir)).expect("sample loads");
        let text = describe_document(&doc, &report);
        assert!(text.contains("parts: 1"));
        assert!(text.contains("states: 2"));
        assert!(text.contains("Currently registered: 6 ids"));
    }
}
