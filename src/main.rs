use std::path::{Path, PathBuf};

use anyhow::anyhow;
use clap::Parser as ClapParser;
use clap::Subcommand;
use etlin::graph::consolidate;
use etlin::query::{ReachMode, query};
use etlin::script::{ScriptLineage, build_script_lineage};
use etlin::segment::FileKind;
use etlin::warning::Warning;
use indexmap::IndexMap;
use serde::Serialize;
use std::time::Instant;

#[derive(clap::Parser)]
#[command(name = "etlin")]
#[command(about = "ETL table lineage extractor and impact-analysis tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract per-script lineage from one or more ETL scripts or SQL files.
    ExtractLineage(ExtractCommand),
    /// Merge per-script lineage into one global graph.
    Consolidate(ConsolidateCommand),
    /// Query the consolidated graph for tables reachable from anchors.
    Query(QueryCommand),
}

#[derive(clap::Args)]
struct ExtractCommand {
    /// Path to an ETL script (.sh/.ksh), a SQL file (.sql/.bteq), or a
    /// directory containing them.
    #[arg(value_name = "SCRIPT_[FILE|DIR]")]
    input: PathBuf,
    /// Pretty-print the output JSON.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::Args)]
struct ConsolidateCommand {
    /// Path to a script file or a directory of scripts and/or previously
    /// exported lineage JSON documents.
    #[arg(value_name = "INPUT_[FILE|DIR]")]
    input: PathBuf,
    /// Pretty-print the output JSON.
    #[arg(long)]
    pretty: bool,
}

#[derive(clap::Args)]
struct QueryCommand {
    /// Path to a script file or a directory of scripts and/or previously
    /// exported lineage JSON documents.
    #[arg(value_name = "INPUT_[FILE|DIR]")]
    input: PathBuf,
    /// Anchor table names or qualified node ids. Repeatable.
    #[arg(short, long = "anchor", required = true)]
    anchors: Vec<String>,
    /// Reachability mode: direct, impacts, impacted-by, or both.
    #[arg(long, default_value = "both")]
    mode: ReachMode,
    /// Restrict the graph to nodes owned by these scripts. Repeatable.
    #[arg(long = "script")]
    scripts: Vec<String>,
    /// Pretty-print the output JSON.
    #[arg(long)]
    pretty: bool,
}

fn file_kind(path: &Path) -> Option<FileKind> {
    match path.extension()?.to_str()? {
        "sh" | "ksh" => Some(FileKind::Shell),
        "sql" | "bteq" => Some(FileKind::Sql),
        _ => None,
    }
}

fn script_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_from_file(path: &Path, kind: FileKind) -> anyhow::Result<ScriptLineage> {
    let raw = std::fs::read_to_string(path)
        .map_err(|_| anyhow!("Failed to read input file {}", path.display()))?;
    Ok(build_script_lineage(&raw, kind, &script_name(path)))
}

fn collect_inputs(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|file| {
                file_kind(file).is_some() || file.extension().is_some_and(|ext| ext == "json")
            })
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(anyhow!(
                "No .sh, .ksh, .sql, .bteq, or .json files found in {}",
                path.display()
            ));
        }
        Ok(files)
    } else {
        Ok(vec![path.to_path_buf()])
    }
}

/// Builds lineage for script inputs and deserializes `.json` lineage
/// documents. A document that fails to deserialize is skipped with a
/// structural warning, mirroring how consolidation treats malformed
/// in-memory documents; the remaining inputs proceed.
fn load_lineages(path: &Path) -> anyhow::Result<(Vec<ScriptLineage>, Vec<Warning>)> {
    let mut lineages = Vec::new();
    let mut skipped = Vec::new();
    for file in collect_inputs(path)? {
        if file.extension().is_some_and(|ext| ext == "json") {
            let text = std::fs::read_to_string(&file)
                .map_err(|_| anyhow!("Failed to read lineage document {}", file.display()))?;
            match serde_json::from_str::<ScriptLineage>(&text) {
                Ok(lineage) => lineages.push(lineage),
                Err(err) => {
                    log::warn!(
                        "skipping malformed lineage document {}: {}",
                        file.display(),
                        err
                    );
                    skipped.push(Warning::StructuralSkip {
                        script: script_name(&file),
                        message: err.to_string(),
                    });
                }
            }
        } else {
            let kind = file_kind(&file)
                .ok_or_else(|| anyhow!("Unsupported input file type: {}", file.display()))?;
            lineages.push(build_from_file(&file, kind)?);
        }
    }
    Ok((lineages, skipped))
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> anyhow::Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

fn main() -> anyhow::Result<()> {
    let now = Instant::now();

    env_logger::init();
    let cli = Cli::parse();

    match &cli.command {
        Commands::ExtractLineage(command) => {
            let out_str = if command.input.is_dir() {
                let mut file_lineages: IndexMap<String, ScriptLineage> = IndexMap::new();
                for file in collect_inputs(&command.input)? {
                    let Some(kind) = file_kind(&file) else {
                        continue;
                    };
                    let lineage = build_from_file(&file, kind)?;
                    file_lineages.insert(std::path::absolute(file)?.display().to_string(), lineage);
                }
                to_json(&file_lineages, command.pretty)?
            } else {
                let kind = file_kind(&command.input).ok_or_else(|| {
                    anyhow!("Unsupported input file type: {}", command.input.display())
                })?;
                let lineage = build_from_file(&command.input, kind)?;
                to_json(&lineage, command.pretty)?
            };
            println!("{}", out_str);
        }
        Commands::Consolidate(command) => {
            let (lineages, mut skipped) = load_lineages(&command.input)?;
            let mut graph = consolidate(&lineages);
            graph.warnings.append(&mut skipped);
            println!("{}", to_json(&graph, command.pretty)?);
        }
        Commands::Query(command) => {
            let (lineages, _) = load_lineages(&command.input)?;
            let graph = consolidate(&lineages);
            let script_filter = if command.scripts.is_empty() {
                None
            } else {
                Some(command.scripts.as_slice())
            };
            let view = query(&graph, &command.anchors, command.mode, script_filter);
            println!("{}", to_json(&view, command.pretty)?);
        }
    }

    let elapsed = now.elapsed();
    log::info!("Elapsed: {:.2?}", elapsed);

    Ok(())
}
