use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Table};
use tracing::{error, info, info_span, trace};

use cts_align::{AdmissionBundle, AlignedAdmission, align_admission, reported};
use cts_ingest::{discover_admissions, load_admission, load_sources, write_admission};
use cts_model::{AlignmentOptions, SourceDescriptor, default_sources};

use crate::cli::{AlignArgs, SourcesArgs};
use crate::logging::redact_value;
use crate::summary::{apply_table_style, dim_cell, header_cell};
use crate::types::{AdmissionSummary, AlignResult, SourceSummary};

/// Load descriptors from `path`, or the built-in MIMIC-IV set.
pub fn resolve_sources(path: Option<&Path>) -> Result<Vec<SourceDescriptor>> {
    match path {
        Some(path) => {
            load_sources(path).with_context(|| format!("load sources from {}", path.display()))
        }
        None => Ok(default_sources()),
    }
}

pub fn run_sources(args: &SourcesArgs) -> Result<()> {
    let sources = resolve_sources(args.sources.as_deref())?;
    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&sources).context("serialize sources")?
        );
    } else {
        println!("{}", sources_table(&sources));
    }
    Ok(())
}

/// Table listing each descriptor's kind and columns.
pub fn sources_table(sources: &[SourceDescriptor]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Kind"),
        header_cell("Time"),
        header_cell("Label"),
        header_cell("Value"),
    ]);
    apply_table_style(&mut table);
    for source in sources {
        let time = match (&source.time_col, &source.start_col, &source.end_col) {
            (Some(time), _, _) => time.clone(),
            (None, Some(start), Some(end)) => format!("{start} .. {end}"),
            _ => String::new(),
        };
        let time = if source.midday_dates && !time.is_empty() {
            format!("{time} (dates at 12:00)")
        } else {
            time
        };
        table.add_row(vec![
            Cell::new(&source.name),
            Cell::new(source.kind.as_str()),
            optional_cell((!time.is_empty()).then_some(time.as_str())),
            Cell::new(&source.label_col),
            optional_cell(source.value_col.as_deref()),
        ]);
    }
    table
}

fn optional_cell(value: Option<&str>) -> Cell {
    value.map_or_else(|| dim_cell("-"), Cell::new)
}

pub fn run_align(args: &AlignArgs) -> Result<AlignResult> {
    let options =
        AlignmentOptions::new(args.resolution).with_observation_window(args.window);
    options.validate().context("invalid alignment options")?;
    let sources = resolve_sources(args.sources.as_deref())?;
    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| args.input.join("aligned"));

    let folders: Vec<PathBuf> = if args.batch {
        discover_admissions(&args.input)
            .with_context(|| format!("scan {}", args.input.display()))?
    } else {
        vec![args.input.clone()]
    };
    if folders.is_empty() {
        bail!("no admission folders found under {}", args.input.display());
    }

    let run_span = info_span!(
        "align",
        input = %args.input.display(),
        admissions = folders.len(),
        dry_run = args.dry_run
    );
    let _run_guard = run_span.enter();
    let start = Instant::now();

    let mut result = AlignResult {
        output_dir: output_dir.clone(),
        dry_run: args.dry_run,
        ..AlignResult::default()
    };
    for folder in &folders {
        let outcome = align_folder(folder, &sources, &options, &output_dir, args.dry_run);
        match outcome {
            Ok(summary) => result.admissions.push(summary),
            Err(err) if args.batch => {
                error!(folder = %folder.display(), error = %err, "admission failed");
                result.errors.push(format!("{}: {err:#}", folder.display()));
                result.has_errors = true;
            }
            Err(err) => return Err(err),
        }
    }

    info!(
        aligned = result.admissions.len(),
        failed = result.errors.len(),
        duration_ms = start.elapsed().as_millis(),
        "alignment run complete"
    );
    Ok(result)
}

fn align_folder(
    folder: &Path,
    sources: &[SourceDescriptor],
    options: &AlignmentOptions,
    output_dir: &Path,
    dry_run: bool,
) -> Result<AdmissionSummary> {
    let bundle = load_admission(folder, sources)
        .with_context(|| format!("load admission {}", folder.display()))?;
    let (aligned, diagnostics) = align_admission(&bundle, sources, options);
    for (name, series) in &aligned.series {
        trace!(
            source = %name,
            labels = %redact_value(&series.label_columns().join(", ")),
            "aligned label columns"
        );
    }

    let files_written = if dry_run {
        0
    } else {
        write_admission(output_dir, &aligned, &diagnostics)
            .with_context(|| format!("write admission {}", aligned.id))?
            .files
            .len()
    };

    let mut summary = summarize(&bundle, &aligned, sources);
    summary.messages = reported(&diagnostics)
        .into_iter()
        .map(str::to_string)
        .collect();
    summary.files_written = files_written;
    Ok(summary)
}

fn summarize(
    bundle: &AdmissionBundle,
    aligned: &AlignedAdmission,
    sources: &[SourceDescriptor],
) -> AdmissionSummary {
    let sources = sources
        .iter()
        .map(|source| SourceSummary {
            name: source.name.clone(),
            kind: source.kind.to_string(),
            rows: bundle.tables.get(&source.name).map(|frame| frame.height()),
            columns: aligned
                .series
                .get(&source.name)
                .map(|series| series.label_columns().len()),
        })
        .collect();
    AdmissionSummary {
        id: aligned.id.clone(),
        admit_time: aligned.admit_time,
        discharge_time: aligned.discharge_time,
        grid_points: aligned.grid_len(),
        sources,
        messages: Vec::new(),
        files_written: 0,
    }
}
