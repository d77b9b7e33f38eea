//! File and directory processing for the CLI.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use walkdir::WalkDir;

use sizepress::{codec, compress, CodecKind, CompressionOptions, DecodedImage};

/// Settings shared by every file in a run.
pub struct Job {
    pub output: Option<PathBuf>,
    pub size_kb: Option<u64>,
    pub quality: Option<u8>,
    pub format: Option<CodecKind>,
    pub scale: f64,
    pub min_dimension: u32,
    pub json: bool,
    pub verbose: bool,
}

/// Per-file report, printed as text or serialized with `--json`.
#[derive(Debug, Serialize)]
struct FileReport {
    input: PathBuf,
    output: PathBuf,
    format: CodecKind,
    quality: u8,
    final_width: u32,
    final_height: u32,
    original_bytes: u64,
    compressed_bytes: u64,
    ratio_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    met_target: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rounds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trials: Option<u32>,
}

/// Compress a single file.
pub fn run_file(input: &Path, job: &Job) -> Result<()> {
    let report = process_file(input, job.output.as_deref(), job)?;
    if job.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

/// Compress every image under a directory, in parallel.
pub fn run_directory(input: &Path, recursive: bool, job: &Job) -> Result<()> {
    let files = collect_inputs(input, recursive)?;
    if files.is_empty() {
        bail!("no image files found under {}", input.display());
    }
    if job.verbose {
        eprintln!("Processing {} files from {}", files.len(), input.display());
    }

    let out_dir = job
        .output
        .clone()
        .unwrap_or_else(|| input.join("compressed"));
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let outcomes: Vec<(PathBuf, Result<FileReport>)> = files
        .par_iter()
        .map(|path| {
            let dest = destination_in_dir(path, &out_dir, job);
            (path.clone(), process_file(path, Some(&dest), job))
        })
        .collect();

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (path, outcome) in outcomes {
        match outcome {
            Ok(report) => reports.push(report),
            Err(err) => failures.push((path, err)),
        }
    }

    if job.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            print_report(report);
        }
        print_summary(&reports);
    }

    for (path, err) in &failures {
        eprintln!("FAILED {}: {err:#}", path.display());
    }
    if !failures.is_empty() {
        bail!("{} of {} files failed", failures.len(), failures.len() + reports.len());
    }
    Ok(())
}

/// Image files under `dir`, judged by extension.
fn collect_inputs(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(max_depth) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let known = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(CodecKind::from_extension)
            .is_some();
        if known {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn process_file(input: &Path, output: Option<&Path>, job: &Job) -> Result<FileReport> {
    if job.verbose {
        eprintln!("Reading {}", input.display());
    }
    let bytes = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let original_bytes = bytes.len() as u64;

    let image = codec::decode(&bytes)
        .with_context(|| format!("Failed to decode {}", input.display()))?;
    let format = resolve_format(input, job)?;

    let (buffer, quality, width, height, search) = encode_image(&image, format, job)?;

    let dest = match output {
        Some(path) => path.to_path_buf(),
        None => default_output(input, format),
    };
    fs::write(&dest, &buffer).with_context(|| format!("Failed to write {}", dest.display()))?;

    let compressed_bytes = buffer.len() as u64;
    Ok(FileReport {
        input: input.to_path_buf(),
        output: dest,
        format,
        quality,
        final_width: width,
        final_height: height,
        original_bytes,
        compressed_bytes,
        ratio_percent: compressed_bytes as f64 / original_bytes.max(1) as f64 * 100.0,
        met_target: search.map(|s| s.0),
        rounds: search.map(|s| s.1),
        trials: search.map(|s| s.2),
    })
}

type SearchStats = Option<(bool, u32, u32)>;

fn encode_image(
    image: &DecodedImage,
    format: CodecKind,
    job: &Job,
) -> Result<(Vec<u8>, u8, u32, u32, SearchStats)> {
    if let Some(size_kb) = job.size_kb {
        let options = CompressionOptions::builder(format, size_kb * 1024)
            .scale_factor(job.scale)
            .min_dimension(job.min_dimension)
            .build();
        let result = compress(image, &options)?;
        if !result.met_target {
            eprintln!(
                "warning: target {size_kb} KiB not met, best attempt is {} bytes",
                result.size_after
            );
        }
        return Ok((
            result.buffer,
            result.quality,
            result.final_width,
            result.final_height,
            Some((result.met_target, result.rounds, result.trials)),
        ));
    }

    // No byte budget: a single encode at the requested quality.
    let quality = job.quality.unwrap_or(85);
    let buffer = codec::encode(image, format, quality)?;
    Ok((buffer, quality, image.width(), image.height(), None))
}

fn resolve_format(input: &Path, job: &Job) -> Result<CodecKind> {
    if let Some(format) = job.format {
        return Ok(format);
    }
    input
        .extension()
        .and_then(|e| e.to_str())
        .and_then(CodecKind::from_extension)
        .with_context(|| format!("Cannot infer output format from {}", input.display()))
}

/// Sibling `<stem>_compressed.<ext>` for single-file runs.
fn default_output(input: &Path, format: CodecKind) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let name = format!("{stem}_compressed.{}", format.extension());
    input.with_file_name(name)
}

/// `<out_dir>/<stem>.<ext>` for batch runs.
fn destination_in_dir(input: &Path, out_dir: &Path, job: &Job) -> PathBuf {
    let format = job.format.or_else(|| {
        input
            .extension()
            .and_then(|e| e.to_str())
            .and_then(CodecKind::from_extension)
    });
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = format.map_or("img", CodecKind::extension);
    out_dir.join(format!("{stem}.{ext}"))
}

fn print_report(report: &FileReport) {
    println!(
        "{} -> {} ({}x{}, q{}, {} -> {} bytes, {:.1}%)",
        report.input.display(),
        report.output.display(),
        report.final_width,
        report.final_height,
        report.quality,
        report.original_bytes,
        report.compressed_bytes,
        report.ratio_percent,
    );
    if report.met_target == Some(false) {
        println!("  target not met");
    }
}

fn print_summary(reports: &[FileReport]) {
    let before: u64 = reports.iter().map(|r| r.original_bytes).sum();
    let after: u64 = reports.iter().map(|r| r.compressed_bytes).sum();
    println!("{:-<60}", "");
    println!("Files: {}", reports.len());
    println!("Total: {} -> {} bytes", before, after);
    if before > 0 {
        println!("Ratio: {:.1}%", after as f64 / before as f64 * 100.0);
    }
    let missed = reports.iter().filter(|r| r.met_target == Some(false)).count();
    if missed > 0 {
        println!("Targets missed: {missed}");
    }
}
