//! sizepress CLI - compress images to a byte budget

use std::path::PathBuf;

use clap::Parser;
use sizepress::CodecKind;

mod batch;

/// Compress images to fit a target size.
#[derive(Parser)]
#[command(name = "sizepress")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input image file or directory
    input: PathBuf,

    /// Output file (single input) or directory (batch)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Target size in KiB; enables the quality search
    #[arg(short = 'c', long = "size-kb", conflicts_with = "quality")]
    size_kb: Option<u64>,

    /// Fixed quality (1-100); encodes once, no search
    #[arg(short, long)]
    quality: Option<u8>,

    /// Output format (jpeg, png, gif, webp, avif); defaults to the input's
    #[arg(short, long)]
    format: Option<String>,

    /// Downscale factor per fallback round, strictly between 0 and 1
    #[arg(short, long, default_value_t = 0.7)]
    scale: f64,

    /// Smallest dimension downscaling may reach
    #[arg(long, default_value_t = 16)]
    min_dimension: u32,

    /// Recurse into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Emit a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let format = match cli.format.as_deref() {
        Some(name) => Some(parse_format(name)?),
        None => None,
    };

    let job = batch::Job {
        output: cli.output,
        size_kb: cli.size_kb,
        quality: cli.quality,
        format,
        scale: cli.scale,
        min_dimension: cli.min_dimension,
        json: cli.json,
        verbose: cli.verbose,
    };

    if cli.input.is_dir() {
        batch::run_directory(&cli.input, cli.recursive, &job)
    } else {
        batch::run_file(&cli.input, &job)
    }
}

fn parse_format(name: &str) -> anyhow::Result<CodecKind> {
    CodecKind::from_extension(name)
        .ok_or_else(|| anyhow::anyhow!("unknown format: {name} (expected jpeg, png, gif, webp, or avif)"))
}
