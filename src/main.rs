use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use humansize::{BINARY, format_size};
use tracing::{Level, info, warn};

use sift::{Analyzer, AnalyzerConfig, ReportOptions, StreamAnalysis, render};
use sift_core::CarverConfig;
use sift_io::{DirectoryCatalog, NamedStream, ResultWriter, StreamCatalog, open_catalog};

#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Recover compressed segments and embedded text from compound-document streams")]
#[command(author = "Sift Project")]
struct Cli {
    /// Compound file, or a directory of per-stream .bin dumps
    input: PathBuf,

    #[arg(short, long, default_value = "./sift_out")]
    output: PathBuf,

    /// Treat INPUT as a directory of .bin stream dumps
    #[arg(long)]
    dir: bool,

    /// Bytes of each stream head shown in reports
    #[arg(long, default_value_t = sift::report::DEFAULT_HEX_LIMIT)]
    hex_limit: usize,

    /// Shortest string reported by the run decoders
    #[arg(long, default_value_t = sift_core::text::DEFAULT_MIN_RUN_LEN)]
    min_len: usize,

    /// Also write each analysis as JSON
    #[arg(long)]
    json: bool,

    /// Also copy each raw stream to the output directory
    #[arg(long)]
    write_raw: bool,

    /// Locate segment ends with a single probe decode first
    #[arg(long)]
    trailer_probe: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(short, long, conflicts_with = "verbose")]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let streams = load_streams(&cli)?;
    info!(count = streams.len(), "streams loaded");

    let config = AnalyzerConfig::default()
        .with_min_run_len(cli.min_len)
        .with_carver(CarverConfig::default().with_trailer_probe(cli.trailer_probe));
    let analyses = Analyzer::with_config(config).analyze_all(&streams);

    let writer = ResultWriter::new(&cli.output);
    let options = ReportOptions {
        hex_limit: cli.hex_limit,
        ..Default::default()
    };
    for (stream, analysis) in streams.iter().zip(&analyses) {
        persist(&writer, &cli, stream, analysis, &options)
            .with_context(|| format!("Failed to write results for {}", stream.name))?;
    }

    print_summary(&analyses);
    println!("\nResults written to {}", writer.output_dir().display());
    Ok(())
}

fn load_streams(cli: &Cli) -> Result<Vec<NamedStream>> {
    let mut catalog: Box<dyn StreamCatalog> = if cli.dir {
        Box::new(DirectoryCatalog::open(&cli.input)?)
    } else {
        open_catalog(&cli.input)?
    };
    let streams = catalog
        .streams()
        .with_context(|| format!("Failed to read streams from {}", cli.input.display()))?;
    if streams.is_empty() {
        warn!(input = %cli.input.display(), "no streams found");
    }
    Ok(streams)
}

fn persist(
    writer: &ResultWriter,
    cli: &Cli,
    stream: &NamedStream,
    analysis: &StreamAnalysis,
    options: &ReportOptions,
) -> Result<()> {
    let stub = &analysis.stub;
    if cli.write_raw {
        writer.write_raw(stub, &stream.data)?;
    }
    if let Some(plaintext) = analysis.plaintext() {
        writer.write_plaintext(stub, plaintext)?;
    }
    for embedded in &analysis.embedded {
        let embedded_stub = format!("{stub}_embedded_{:06X}", embedded.offset);
        writer.write_plaintext(&embedded_stub, &embedded.plaintext)?;
    }
    if let Some(preview) = &analysis.preview {
        writer.write_preview(stub, sift_core::Signature::Png.extension(), &preview.bytes)?;
    }
    if cli.json {
        writer.write_json(stub, analysis)?;
    }
    writer.write_report(stub, &render(analysis, options))?;
    Ok(())
}

fn print_summary(analyses: &[StreamAnalysis]) {
    println!(
        "{:<36} {:<18} {:>10} {:<14} {:>8}",
        "STREAM", "PROFILE", "SIZE", "CARVE", "STRINGS"
    );
    println!("{}", "-".repeat(90));
    for a in analyses {
        let carve = a.carve.as_ref().map_or("-", |c| c.label());
        println!(
            "{:<36} {:<18} {:>10} {:<14} {:>8}",
            a.name,
            a.profile.name(),
            format_size(a.size, BINARY),
            carve,
            a.string_count()
        );
    }
}
