use std::env;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use lexchunk_core::config::Config;
use lexchunk_core::data_processor::DataProcessor;
use lexchunk_core::types::DocType;
use lexchunk_pipeline::{write_jsonl, Pipeline};

const USAGE: &str = "Usage: lexchunk <input_dir> [--out FILE] [--limit N] [--doc-type TYPE]";

struct Args {
    input_dir: PathBuf,
    out: Option<PathBuf>,
    limit: Option<usize>,
    doc_type: Option<DocType>,
}

fn parse_args() -> anyhow::Result<Args> {
    let args: Vec<String> = env::args().skip(1).collect();
    let (mut input_dir, mut out, mut limit, mut doc_type) = (None, None, None, None);
    let mut i = 0;
    while i < args.len() {
        let value = |i: usize| args.get(i + 1).with_context(|| format!("{} requires a value\n{USAGE}", args[i]));
        match args[i].as_str() {
            "--out" | "-o" => { out = Some(PathBuf::from(value(i)?)); i += 1; }
            "--limit" => { limit = Some(value(i)?.parse::<usize>().with_context(|| format!("--limit requires a number\n{USAGE}"))?); i += 1; }
            "--doc-type" => { doc_type = Some(value(i)?.parse::<DocType>()?); i += 1; }
            "--help" | "-h" => { eprintln!("{USAGE}"); std::process::exit(0); }
            arg if !arg.starts_with('-') => input_dir = Some(PathBuf::from(arg)),
            other => bail!("Unknown option: {other}\n{USAGE}"),
        }
        i += 1;
    }
    let Some(input_dir) = input_dir else { bail!("{USAGE}") };
    Ok(Args { input_dir, out, limit, doc_type })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = parse_args()?;
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let pipeline = Pipeline::new(config.pipeline()?)?;

    let mut processor = DataProcessor::new();
    if let Some(doc_type) = args.doc_type { processor = processor.with_doc_type(doc_type); }
    let inputs = match args.limit {
        Some(limit) => processor.process_directory_limited(&args.input_dir, limit)?,
        None => processor.process_directory(&args.input_dir)?,
    };
    eprintln!("Chunking {} documents from {}", inputs.len(), args.input_dir.display());

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents {msg}")?.progress_chars("#>-"));
    let batch = pipeline.process_batch_with(inputs, |doc_id| { pb.inc(1); pb.set_message(doc_id.to_string()); });
    pb.finish_with_message("done");

    let written = match &args.out {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            write_jsonl(batch.records(), BufWriter::new(file))?
        }
        None => write_jsonl(batch.records(), io::stdout().lock())?,
    };

    let mut err = io::stderr().lock();
    writeln!(err, "Documents: {} processed, {} duplicate", batch.documents.len(), batch.duplicate_documents.len())?;
    writeln!(err, "Chunks:    {} written{}", written, args.out.as_ref().map(|p| format!(" to {}", p.display())).unwrap_or_default())?;
    for (kind, count) in batch.issue_counts() {
        writeln!(err, "Issues:    {kind} x{count}")?;
    }
    Ok(())
}
