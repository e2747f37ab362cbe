mod store;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use poi_index::tokenizer::Stemming;
use poi_index::{CancellationFlag, Field, IndexerConfig, MainIndex, PlaceKind, PlaceRecord, SpimiIndexer, TextTokenizer, Tokenizer};
use store::SledDocStore;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query the place search index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from place records (JSON/JSONL file or directory)
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output index directory
        #[arg(long)]
        output: PathBuf,
        /// JSON file with indexer settings; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        batch_size: Option<usize>,
        /// (term, doc) pairs held in memory before a segment is flushed
        #[arg(long)]
        max_postings: Option<usize>,
        #[arg(long)]
        workers: Option<usize>,
        #[arg(long, default_value_t = false)]
        keep_segments: bool,
        #[arg(long, default_value_t = false)]
        no_skip_lists: bool,
        /// Apply English stemming to tokens
        #[arg(long, default_value_t = false)]
        stem: bool,
    },
    /// Print the places whose field contains every query term
    Postings {
        /// Index directory
        #[arg(long)]
        index: PathBuf,
        #[arg(long, default_value = "name")]
        field: Field,
        /// Query text
        query: Vec<String>,
        #[arg(long, default_value_t = false)]
        stem: bool,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, config, batch_size, max_postings, workers, keep_segments, no_skip_lists, stem } => {
            let mut cfg = match config {
                Some(path) => IndexerConfig::from_json_file(&path)
                    .with_context(|| format!("reading config {}", path.display()))?,
                None => IndexerConfig::default(),
            };
            cfg.output_dir = output;
            if let Some(n) = batch_size {
                cfg.batch_size = n;
            }
            if let Some(n) = max_postings {
                cfg.max_postings_per_segment = n;
            }
            if let Some(n) = workers {
                cfg.workers = n;
            }
            cfg.keep_segments |= keep_segments;
            cfg.build_skip_lists &= !no_skip_lists;
            build_index(&input, cfg, tokenizer(stem))
        }
        Commands::Postings { index, field, query, stem, limit } => {
            query_index(&index, field, &query.join(" "), tokenizer(stem), limit)
        }
    }
}

fn tokenizer(stem: bool) -> TextTokenizer {
    let stemming = if stem { Stemming::English } else { Stemming::None };
    TextTokenizer::new().with_stemming(stemming)
}

fn build_index(input: &Path, cfg: IndexerConfig, tokenizer: TextTokenizer) -> Result<()> {
    let files = input_files(input)?;
    let mut ways = Vec::new();
    let mut nodes = Vec::new();
    for file in &files {
        for place in read_places(file)? {
            match place.kind {
                PlaceKind::Way => ways.push(place),
                PlaceKind::Node => nodes.push(place),
            }
        }
    }
    tracing::info!(files = files.len(), ways = ways.len(), nodes = nodes.len(), "read places");

    std::fs::create_dir_all(&cfg.output_dir)?;
    let store = SledDocStore::open(&cfg.output_dir)?;
    let output = cfg.output_dir.clone();
    let summary = SpimiIndexer::new(cfg, tokenizer, &store).build(ways, nodes, &CancellationFlag::new())?;
    store.flush()?;

    tracing::info!(output = %output.display(), stored = store.len(), "index build complete");
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn input_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input {} does not exist", input.display());
    }
    Ok(files)
}

/// `.jsonl`: one place per line. Anything else: a JSON array of places or a single place.
fn read_places(file: &Path) -> Result<Vec<PlaceRecord>> {
    let reader = BufReader::new(File::open(file)?);
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let mut places = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let place = serde_json::from_str(&line)
                .with_context(|| format!("{}:{}", file.display(), n + 1))?;
            places.push(place);
        }
        return Ok(places);
    }
    let json: serde_json::Value = serde_json::from_reader(reader)?;
    let places = match json {
        serde_json::Value::Array(_) => serde_json::from_value(json)?,
        serde_json::Value::Object(_) => vec![serde_json::from_value(json)?],
        _ => Vec::new(),
    };
    Ok(places)
}

fn query_index(dir: &Path, field: Field, query: &str, tokenizer: TextTokenizer, limit: usize) -> Result<()> {
    let index = MainIndex::open(dir).with_context(|| format!("opening index {}", dir.display()))?;
    let terms = tokenizer.tokenize(query);
    if terms.is_empty() {
        bail!("query has no searchable terms");
    }
    let docs = index.conjunctive(field, &terms)?;
    tracing::info!(%field, terms = ?terms, hits = docs.len(), "query");

    let store = SledDocStore::open(dir)?;
    for id in docs.iter().take(limit) {
        match store.get(*id)? {
            Some(doc) => println!("{id}\t{}\t{}\t{:.6},{:.6}", doc.name, doc.address, doc.lat, doc.lon),
            None => println!("{id}"),
        }
    }
    if docs.len() > limit {
        println!("... {} more", docs.len() - limit);
    }
    Ok(())
}
