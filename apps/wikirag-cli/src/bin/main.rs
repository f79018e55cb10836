//! `wikirag`: build the Wikipedia chunk index and ask questions against it.
//!
//! Usage:
//!   wikirag build [--clean]          # chunk, embed and index the article source
//!   wikirag chat                     # interactive question loop
//!   wikirag ask "<question>"         # one-shot answer
//!   wikirag search "<query>"         # ranked context only, no LLM call
//!   wikirag verify-key               # check the API key against /models

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::Path;

use wikirag_core::config::{Config, Settings};
use wikirag_core::logging;
use wikirag_core::types::ScoredChunk;
use wikirag_embed::{get_default_embedder, get_default_scorer};
use wikirag_llm::OpenAiSynthesizer;
use wikirag_rag::{artifacts_present, build_artifacts, load_artifacts, Pipeline, Reranker, Retriever, KEY_CHECK_HINT};

#[derive(Parser)]
#[command(name = "wikirag", version, about = "Question answering over a Wikipedia chunk index")]
struct Cli {
    /// Debug logging and ranked context output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// (Re)create the chunk file and the vector index
    Build {
        /// Replace existing artifacts without asking
        #[arg(long)]
        clean: bool,
        /// Directory of .txt articles, a .jsonl dump or a .parquet dump
        #[arg(long)]
        source: Option<String>,
        #[arg(long)]
        max_articles: Option<usize>,
        /// Words per chunk
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Interactive question loop
    Chat {
        /// Do not check the API key before the first question
        #[arg(long)]
        skip_verify: bool,
    },
    /// Answer one question and exit
    Ask { query: String },
    /// Show the ranked context for a query without generating an answer
    Search {
        query: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        no_rerank: bool,
    },
    /// Check the configured API key
    VerifyKey,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let config = Config::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let mut settings = config.settings()?;
    tracing::debug!("Loaded settings for env '{}'", config.env_name());

    match cli.command {
        Command::Build { clean, source, max_articles, chunk_size } => {
            if let Some(s) = source { settings.data.source = s; }
            if let Some(n) = max_articles { settings.data.max_articles = n; }
            if let Some(n) = chunk_size { settings.data.chunk_size = n; }
            settings.validate_for_env(config.env_name())?;
            build(&settings, clean)?;
        }
        Command::Chat { skip_verify } => chat(&settings, skip_verify, cli.verbose)?,
        Command::Ask { query } => {
            let pipeline = Pipeline::from_settings(&settings)?;
            answer(&pipeline, &query, cli.verbose);
        }
        Command::Search { query, top_k, no_rerank } => search(&settings, &query, top_k, !no_rerank)?,
        Command::VerifyKey => {
            OpenAiSynthesizer::new(&settings.generation)?.verify().inspect_err(|_| eprintln!("{}", KEY_CHECK_HINT))?;
            println!("API key verified successfully");
        }
    }
    Ok(())
}

fn build(settings: &Settings, clean: bool) -> Result<()> {
    if artifacts_present(settings) && !clean {
        let reply = prompt("It seems that your data directory is not empty. Would you like to clear it? (Y/n): ")?.unwrap_or_default();
        if !reply.eq_ignore_ascii_case("y") {
            println!("Keeping existing artifacts.");
            return Ok(());
        }
    }
    clear_artifacts(settings)?;
    let embedder = get_default_embedder(&settings.retrieval, &settings.models)?;
    let fp = build_artifacts(settings, embedder.as_ref())?;
    println!("Indexed {} chunks with {} (dim={})", fp.chunk_count, fp.embedder_id, fp.dim);
    Ok(())
}

/// Remove the generated chunk file and index. The article source is left alone.
fn clear_artifacts(settings: &Settings) -> Result<()> {
    let chunks = settings.data.chunks_path();
    let index = settings.data.index_path();
    let cleared = remove_if_exists(&chunks)? | remove_if_exists(&index)?;
    if cleared { println!("Data directory cleared."); }
    Ok(())
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    if path.is_dir() {
        std::fs::remove_dir_all(path)?;
    } else if path.is_file() {
        std::fs::remove_file(path)?;
    } else {
        return Ok(false);
    }
    Ok(true)
}

fn chat(settings: &Settings, skip_verify: bool, verbose: bool) -> Result<()> {
    if !skip_verify {
        let synth = OpenAiSynthesizer::new(&settings.generation)?;
        if let Err(e) = synth.verify() {
            eprintln!("Error verifying API key: {}", e);
            eprintln!("{}", KEY_CHECK_HINT);
            std::process::exit(1);
        }
        println!("API key verified successfully");
    }
    if !artifacts_present(settings) {
        println!("No index found, building it first...");
        build(settings, true)?;
    }
    let pipeline = Pipeline::from_settings(settings)?;
    loop {
        let Some(query) = prompt("\nEnter your Topic (Q to Quit): ")? else { break };
        if query.eq_ignore_ascii_case("q") { break; }
        if query.is_empty() { continue; }
        answer(&pipeline, &query, verbose);
    }
    Ok(())
}

fn answer(pipeline: &Pipeline, query: &str, verbose: bool) {
    if verbose {
        match pipeline.run(query) {
            Ok(outcome) => {
                print_context(&outcome.context);
                println!("\nAnswer: {}\n", outcome.answer);
            }
            Err(e) => {
                eprintln!("Error processing query: {:#}", e);
                println!("\nAnswer: {}\n", wikirag_rag::fallback_message(&e));
            }
        }
    } else {
        println!("\nAnswer: {}\n", pipeline.answer_query(query));
    }
}

fn search(settings: &Settings, query: &str, top_k: Option<usize>, rerank: bool) -> Result<()> {
    let embedder = get_default_embedder(&settings.retrieval, &settings.models)?;
    let artifacts = load_artifacts(settings, embedder.as_ref())?;
    let retriever = Retriever::new(embedder, settings.retrieval.top_k);
    let mut ranked = retriever.retrieve_k(query, artifacts.index.as_ref(), &artifacts.chunks, top_k.unwrap_or(settings.retrieval.top_k))?;
    if rerank {
        let reranker = Reranker::new(get_default_scorer(&settings.rerank, &settings.models)?);
        ranked = reranker.rerank(query, ranked)?;
    }
    if ranked.is_empty() { println!("No results."); }
    print_context(&ranked);
    if retriever.dropped_hits() > 0 { eprintln!("{} hits pointed past the chunk file and were dropped", retriever.dropped_hits()); }
    Ok(())
}

fn print_context(context: &[ScoredChunk]) {
    for c in context {
        let preview: String = c.text.chars().take(160).collect();
        println!("{:>2}. [{:.4}] {}", c.rank, c.score, preview);
    }
}

/// `None` once stdin is closed.
fn prompt(message: &str) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 { return Ok(None); }
    Ok(Some(line.trim().to_string()))
}
