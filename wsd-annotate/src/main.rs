//! Command-line host for the WSD bridge.
//!
//! Stands in for the surrounding annotation pipeline: reads token
//! annotations as tab-separated lines (`ref, word, lemgram, senses, pos`)
//! with blank lines separating sentences, runs the classifier, and prints
//! the disambiguated sense attribute per token.
//!
//! Usage:
//! ```text
//! wsd-annotate [config.toml] [input.tsv]
//! ```
//! With no input file the document is read from stdin. The log level is
//! controlled through `RUST_LOG`.

use std::io::Read;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use wsd_bridge::{annotate, TokenAnnotations, WorkerManager, WsdConfig};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("wsd_annotate=info,wsd_bridge=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => WsdConfig::from_file(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => WsdConfig::default(),
    };

    let input = match args.next() {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading input from {path}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading input from stdin")?;
            buf
        }
    };

    let (annotations, sentences) = parse_document(&input)?;
    info!(
        tokens = annotations.len(),
        sentences = sentences.len(),
        "Document loaded"
    );

    let mut workers = WorkerManager::new(&config);
    workers.preload().await?;
    let result = annotate(&config, &mut workers, &annotations, &sentences, &[]).await;
    workers.shutdown().await;
    let out = result?;

    for (idx, value) in out.iter().enumerate() {
        println!(
            "{}\t{}\t{value}",
            annotations.reference[idx], annotations.word[idx]
        );
    }
    Ok(())
}

/// Parse a blank-line-segmented TSV document into annotation arrays and
/// sentence groupings.
fn parse_document(input: &str) -> Result<(TokenAnnotations, Vec<Vec<usize>>)> {
    let mut reference = Vec::new();
    let mut word = Vec::new();
    let mut lemgram = Vec::new();
    let mut sense = Vec::new();
    let mut pos = Vec::new();
    let mut sentences: Vec<Vec<usize>> = vec![Vec::new()];

    for (lineno, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            if !sentences.last().is_some_and(Vec::is_empty) {
                sentences.push(Vec::new());
            }
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let [r, w, l, s, p] = fields.as_slice() else {
            bail!(
                "line {}: expected 5 tab-separated fields, got {}",
                lineno + 1,
                fields.len()
            );
        };
        let idx = word.len();
        reference.push((*r).to_string());
        word.push((*w).to_string());
        lemgram.push((*l).to_string());
        sense.push((*s).to_string());
        pos.push((*p).to_string());
        if let Some(current) = sentences.last_mut() {
            current.push(idx);
        }
    }

    let annotations = TokenAnnotations::new(word, reference, lemgram, sense, pos)?;
    Ok((annotations, sentences))
}
