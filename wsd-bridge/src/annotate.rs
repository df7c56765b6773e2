//! End-to-end annotation call: build the request, run the classifier,
//! parse the response and merge probabilities onto the candidate senses.
//!
//! A call either fully succeeds, yielding one attribute value per token in
//! scope, or fails without producing any output. Tokens outside every
//! non-empty sentence keep an empty attribute value.

use tracing::debug;

use crate::annot::{effective_sentences, TokenAnnotations};
use crate::config::WsdConfig;
use crate::error::WsdError;
use crate::merge::{merge_token, serialize_scored};
use crate::request::build_request;
use crate::response::parse_response;
use crate::workers::WorkerManager;

/// Disambiguate one document.
///
/// `sentences` groups token indices; `orphans` holds tokens outside any
/// sentence. Returns the new output annotation array, index-aligned with
/// the input arrays.
pub async fn annotate(
    config: &WsdConfig,
    workers: &mut WorkerManager,
    annotations: &TokenAnnotations,
    sentences: &[Vec<usize>],
    orphans: &[usize],
) -> Result<Vec<String>, WsdError> {
    let prob_format = config.parsed_prob_format()?;
    let sentences = effective_sentences(sentences, orphans);

    let mut out = vec![String::new(); annotations.len()];
    if sentences.is_empty() {
        return Ok(out);
    }

    let request = build_request(&sentences, annotations)?;
    let token_counts: Vec<usize> = sentences.iter().map(Vec::len).collect();
    debug!(
        sentences = sentences.len(),
        tokens = token_counts.iter().sum::<usize>(),
        "Sending classifier request"
    );

    let stdout = workers.call(&request, &token_counts).await?;
    let parsed = parse_response(&stdout, &sentences)?;

    for (records, sentence) in parsed.iter().zip(&sentences) {
        for (record, &idx) in records.iter().zip(sentence) {
            let scored = merge_token(&annotations.sense[idx], record, config.default_prob)?;
            out[idx] = serialize_scored(&scored, prob_format.as_ref());
        }
    }
    Ok(out)
}
