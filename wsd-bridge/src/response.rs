//! Response Reader: re-segments raw classifier output into per-sentence,
//! per-token records under strict structural assumptions.
//!
//! The classifier echoes every request row with two columns appended: field
//! 5 becomes the pipe-delimited returned sense identifiers and field 6 the
//! pipe-delimited probabilities, `_` as placeholder. Sentence and token
//! counts must match the request exactly; any mismatch means the protocol
//! desynchronized and the whole call is aborted rather than producing
//! misaligned output.

use crate::annot::{PLACEHOLDER, SENT_SEP};
use crate::error::WsdError;

/// Sentence separator on the response side: the request separator row with
/// the extra appended column.
pub fn response_separator() -> String {
    format!("{PLACEHOLDER}\t{PLACEHOLDER}\t{PLACEHOLDER}\t{PLACEHOLDER}\t{SENT_SEP}\t{PLACEHOLDER}\t{PLACEHOLDER}")
}

/// One parsed classifier record for a single token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRecord {
    /// Returned sense identifiers, placeholders filtered out.
    pub senses: Vec<String>,
    /// Returned probabilities (still textual), aligned with `senses`.
    pub probs: Vec<String>,
}

/// Parse the full response text against the original sentence list.
///
/// Returns one record list per sentence, index-aligned with `sentences` and
/// with each sentence's token-index sequence.
pub fn parse_response(
    stdout: &str,
    sentences: &[Vec<usize>],
) -> Result<Vec<Vec<TokenRecord>>, WsdError> {
    let separator = response_separator();
    // Only exactly-empty segments are dropped; a duplicated separator row
    // leaves a whitespace segment behind and must fail the strict zip.
    let segments: Vec<&str> = stdout
        .trim()
        .split(separator.as_str())
        .filter(|s| !s.is_empty())
        .collect();

    if segments.len() != sentences.len() {
        return Err(WsdError::desync(
            sentences.len(),
            segments.len(),
            "sentences",
        ));
    }

    let mut result = Vec::with_capacity(segments.len());
    for (segment, sentence) in segments.iter().zip(sentences) {
        let lines: Vec<&str> = segment.lines().filter(|l| !l.is_empty()).collect();
        if lines.len() != sentence.len() {
            return Err(WsdError::desync(sentence.len(), lines.len(), "tokens"));
        }
        let records = lines
            .iter()
            .map(|line| parse_record(line))
            .collect::<Result<Vec<_>, _>>()?;
        result.push(records);
    }
    Ok(result)
}

fn parse_record(line: &str) -> Result<TokenRecord, WsdError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 7 {
        return Err(WsdError::MalformedRecord(fields.len(), line.to_string()));
    }
    let senses = split_set(fields[5]);
    let probs = split_set(fields[6]);
    if !probs.is_empty() && probs.len() != senses.len() {
        return Err(WsdError::desync(senses.len(), probs.len(), "probabilities"));
    }
    Ok(TokenRecord { senses, probs })
}

fn split_set(field: &str) -> Vec<String> {
    field
        .split('|')
        .filter(|v| !v.is_empty() && *v != PLACEHOLDER)
        .map(str::to_string)
        .collect()
}
