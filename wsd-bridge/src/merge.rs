//! Sense Merger: reconciles a token's original candidate senses with the
//! probabilities the classifier returned for it.
//!
//! Candidates the classifier scored get the parsed probability; unmatched
//! candidates get the configured default. The result is sorted by
//! probability descending with the sense identifier as an ascending
//! tie-break, then serialized as a cwbset attribute value.

use crate::annot::{cwbset, set_values};
use crate::error::WsdError;
use crate::response::TokenRecord;

/// A (sense identifier, probability) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSense {
    pub sense: String,
    pub prob: f64,
}

/// Merge one token's original candidate-sense attribute with its classifier
/// record, sorted and ready for serialization.
pub fn merge_token(
    original_sense: &str,
    record: &TokenRecord,
    default_prob: f64,
) -> Result<Vec<ScoredSense>, WsdError> {
    let candidates = set_values(original_sense);

    let mut scored = Vec::with_capacity(candidates.len());
    for sense in candidates {
        let prob = if record.probs.is_empty() {
            default_prob
        } else {
            match record.senses.iter().position(|s| *s == sense) {
                Some(i) => match record.probs.get(i) {
                    Some(value) => parse_prob(value, &sense)?,
                    // A record with fewer probabilities than senses means
                    // the protocol desynchronized, not a scoring gap.
                    None => {
                        return Err(WsdError::desync(
                            record.senses.len(),
                            record.probs.len(),
                            "probabilities",
                        ))
                    }
                },
                None => default_prob,
            }
        };
        scored.push(ScoredSense { sense, prob });
    }

    scored.sort_by(|a, b| {
        b.prob
            .total_cmp(&a.prob)
            .then_with(|| a.sense.cmp(&b.sense))
    });
    Ok(scored)
}

/// Serialize scored senses as a cwbset attribute value, appending the
/// formatted probability to each sense when a format is configured.
pub fn serialize_scored(scored: &[ScoredSense], format: Option<&ProbFormat>) -> String {
    let values: Vec<String> = scored
        .iter()
        .map(|s| match format {
            Some(fmt) => format!("{}{}", s.sense, fmt.format(s.prob)),
            None => s.sense.clone(),
        })
        .collect();
    cwbset(&values)
}

fn parse_prob(value: &str, sense: &str) -> Result<f64, WsdError> {
    value
        .parse::<f64>()
        .map_err(|source| WsdError::InvalidProbability {
            sense: sense.to_string(),
            value: value.to_string(),
            source,
        })
}

/// Parsed printf-style probability format of the shape `prefix%[.N]f suffix`.
///
/// Only the fixed-point conversion is supported, which covers the classical
/// `":%.3f"` setup. Precision defaults to 6 like printf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbFormat {
    prefix: String,
    precision: usize,
    suffix: String,
}

impl ProbFormat {
    /// Parse a format string; `None` when it is empty (no probability
    /// suffix is emitted at all).
    pub fn parse(fmt: &str) -> Result<Option<Self>, WsdError> {
        if fmt.is_empty() {
            return Ok(None);
        }
        let percent = fmt.find('%').ok_or_else(|| {
            WsdError::Config(format!("prob_format {fmt:?} has no % directive"))
        })?;
        let prefix = fmt[..percent].to_string();
        let rest = &fmt[percent + 1..];

        let (precision, rest) = if let Some(stripped) = rest.strip_prefix('.') {
            let digits = stripped
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(stripped.len());
            let precision = stripped[..digits].parse::<usize>().map_err(|_| {
                WsdError::Config(format!("prob_format {fmt:?} has an empty precision"))
            })?;
            (precision, &stripped[digits..])
        } else {
            (6, rest)
        };

        let suffix = rest.strip_prefix('f').ok_or_else(|| {
            WsdError::Config(format!(
                "prob_format {fmt:?}: only the %f conversion is supported"
            ))
        })?;
        if suffix.contains('%') {
            return Err(WsdError::Config(format!(
                "prob_format {fmt:?} has more than one % directive"
            )));
        }
        Ok(Some(Self {
            prefix,
            precision,
            suffix: suffix.to_string(),
        }))
    }

    /// Apply the format to one probability value.
    pub fn format(&self, prob: f64) -> String {
        format!("{}{:.*}{}", self.prefix, self.precision, prob, self.suffix)
    }
}
