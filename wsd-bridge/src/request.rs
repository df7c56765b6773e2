//! Request Builder: turns per-sentence token annotations into the
//! tab-separated request format understood by saldowsd.
//!
//! Per token one six-field row is emitted:
//! `ref, word, _, lemgram, simple_lemgram, senses`. After each sentence a
//! sentinel row `_\t_\t_\t_\t$SENT$\t_` is appended. Multiword-expression
//! tokens (the sense field contains an internal `_` and is longer than one
//! character) have all underscore-bearing sub-entries stripped from the
//! lemgram, simple-lemgram and sense fields before emission.

use crate::annot::{strip_affix, TokenAnnotations, DELIM, PLACEHOLDER, SENT_SEP};
use crate::error::WsdError;

/// Build the full request text for the given sentences.
///
/// Sentences are expected to be non-empty (see
/// [`crate::annot::effective_sentences`]); token indices are checked against
/// the annotation arrays. The result carries no trailing newline.
pub fn build_request(
    sentences: &[Vec<usize>],
    annotations: &TokenAnnotations,
) -> Result<String, WsdError> {
    let mut rows = Vec::new();
    for sentence in sentences {
        for &idx in sentence {
            if idx >= annotations.len() {
                return Err(WsdError::AnnotationMismatch(format!(
                    "token index {idx} out of range for {} tokens",
                    annotations.len()
                )));
            }
            let word = &annotations.word[idx];
            let reference = &annotations.reference[idx];
            let pos = annotations.pos[idx].to_lowercase();

            let mut sense = strip_affix(&annotations.sense[idx]).to_string();
            let mwe = sense.contains('_') && sense.chars().count() > 1;

            let (mut lemgram, mut simple_lemgram) =
                make_lemgram(&annotations.lemgram[idx], word, &pos);

            if mwe {
                lemgram = remove_mwe(&lemgram);
                simple_lemgram = remove_mwe(&simple_lemgram);
                sense = remove_mwe(&sense);
            }

            rows.push(format!(
                "{reference}\t{word}\t{PLACEHOLDER}\t{lemgram}\t{simple_lemgram}\t{sense}"
            ));
        }
        // Sentence separator row.
        rows.push(format!(
            "{PLACEHOLDER}\t{PLACEHOLDER}\t{PLACEHOLDER}\t{PLACEHOLDER}\t{SENT_SEP}\t{PLACEHOLDER}"
        ));
    }
    Ok(rows.join("\n"))
}

/// Derive the lemgram and simple-lemgram request fields.
///
/// The simple lemgram is the set of unique prefixes of each lemgram entry up
/// to its last `.` (first-occurrence order, empty prefixes dropped); when no
/// prefix survives it falls back to `word + ".." + pos`.
fn make_lemgram(lemgram: &str, word: &str, pos: &str) -> (String, String) {
    let lemgram = strip_affix(lemgram).to_string();

    let mut prefixes: Vec<&str> = Vec::new();
    for entry in lemgram.split(DELIM) {
        let prefix = match entry.rfind('.') {
            Some(i) => &entry[..i],
            // No period: drop the final character, which turns the bare
            // placeholder into an empty prefix.
            None => drop_last_char(entry),
        };
        if !prefix.is_empty() && !prefixes.contains(&prefix) {
            prefixes.push(prefix);
        }
    }

    let simple_lemgram = if prefixes.is_empty() {
        format!("{word}..{pos}")
    } else {
        prefixes.join(DELIM)
    };
    (lemgram, simple_lemgram)
}

/// For MWE tokens: drop sub-entries containing an underscore, preferring
/// inflection-table-free, disambiguation-free entries.
fn remove_mwe(field: &str) -> String {
    let kept: Vec<&str> = field.split(DELIM).filter(|e| !e.contains('_')).collect();
    if kept.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        kept.join(DELIM)
    }
}

fn drop_last_char(s: &str) -> &str {
    s.char_indices().last().map_or("", |(i, _)| &s[..i])
}
