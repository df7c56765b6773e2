//! Annotation data model shared by the protocol components.
//!
//! Token annotations live in five parallel, index-aligned arrays (word form,
//! reference id, lemgram, candidate senses, part-of-speech). Sentences group
//! token indices; tokens outside every sentence form an "orphans"
//! pseudo-sentence. Multi-valued attribute strings use the cwbset
//! convention: values joined by `|` with a leading and trailing `|`.

use crate::error::WsdError;

/// Delimiter between values inside a set-valued attribute.
pub const DELIM: &str = "|";

/// Affix wrapped around set-valued attributes; an attribute that is exactly
/// this value carries no analysis.
pub const AFFIX: &str = "|";

/// Placeholder for "no value" in the classifier protocol.
pub const PLACEHOLDER: &str = "_";

/// Sentence sentinel token in the classifier protocol.
pub const SENT_SEP: &str = "$SENT$";

/// Separator between a sense identifier and its formatted probability.
pub const SCORESEP: &str = ":";

/// The five index-aligned token annotation arrays.
#[derive(Debug, Clone)]
pub struct TokenAnnotations {
    pub word: Vec<String>,
    pub reference: Vec<String>,
    pub lemgram: Vec<String>,
    pub sense: Vec<String>,
    pub pos: Vec<String>,
}

impl TokenAnnotations {
    /// Bundle the five arrays, verifying they are index-aligned.
    pub fn new(
        word: Vec<String>,
        reference: Vec<String>,
        lemgram: Vec<String>,
        sense: Vec<String>,
        pos: Vec<String>,
    ) -> Result<Self, WsdError> {
        let n = word.len();
        for (name, len) in [
            ("reference", reference.len()),
            ("lemgram", lemgram.len()),
            ("sense", sense.len()),
            ("pos", pos.len()),
        ] {
            if len != n {
                return Err(WsdError::AnnotationMismatch(format!(
                    "word has {n} entries but {name} has {len}"
                )));
            }
        }
        Ok(Self {
            word,
            reference,
            lemgram,
            sense,
            pos,
        })
    }

    /// Total token count.
    pub fn len(&self) -> usize {
        self.word.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }
}

/// Append the orphan tokens as a pseudo-sentence and drop empty sentences.
///
/// The result is what the protocol layer operates on: every remaining
/// sentence is non-empty, and together they cover every token that will
/// receive an output attribute.
pub fn effective_sentences(sentences: &[Vec<usize>], orphans: &[usize]) -> Vec<Vec<usize>> {
    sentences
        .iter()
        .cloned()
        .chain(std::iter::once(orphans.to_vec()))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Strip the affix sentinel from a set-valued attribute.
///
/// An attribute that is exactly the affix becomes the protocol placeholder.
pub fn strip_affix(value: &str) -> &str {
    if value == AFFIX {
        PLACEHOLDER
    } else {
        value.trim_matches(|c: char| AFFIX.contains(c))
    }
}

/// Decode a set-valued attribute into its values, discarding empty entries.
pub fn set_values(value: &str) -> Vec<String> {
    value
        .trim_matches(|c: char| AFFIX.contains(c))
        .split(DELIM)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// Serialize values using the cwbset convention: `|a|b|`, or `|` when empty.
pub fn cwbset(values: &[String]) -> String {
    if values.is_empty() {
        AFFIX.to_string()
    } else {
        format!("{AFFIX}{}{AFFIX}", values.join(DELIM))
    }
}
