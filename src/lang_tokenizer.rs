//! Word tokenizer with language specific rules
//!
//! Starts from Unicode (UAX #29) word boundaries and then applies a small
//! set of rules on top:
//!
//! - runs of one repeated ASCII punctuation character stay together (`...`)
//! - `x-y`, `x@y` and `x&y` are joined when both neighbours are alphanumeric
//! - `1/2` and `8:30` are joined when both neighbours are numeric
//! - English contractions are split (`can't` -> `ca`, `n't`)
//! - French elisions are split (`l'image` -> `l'`, `image`)
//! - whitespace is dropped

use crate::error::{Result, VectorizeError};
use crate::params::Params;
use crate::tokenizer::Tokenizer;
use unicode_segmentation::UnicodeSegmentation;

/// Language codes accepted by [`LanguageAwareTokenizer::new`]
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "fr", "any"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    French,
    Any,
}

impl Language {
    pub fn from_code(code: &str) -> Result<Self> {
        match code {
            "en" => Ok(Language::English),
            "fr" => Ok(Language::French),
            "any" => Ok(Language::Any),
            other => Err(VectorizeError::Configuration(format!(
                "unsupported language code {:?}, expected one of {:?}",
                other, SUPPORTED_LANGUAGES
            ))),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::French => "fr",
            Language::Any => "any",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageAwareTokenizer {
    lang: Language,
}

impl LanguageAwareTokenizer {
    pub fn new(lang: &str) -> Result<Self> {
        Ok(Self {
            lang: Language::from_code(lang)?,
        })
    }

    pub fn lang(&self) -> Language {
        self.lang
    }

    /// Token spans as `(start, end)` byte offsets, whitespace included
    fn spans(&self, text: &str) -> Vec<(usize, usize)> {
        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut punct_start: Option<usize> = None;
        let mut punct_last: Option<char> = None;

        for (start, segment) in text.split_word_bound_indices() {
            let end = start + segment.len();

            if let Some(ch) = single_ascii_punctuation(segment) {
                if punct_last != Some(ch) {
                    if let Some(run_start) = punct_start {
                        spans.push((run_start, start));
                    }
                    punct_start = Some(start);
                }
                punct_last = Some(ch);
                continue;
            }

            if let Some(run_start) = punct_start.take() {
                spans.push((run_start, start));
                punct_last = None;
            }

            let split = match self.lang {
                Language::English => english_contraction_split(segment),
                Language::French => french_elision_split(segment),
                Language::Any => None,
            };
            if let Some(split) = split {
                spans.push((start, start + split));
                spans.push((start + split, end));
                continue;
            }

            spans.push((start, end));
            join_last_three(text, &mut spans);
        }

        if let Some(run_start) = punct_start {
            spans.push((run_start, text.len()));
        }

        spans
    }
}

impl Default for LanguageAwareTokenizer {
    fn default() -> Self {
        Self {
            lang: Language::English,
        }
    }
}

impl Tokenizer for LanguageAwareTokenizer {
    fn tokenize<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        Box::new(
            self.spans(text)
                .into_iter()
                .map(move |(start, end)| &text[start..end])
                .filter(|token| !is_whitespace(token)),
        )
    }

    fn get_params(&self) -> Params {
        Params::new().with("lang", self.lang.code())
    }
}

#[inline]
fn is_whitespace(token: &str) -> bool {
    token.trim().is_empty()
}

#[inline]
fn single_ascii_punctuation(segment: &str) -> Option<char> {
    match segment.as_bytes() {
        [b] if b.is_ascii_punctuation() => Some(*b as char),
        _ => None,
    }
}

/// Byte offset to split an English contraction at
fn english_contraction_split(segment: &str) -> Option<usize> {
    for (apostrophe, negation) in [("'", "n't"), ("\u{2019}", "n\u{2019}t")] {
        if let Some(idx) = segment.find(apostrophe) {
            let split = if segment.ends_with(negation) {
                segment.len() - negation.len()
            } else {
                idx
            };
            return (split > 0 && split < segment.len()).then_some(split);
        }
    }
    None
}

/// Byte offset to split a French elision at (`l'`, `d'`, `qu'` is left alone)
fn french_elision_split(segment: &str) -> Option<usize> {
    let first_len = segment.chars().next()?.len_utf8();
    for apostrophe in ["'", "\u{2019}"] {
        if segment[first_len..].starts_with(apostrophe) {
            let split = first_len + apostrophe.len();
            return (split < segment.len()).then_some(split);
        }
    }
    None
}

/// Join the last three spans when they form `x-y`, `x@y`, `x&y`, `1/2` or `8:30`
fn join_last_three(text: &str, spans: &mut Vec<(usize, usize)>) {
    let n = spans.len();
    if n < 3 {
        return;
    }
    let (first, middle, last) = (spans[n - 3], spans[n - 2], spans[n - 1]);
    let left = &text[first.0..first.1];
    let joiner = &text[middle.0..middle.1];
    let right = &text[last.0..last.1];

    if is_whitespace(left) || is_whitespace(right) {
        return;
    }
    let (Some(left_char), Some(right_char)) = (left.chars().last(), right.chars().next()) else {
        return;
    };

    let word_join = matches!(joiner, "-" | "@" | "&")
        && left_char.is_alphanumeric()
        && right_char.is_alphanumeric();
    let number_join =
        matches!(joiner, "/" | ":") && left_char.is_numeric() && right_char.is_numeric();

    if word_join || number_join {
        spans.truncate(n - 3);
        spans.push((first.0, last.1));
    }
}
