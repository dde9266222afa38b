use crate::error::{Result, VectorizeError};
use crate::lang_tokenizer::LanguageAwareTokenizer;
use crate::params::Params;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

/// Default token pattern: runs of two or more word characters
pub const DEFAULT_TOKEN_PATTERN: &str = r"\b\w\w+\b";

/// Default sliding window for the character tokenizer
pub const DEFAULT_WINDOW_SIZE: usize = 4;

/// Splits text into an ordered sequence of token views
///
/// Every call is independent: the returned iterator borrows `text` and
/// holds no state shared with other calls, so a tokenizer can be used
/// from many worker threads at once.
pub trait Tokenizer: Send + Sync + fmt::Debug {
    fn tokenize<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a>;

    /// Constructor options of this tokenizer
    fn get_params(&self) -> Params;
}

/// Serializable description of a tokenizer
///
/// This is what vectorizer configurations and snapshots carry; the
/// compiled tokenizer is rebuilt from it with [`TokenizerConfig::build`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenizerConfig {
    Regexp { pattern: String },
    UnicodeWord { word_bounds: bool },
    Character { window_size: usize },
    LanguageAware { lang: String },
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        TokenizerConfig::Regexp {
            pattern: DEFAULT_TOKEN_PATTERN.to_string(),
        }
    }
}

impl TokenizerConfig {
    /// Compile the tokenizer, failing eagerly on invalid options
    pub fn build(&self) -> Result<Arc<dyn Tokenizer>> {
        let tokenizer: Arc<dyn Tokenizer> = match self {
            TokenizerConfig::Regexp { pattern } => Arc::new(RegexpTokenizer::new(pattern)?),
            TokenizerConfig::UnicodeWord { word_bounds } => {
                Arc::new(UnicodeWordTokenizer::new(*word_bounds))
            }
            TokenizerConfig::Character { window_size } => {
                Arc::new(CharacterTokenizer::new(*window_size)?)
            }
            TokenizerConfig::LanguageAware { lang } => Arc::new(LanguageAwareTokenizer::new(lang)?),
        };
        Ok(tokenizer)
    }

    /// Short name used in parameter listings and the CLI
    pub fn kind(&self) -> &'static str {
        match self {
            TokenizerConfig::Regexp { .. } => "regexp",
            TokenizerConfig::UnicodeWord { .. } => "unicode_word",
            TokenizerConfig::Character { .. } => "character",
            TokenizerConfig::LanguageAware { .. } => "language_aware",
        }
    }
}

/// Case folding applied to a document before it is tokenized
#[inline]
pub fn preprocess(document: &str, lowercase: bool) -> Cow<'_, str> {
    if lowercase && document.chars().any(|c| c.to_lowercase().ne(std::iter::once(c))) {
        Cow::Owned(document.to_lowercase())
    } else {
        Cow::Borrowed(document)
    }
}

// ============================================================================
// Regular expression tokenizer
// ============================================================================

/// Emits every match of a pattern; text between matches is discarded
#[derive(Debug, Clone)]
pub struct RegexpTokenizer {
    pattern: String,
    regexp: Regex,
}

impl RegexpTokenizer {
    pub fn new(pattern: &str) -> Result<Self> {
        let regexp = Regex::new(pattern)?;
        Ok(Self {
            pattern: pattern.to_string(),
            regexp,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

impl Tokenizer for RegexpTokenizer {
    fn tokenize<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        Box::new(self.regexp.find_iter(text).map(|m| m.as_str()))
    }

    fn get_params(&self) -> Params {
        Params::new().with("pattern", self.pattern.as_str())
    }
}

// ============================================================================
// Unicode word boundary tokenizer
// ============================================================================

/// Unicode Standard Annex #29 word segmentation
///
/// With `word_bounds` set, every non-whitespace segment is emitted, so
/// punctuation comes out as its own token. Without it only segments that
/// contain a letter or number are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnicodeWordTokenizer {
    word_bounds: bool,
}

impl UnicodeWordTokenizer {
    pub fn new(word_bounds: bool) -> Self {
        Self { word_bounds }
    }

    pub fn word_bounds(&self) -> bool {
        self.word_bounds
    }
}

impl Default for UnicodeWordTokenizer {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Tokenizer for UnicodeWordTokenizer {
    fn tokenize<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        if self.word_bounds {
            Box::new(
                text.split_word_bounds()
                    .filter(|segment| !segment.trim().is_empty()),
            )
        } else {
            Box::new(text.unicode_words())
        }
    }

    fn get_params(&self) -> Params {
        Params::new().with("word_bounds", self.word_bounds)
    }
}

// ============================================================================
// Character n-gram tokenizer
// ============================================================================

/// Sliding window of `window_size` characters with step 1
///
/// Inputs shorter than the window (but not empty) produce the whole input
/// as a single token; the empty string produces nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterTokenizer {
    window_size: usize,
}

impl CharacterTokenizer {
    pub fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(VectorizeError::Configuration(
                "window_size must be >= 1".to_string(),
            ));
        }
        Ok(Self { window_size })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }
}

impl Default for CharacterTokenizer {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl Tokenizer for CharacterTokenizer {
    fn tokenize<'a>(&'a self, text: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        Box::new(CharWindowIterator::new(text, self.window_size))
    }

    fn get_params(&self) -> Params {
        Params::new().with("window_size", self.window_size)
    }
}

/// Byte offset just past the character starting at `pos`
#[inline]
fn next_char_boundary(text: &str, pos: usize) -> usize {
    pos + text[pos..].chars().next().map_or(0, char::len_utf8)
}

/// Iterator over fixed-width character windows of a string
pub struct CharWindowIterator<'a> {
    text: &'a str,
    start: usize,
    end: usize,
    done: bool,
}

impl<'a> CharWindowIterator<'a> {
    pub fn new(text: &'a str, window_size: usize) -> Self {
        let mut end = 0;
        for _ in 0..window_size {
            if end >= text.len() {
                break;
            }
            end = next_char_boundary(text, end);
        }

        Self {
            text,
            start: 0,
            end,
            done: text.is_empty(),
        }
    }
}

impl<'a> Iterator for CharWindowIterator<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let token = &self.text[self.start..self.end];

        if self.end >= self.text.len() {
            self.done = true;
        } else {
            self.start = next_char_boundary(self.text, self.start);
            self.end = next_char_boundary(self.text, self.end);
        }

        Some(token)
    }
}
