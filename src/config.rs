use crate::error::{Result, VectorizeError};
use crate::params::Params;
use crate::tokenizer::TokenizerConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default size of the hashed feature space (2^20)
pub const DEFAULT_N_FEATURES: i64 = 1 << 20;

/// Largest hashed feature space a `u32` column index can address
pub const MAX_N_FEATURES: i64 = 1 << 32;

/// What the features are built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Analyzer {
    #[default]
    Word,
    Char,
    CharWb,
}

impl Analyzer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Analyzer::Word => "word",
            Analyzer::Char => "char",
            Analyzer::CharWb => "char_wb",
        }
    }
}

impl fmt::Display for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Analyzer {
    type Err = VectorizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "word" => Ok(Analyzer::Word),
            "char" => Ok(Analyzer::Char),
            "char_wb" => Ok(Analyzer::CharWb),
            other => Err(VectorizeError::Configuration(format!(
                "unknown analyzer {:?}",
                other
            ))),
        }
    }
}

/// Numeric type of the output matrix values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Dtype {
    #[default]
    Int32,
    Int64,
    Float32,
    Float64,
}

impl Dtype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dtype::Int32 => "int32",
            Dtype::Int64 => "int64",
            Dtype::Float32 => "float32",
            Dtype::Float64 => "float64",
        }
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dtype {
    type Err = VectorizeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "int32" | "i32" => Ok(Dtype::Int32),
            "int64" | "i64" => Ok(Dtype::Int64),
            "float32" | "f32" => Ok(Dtype::Float32),
            "float64" | "f64" => Ok(Dtype::Float64),
            other => Err(VectorizeError::Configuration(format!(
                "unknown dtype {:?}",
                other
            ))),
        }
    }
}

fn validate_n_jobs(n_jobs: i32) -> Result<()> {
    if n_jobs < 1 {
        return Err(VectorizeError::Configuration(format!(
            "n_jobs={} must be an integer >= 1",
            n_jobs
        )));
    }
    Ok(())
}

fn validate_analyzer(analyzer: Analyzer) -> Result<()> {
    if analyzer != Analyzer::Word {
        return Err(VectorizeError::Configuration(format!(
            "analyzer={:?} is not supported, only \"word\" is implemented",
            analyzer.as_str()
        )));
    }
    Ok(())
}

fn validate_preprocessing(
    stop_words: &Option<Vec<String>>,
    strip_accents: &Option<String>,
) -> Result<()> {
    if stop_words.is_some() {
        return Err(VectorizeError::UnsupportedFeature(
            "stop_words filtering is not implemented".to_string(),
        ));
    }
    if let Some(mode) = strip_accents {
        return Err(VectorizeError::UnsupportedFeature(format!(
            "strip_accents={:?} is not implemented",
            mode
        )));
    }
    Ok(())
}

/// Configuration of the hashing vectorizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashingConfig {
    /// Number of columns of the hashed feature space
    pub n_features: i64,

    /// Store 1 for every nonzero count
    pub binary: bool,

    /// Row normalization; always rejected
    pub norm: Option<String>,

    /// Flip the count sign using the hash sign bit
    pub alternate_sign: bool,

    pub analyzer: Analyzer,

    /// Worker threads per call
    pub n_jobs: i32,

    pub dtype: Dtype,

    /// Lowercase documents before tokenizing
    pub lowercase: bool,

    pub tokenizer: TokenizerConfig,

    /// Always rejected
    pub stop_words: Option<Vec<String>>,

    /// Always rejected
    pub strip_accents: Option<String>,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            n_features: DEFAULT_N_FEATURES,
            binary: false,
            norm: None,
            alternate_sign: false,
            analyzer: Analyzer::Word,
            n_jobs: 1,
            dtype: Dtype::Int32,
            lowercase: true,
            tokenizer: TokenizerConfig::default(),
            stop_words: None,
            strip_accents: None,
        }
    }
}

impl HashingConfig {
    /// Check every option; run before any document is touched
    pub fn validate(&self) -> Result<()> {
        validate_n_jobs(self.n_jobs)?;
        validate_analyzer(self.analyzer)?;
        if self.n_features <= 0 || self.n_features > MAX_N_FEATURES {
            return Err(VectorizeError::Configuration(format!(
                "n_features={} must be in 1..={}",
                self.n_features, MAX_N_FEATURES
            )));
        }
        if let Some(norm) = &self.norm {
            return Err(VectorizeError::UnsupportedFeature(format!(
                "norm={:?} is not supported, use norm=None",
                norm
            )));
        }
        validate_preprocessing(&self.stop_words, &self.strip_accents)
    }

    pub fn to_params(&self) -> Params {
        Params::new()
            .with("n_features", self.n_features)
            .with("binary", self.binary)
            .with("norm", self.norm.clone())
            .with("alternate_sign", self.alternate_sign)
            .with("analyzer", self.analyzer.as_str())
            .with("n_jobs", self.n_jobs)
            .with("dtype", self.dtype.as_str())
            .with("lowercase", self.lowercase)
            .with("stop_words", self.stop_words.clone())
            .with("strip_accents", self.strip_accents.clone())
            .with("tokenizer", self.tokenizer.kind())
    }
}

/// Configuration of the count (vocabulary) vectorizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountConfig {
    pub analyzer: Analyzer,

    /// Store 1 for every nonzero count
    pub binary: bool,

    /// Worker threads per call
    pub n_jobs: i32,

    pub dtype: Dtype,

    /// Lowercase documents before tokenizing
    pub lowercase: bool,

    pub tokenizer: TokenizerConfig,

    /// Always rejected
    pub stop_words: Option<Vec<String>>,

    /// Always rejected
    pub strip_accents: Option<String>,
}

impl Default for CountConfig {
    fn default() -> Self {
        Self {
            analyzer: Analyzer::Word,
            binary: false,
            n_jobs: 1,
            dtype: Dtype::Int64,
            lowercase: true,
            tokenizer: TokenizerConfig::default(),
            stop_words: None,
            strip_accents: None,
        }
    }
}

impl CountConfig {
    /// Check every option; run before any document is touched
    pub fn validate(&self) -> Result<()> {
        validate_n_jobs(self.n_jobs)?;
        validate_analyzer(self.analyzer)?;
        validate_preprocessing(&self.stop_words, &self.strip_accents)
    }

    pub fn to_params(&self) -> Params {
        Params::new()
            .with("analyzer", self.analyzer.as_str())
            .with("binary", self.binary)
            .with("n_jobs", self.n_jobs)
            .with("dtype", self.dtype.as_str())
            .with("lowercase", self.lowercase)
            .with("stop_words", self.stop_words.clone())
            .with("strip_accents", self.strip_accents.clone())
            .with("tokenizer", self.tokenizer.kind())
    }
}
