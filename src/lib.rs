//! Parallel text vectorization into sparse count matrices
//!
//! Two vectorizers turn a collection of documents into a CSR matrix of
//! token counts. [`HashingVectorizer`] maps tokens to columns with a
//! MurmurHash3 hash and needs no fitting; [`CountVectorizer`] learns a
//! vocabulary in order of first occurrence. Both split the input into
//! contiguous shards processed on a per-call thread pool, and produce
//! the same matrix for every `n_jobs`.
//!
//! # Example
//!
//! ```no_run
//! use textvec::{CountConfig, CountVectorizer, Vectorizer};
//! use std::path::Path;
//!
//! let docs = ["the moon in the sky", "the sky is blue"];
//!
//! let mut vectorizer = CountVectorizer::new(CountConfig {
//!     n_jobs: 4,
//!     ..Default::default()
//! })
//! .unwrap();
//! let matrix = vectorizer.fit_transform(&docs).unwrap();
//! assert_eq!(matrix.shape, (2, 6));
//!
//! // Persist the fitted vocabulary
//! let snapshot = vectorizer.snapshot();
//! textvec::save_snapshot(&snapshot, Path::new("model.tvec")).unwrap();
//! ```

mod config;
mod corpus;
mod count;
mod csr;
mod error;
mod estimator;
mod executor;
mod hashing;
mod lang_tokenizer;
mod murmur;
mod params;
mod persistence;
mod tokenizer;
mod vocabulary;

// Re-export public API
pub use config::{Analyzer, CountConfig, Dtype, HashingConfig, DEFAULT_N_FEATURES, MAX_N_FEATURES};
pub use corpus::{read_directory, read_lines, read_lines_from, CorpusConfig, CorpusFile};
pub use count::CountVectorizer;
pub use csr::{CsrMatrix, MatrixValues};
pub use error::{Result, VectorizeError};
pub use estimator::{DocumentInput, Estimator, Vectorizer};
pub use executor::ParallelExecutor;
pub use hashing::HashingVectorizer;
pub use lang_tokenizer::{Language, LanguageAwareTokenizer, SUPPORTED_LANGUAGES};
pub use murmur::{bucket, hash_token, murmur3_32, sign, HASH_SEED};
pub use params::{ParamValue, Params};
pub use persistence::{
    decode_snapshot, encode_snapshot, load_snapshot, load_snapshot_mmap, save_snapshot,
    snapshot_exists, Snapshot, SnapshotState, FORMAT_VERSION, MAGIC,
};
pub use tokenizer::{
    preprocess, CharWindowIterator, CharacterTokenizer, RegexpTokenizer, Tokenizer,
    TokenizerConfig, UnicodeWordTokenizer, DEFAULT_TOKEN_PATTERN, DEFAULT_WINDOW_SIZE,
};
pub use vocabulary::Vocabulary;
