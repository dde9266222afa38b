//! Estimator interface shared by both vectorizers

use crate::config::{CountConfig, HashingConfig};
use crate::count::CountVectorizer;
use crate::csr::CsrMatrix;
use crate::error::{Result, VectorizeError};
use crate::hashing::HashingVectorizer;
use crate::params::Params;
use crate::persistence::{
    decode_snapshot, encode_snapshot, load_snapshot, save_snapshot, Snapshot, SnapshotState,
};
use std::path::Path;

/// `fit` / `transform` contract of a text vectorizer
///
/// Every method validates the configuration before any document is
/// tokenized, so a bad option never produces partial output.
pub trait Vectorizer {
    /// Learn whatever state the vectorizer needs from `documents`
    fn fit<D: AsRef<str> + Sync>(&mut self, documents: &[D]) -> Result<&mut Self>;

    /// Encode `documents` as a `documents.len() x n_features` matrix
    fn transform<D: AsRef<str> + Sync>(&self, documents: &[D]) -> Result<CsrMatrix>;

    /// Same output as `fit` followed by `transform`
    fn fit_transform<D: AsRef<str> + Sync>(&mut self, documents: &[D]) -> Result<CsrMatrix>;

    /// Flat mapping of constructor options
    fn get_params(&self) -> Params;

    fn is_fitted(&self) -> bool;

    /// Configuration plus learned state, ready to be persisted
    fn snapshot(&self) -> Snapshot;

    fn fit_input(&mut self, input: DocumentInput<'_>) -> Result<&mut Self> {
        let documents = input.into_collection()?;
        self.fit(&documents)
    }

    fn transform_input(&self, input: DocumentInput<'_>) -> Result<CsrMatrix> {
        let documents = input.into_collection()?;
        self.transform(&documents)
    }

    fn fit_transform_input(&mut self, input: DocumentInput<'_>) -> Result<CsrMatrix> {
        let documents = input.into_collection()?;
        self.fit_transform(&documents)
    }
}

/// Loosely typed input as received from a binding layer
///
/// A single string where a collection is expected is a usage error, not a
/// one-document corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentInput<'a> {
    Text(&'a str),
    Collection(Vec<&'a str>),
}

impl<'a> DocumentInput<'a> {
    pub fn into_collection(self) -> Result<Vec<&'a str>> {
        match self {
            DocumentInput::Text(_) => Err(VectorizeError::InputType(
                "iterable over raw text documents expected, string object received".to_string(),
            )),
            DocumentInput::Collection(documents) => Ok(documents),
        }
    }
}

impl<'a> From<&'a str> for DocumentInput<'a> {
    fn from(text: &'a str) -> Self {
        DocumentInput::Text(text)
    }
}

impl<'a> From<&'a String> for DocumentInput<'a> {
    fn from(text: &'a String) -> Self {
        DocumentInput::Text(text.as_str())
    }
}

impl<'a, S: AsRef<str>> From<&'a [S]> for DocumentInput<'a> {
    fn from(documents: &'a [S]) -> Self {
        DocumentInput::Collection(documents.iter().map(AsRef::as_ref).collect())
    }
}

impl<'a, S: AsRef<str>> From<&'a Vec<S>> for DocumentInput<'a> {
    fn from(documents: &'a Vec<S>) -> Self {
        Self::from(documents.as_slice())
    }
}

/// Either vectorizer behind one interface
///
/// The hashing variant is stateless and always fitted; the count variant
/// moves from unfitted to fitted on its first `fit`.
#[derive(Debug, Clone)]
pub enum Estimator {
    Hashing(HashingVectorizer),
    Count(CountVectorizer),
}

impl Estimator {
    pub fn hashing(config: HashingConfig) -> Result<Self> {
        Ok(Estimator::Hashing(HashingVectorizer::new(config)?))
    }

    pub fn count(config: CountConfig) -> Result<Self> {
        Ok(Estimator::Count(CountVectorizer::new(config)?))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Estimator::Hashing(_) => "hashing",
            Estimator::Count(_) => "count",
        }
    }

    /// Output width, `None` for an unfitted count vectorizer
    pub fn n_features(&self) -> Option<usize> {
        match self {
            Estimator::Hashing(v) => Some(v.n_features()),
            Estimator::Count(v) => v.vocabulary().map(|vocabulary| vocabulary.len()),
        }
    }

    /// Rebuild an estimator, tokenizer included, from a snapshot
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        match snapshot.state {
            SnapshotState::Hashing { config } => Self::hashing(config),
            SnapshotState::Count { config, vocabulary } => Ok(Estimator::Count(
                CountVectorizer::from_parts(config, vocabulary)?,
            )),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode_snapshot(&self.snapshot())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_snapshot(decode_snapshot(bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_snapshot(&self.snapshot(), path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_snapshot(load_snapshot(path)?)
    }
}

impl Vectorizer for Estimator {
    fn fit<D: AsRef<str> + Sync>(&mut self, documents: &[D]) -> Result<&mut Self> {
        match self {
            Estimator::Hashing(v) => {
                v.fit(documents)?;
            }
            Estimator::Count(v) => {
                v.fit(documents)?;
            }
        }
        Ok(self)
    }

    fn transform<D: AsRef<str> + Sync>(&self, documents: &[D]) -> Result<CsrMatrix> {
        match self {
            Estimator::Hashing(v) => v.transform(documents),
            Estimator::Count(v) => v.transform(documents),
        }
    }

    fn fit_transform<D: AsRef<str> + Sync>(&mut self, documents: &[D]) -> Result<CsrMatrix> {
        match self {
            Estimator::Hashing(v) => v.fit_transform(documents),
            Estimator::Count(v) => v.fit_transform(documents),
        }
    }

    fn get_params(&self) -> Params {
        match self {
            Estimator::Hashing(v) => v.get_params(),
            Estimator::Count(v) => v.get_params(),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            Estimator::Hashing(v) => v.is_fitted(),
            Estimator::Count(v) => v.is_fitted(),
        }
    }

    fn snapshot(&self) -> Snapshot {
        match self {
            Estimator::Hashing(v) => v.snapshot(),
            Estimator::Count(v) => v.snapshot(),
        }
    }
}
