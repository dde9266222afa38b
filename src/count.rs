use crate::config::CountConfig;
use crate::csr::{self, CsrMatrix, RowSegment};
use crate::error::{Result, VectorizeError};
use crate::estimator::Vectorizer;
use crate::executor::ParallelExecutor;
use crate::params::Params;
use crate::persistence::Snapshot;
use crate::tokenizer::{preprocess, Tokenizer};
use crate::vocabulary::{merge_shards, ShardVocabulary, Vocabulary};
use std::sync::Arc;

/// Vectorizer that learns a vocabulary and counts token occurrences
///
/// `fit` runs in two phases. Workers first build shard-local vocabularies
/// and counts over contiguous document ranges, then the shards are merged
/// in document order on the calling thread. Column `i` is the `i`-th
/// distinct token in order of first occurrence, whatever `n_jobs` is.
#[derive(Debug, Clone)]
pub struct CountVectorizer {
    config: CountConfig,
    tokenizer: Arc<dyn Tokenizer>,
    vocabulary: Option<Vocabulary>,
}

impl CountVectorizer {
    pub fn new(config: CountConfig) -> Result<Self> {
        Self::from_parts(config, None)
    }

    /// Vectorizer with a fixed, already known vocabulary
    pub fn with_vocabulary(config: CountConfig, vocabulary: Vocabulary) -> Result<Self> {
        Self::from_parts(config, Some(vocabulary))
    }

    pub(crate) fn from_parts(config: CountConfig, vocabulary: Option<Vocabulary>) -> Result<Self> {
        let tokenizer = config.tokenizer.build()?;
        Ok(Self {
            config,
            tokenizer,
            vocabulary,
        })
    }

    pub fn config(&self) -> &CountConfig {
        &self.config
    }

    /// Learned vocabulary, `None` until fitted
    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.vocabulary.as_ref()
    }

    fn fitted_vocabulary(&self) -> Result<&Vocabulary> {
        self.vocabulary.as_ref().ok_or_else(|| {
            VectorizeError::UnfittedModel(
                "CountVectorizer must be fitted before calling transform".to_string(),
            )
        })
    }

    fn build_shards<D: AsRef<str> + Sync>(
        &self,
        documents: &[D],
        executor: &ParallelExecutor,
    ) -> Vec<ShardVocabulary> {
        let tokenizer = &*self.tokenizer;
        let lowercase = self.config.lowercase;
        let binary = self.config.binary;

        executor.map_shards(documents, |shard| {
            ShardVocabulary::build(shard, tokenizer, lowercase, binary)
        })
    }
}

/// Count tokens of `documents` against a fixed vocabulary
///
/// Tokens outside the vocabulary are dropped.
fn count_shard<D: AsRef<str>>(
    documents: &[D],
    tokenizer: &dyn Tokenizer,
    vocabulary: &Vocabulary,
    lowercase: bool,
    binary: bool,
) -> RowSegment {
    let mut segment = RowSegment::with_capacity(documents.len());
    let mut entries: Vec<(u32, i32)> = Vec::new();

    for document in documents {
        let text = preprocess(document.as_ref(), lowercase);
        entries.clear();
        entries.extend(
            tokenizer
                .tokenize(&text)
                .filter_map(|token| vocabulary.get(token))
                .map(|column| (column, 1)),
        );
        segment.push_row(&mut entries, binary);
    }
    segment
}

impl Vectorizer for CountVectorizer {
    fn fit<D: AsRef<str> + Sync>(&mut self, documents: &[D]) -> Result<&mut Self> {
        self.config.validate()?;
        let executor = ParallelExecutor::for_batch(self.config.n_jobs, documents.len())?;

        let shards = self.build_shards(documents, &executor);
        let (vocabulary, _) = merge_shards(&shards);

        log::debug!(
            "fitted vocabulary of {} terms on {} documents",
            vocabulary.len(),
            documents.len()
        );
        self.vocabulary = Some(vocabulary);
        Ok(self)
    }

    fn transform<D: AsRef<str> + Sync>(&self, documents: &[D]) -> Result<CsrMatrix> {
        self.config.validate()?;
        let vocabulary = self.fitted_vocabulary()?;
        let executor = ParallelExecutor::for_batch(self.config.n_jobs, documents.len())?;

        let tokenizer = &*self.tokenizer;
        let lowercase = self.config.lowercase;
        let binary = self.config.binary;
        let segments = executor.map_shards(documents, |shard| {
            count_shard(shard, tokenizer, vocabulary, lowercase, binary)
        });

        Ok(csr::assemble(
            &segments,
            vocabulary.len(),
            self.config.dtype,
            &executor,
        ))
    }

    /// Fit and encode in one pass over the documents
    ///
    /// The shard counts gathered while fitting are re-indexed to global
    /// columns instead of tokenizing everything a second time.
    fn fit_transform<D: AsRef<str> + Sync>(&mut self, documents: &[D]) -> Result<CsrMatrix> {
        self.config.validate()?;
        let executor = ParallelExecutor::for_batch(self.config.n_jobs, documents.len())?;

        let shards = self.build_shards(documents, &executor);
        let (vocabulary, remaps) = merge_shards(&shards);

        let work: Vec<(ShardVocabulary, Vec<u32>)> = shards.into_iter().zip(remaps).collect();
        let segments = executor.map_each(work, |(shard, remap)| {
            let mut segment = shard.into_segment();
            segment.remap_columns(&remap);
            segment
        });

        let matrix = csr::assemble(&segments, vocabulary.len(), self.config.dtype, &executor);
        log::debug!(
            "fitted vocabulary of {} terms, {} stored values",
            vocabulary.len(),
            matrix.nnz()
        );
        self.vocabulary = Some(vocabulary);
        Ok(matrix)
    }

    fn get_params(&self) -> Params {
        self.config
            .to_params()
            .with_nested("tokenizer", self.tokenizer.get_params())
    }

    fn is_fitted(&self) -> bool {
        self.vocabulary.is_some()
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::count(self.config.clone(), self.vocabulary.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dtype;
    use crate::csr::MatrixValues;
    use crate::tokenizer::TokenizerConfig;

    fn vectorizer() -> CountVectorizer {
        CountVectorizer::new(CountConfig::default()).unwrap()
    }

    #[test]
    fn test_simple_counts() {
        let mut v = vectorizer();
        let m = v.fit_transform(&["cat dog cat"]).unwrap();
        assert_eq!(m.to_dense(), vec![vec![2.0, 1.0]]);
        assert_eq!(m.data, MatrixValues::Int64(vec![2, 1]));
    }

    #[test]
    fn test_first_occurrence_columns() {
        let docs = ["some sentence", "a different sentence"];
        let mut v = vectorizer();
        let m = v.fit_transform(&docs).unwrap();

        let vocabulary = v.vocabulary().unwrap();
        assert_eq!(vocabulary.get("some"), Some(0));
        assert_eq!(vocabulary.get("sentence"), Some(1));
        assert_eq!(vocabulary.get("different"), Some(2));
        assert_eq!(m.shape, (2, 3));
        assert_eq!(m.indptr, vec![0, 2, 4]);
        assert_eq!(m.indices, vec![0, 1, 1, 2]);
        assert_eq!(m.nnz(), 4);
    }

    #[test]
    fn test_fit_then_transform_matches_fit_transform() {
        let docs = ["the moon in the sky", "The sky sky sky is blue", ""];
        let mut a = vectorizer();
        let fitted = a.fit_transform(&docs).unwrap();

        let mut b = vectorizer();
        b.fit(&docs).unwrap();
        assert_eq!(b.transform(&docs).unwrap(), fitted);
        assert_eq!(a.vocabulary(), b.vocabulary());
        assert_eq!(
            fitted.to_dense(),
            vec![
                vec![2.0, 1.0, 1.0, 1.0, 0.0, 0.0],
                vec![1.0, 0.0, 0.0, 3.0, 1.0, 1.0],
                vec![0.0; 6],
            ]
        );
    }

    #[test]
    fn test_unknown_tokens_are_dropped() {
        let mut v = vectorizer();
        v.fit(&["alpha beta"]).unwrap();
        let m = v.transform(&["beta gamma beta", "delta"]).unwrap();
        assert_eq!(m.shape, (2, 2));
        assert_eq!(m.indptr, vec![0, 1, 1]);
        assert_eq!(m.indices, vec![1]);
        assert_eq!(m.data, MatrixValues::Int64(vec![2]));
    }

    #[test]
    fn test_transform_requires_fit() {
        let v = vectorizer();
        assert!(!v.is_fitted());
        assert!(matches!(
            v.transform(&["anything"]),
            Err(VectorizeError::UnfittedModel(_))
        ));
    }

    #[test]
    fn test_invalid_config_wins_over_unfitted() {
        let config = CountConfig {
            n_jobs: 0,
            ..Default::default()
        };
        let v = CountVectorizer::new(config).unwrap();
        assert!(matches!(
            v.transform(&["anything"]),
            Err(VectorizeError::Configuration(_))
        ));
    }

    #[test]
    fn test_parallel_results_are_identical() {
        let corpus: Vec<String> = (0..91)
            .map(|i| format!("token{} shared common token{}", i % 13, i % 5))
            .collect();
        let mut reference = vectorizer();
        let expected = reference.fit_transform(&corpus).unwrap();

        for n_jobs in [2, 4, 7] {
            let config = CountConfig {
                n_jobs,
                ..Default::default()
            };
            let mut v = CountVectorizer::new(config).unwrap();
            assert_eq!(v.fit_transform(&corpus).unwrap(), expected, "n_jobs={}", n_jobs);
            assert_eq!(v.vocabulary(), reference.vocabulary());
            assert_eq!(v.transform(&corpus).unwrap(), expected);
        }
    }

    #[test]
    fn test_binary_float_output() {
        let config = CountConfig {
            binary: true,
            dtype: Dtype::Float32,
            ..Default::default()
        };
        let mut v = CountVectorizer::new(config).unwrap();
        let m = v.fit_transform(&["cat dog cat"]).unwrap();
        assert_eq!(m.data, MatrixValues::Float32(vec![1.0, 1.0]));
    }

    #[test]
    fn test_empty_corpus() {
        let empty: Vec<&str> = Vec::new();
        let mut v = vectorizer();
        let m = v.fit_transform(&empty).unwrap();
        assert_eq!(m.indptr, vec![0]);
        assert_eq!(m.shape, (0, 0));
        assert!(v.is_fitted());
        assert!(v.vocabulary().unwrap().is_empty());
    }

    #[test]
    fn test_refit_replaces_vocabulary() {
        let mut v = vectorizer();
        v.fit(&["one two"]).unwrap();
        v.fit(&["three"]).unwrap();
        let vocabulary = v.vocabulary().unwrap();
        assert_eq!(vocabulary.len(), 1);
        assert_eq!(vocabulary.get("three"), Some(0));
    }

    #[test]
    fn test_lowercase_off() {
        let config = CountConfig {
            lowercase: false,
            ..Default::default()
        };
        let mut v = CountVectorizer::new(config).unwrap();
        v.fit(&["Sky sky"]).unwrap();
        assert_eq!(v.vocabulary().unwrap().len(), 2);
    }

    #[test]
    fn test_with_vocabulary() {
        let vocabulary =
            Vocabulary::from_terms(vec!["blue".to_string(), "sky".to_string()]).unwrap();
        let v = CountVectorizer::with_vocabulary(CountConfig::default(), vocabulary).unwrap();
        assert!(v.is_fitted());
        let m = v.transform(&["the sky is blue blue"]).unwrap();
        assert_eq!(m.to_dense(), vec![vec![2.0, 1.0]]);
    }

    #[test]
    fn test_with_deserialized_vocabulary() {
        let vocabulary =
            Vocabulary::from_terms(vec!["sky".to_string(), "blue".to_string()]).unwrap();
        let config = bincode::config::standard();
        let bytes = bincode::serde::encode_to_vec(&vocabulary, config).unwrap();
        let (restored, _): (Vocabulary, _) =
            bincode::serde::decode_from_slice(&bytes, config).unwrap();

        let v = CountVectorizer::with_vocabulary(CountConfig::default(), restored).unwrap();
        let m = v.transform(&["the sky is blue"]).unwrap();
        assert_eq!(m.shape, (1, 2));
        assert_eq!(m.indptr, vec![0, 2]);
        assert_eq!(m.to_dense(), vec![vec![1.0, 1.0]]);
    }

    #[test]
    fn test_character_tokenizer() {
        let config = CountConfig {
            tokenizer: TokenizerConfig::Character { window_size: 4 },
            ..Default::default()
        };
        let mut v = CountVectorizer::new(config).unwrap();
        let m = v.fit_transform(&["abcab", "ab"]).unwrap();
        // abca, bcab, then the short document as a whole
        assert_eq!(v.vocabulary().unwrap().len(), 3);
        assert_eq!(m.indptr, vec![0, 2, 3]);
    }
}
