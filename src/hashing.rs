use crate::config::HashingConfig;
use crate::csr::{self, CsrMatrix, RowSegment};
use crate::error::Result;
use crate::estimator::Vectorizer;
use crate::executor::ParallelExecutor;
use crate::murmur::{bucket, hash_token, sign};
use crate::params::Params;
use crate::persistence::Snapshot;
use crate::tokenizer::{preprocess, Tokenizer};
use std::sync::Arc;

/// Stateless vectorizer mapping tokens to columns through a hash
///
/// Nothing is learned, so `fit` only validates and `transform` can run
/// on any input straight away.
#[derive(Debug, Clone)]
pub struct HashingVectorizer {
    config: HashingConfig,
    tokenizer: Arc<dyn Tokenizer>,
}

impl HashingVectorizer {
    pub fn new(config: HashingConfig) -> Result<Self> {
        let tokenizer = config.tokenizer.build()?;
        Ok(Self { config, tokenizer })
    }

    pub fn config(&self) -> &HashingConfig {
        &self.config
    }

    pub fn n_features(&self) -> usize {
        self.config.n_features as usize
    }

    fn hash_shard<D: AsRef<str>>(&self, documents: &[D]) -> Result<RowSegment> {
        let n_features = self.config.n_features as u64;
        let mut segment = RowSegment::with_capacity(documents.len());
        let mut entries: Vec<(u32, i32)> = Vec::new();

        for document in documents {
            let text = preprocess(document.as_ref(), self.config.lowercase);
            entries.clear();
            for token in self.tokenizer.tokenize(&text) {
                let hash = hash_token(token)?;
                let value = if self.config.alternate_sign {
                    sign(hash)
                } else {
                    1
                };
                entries.push((bucket(hash, n_features), value));
            }
            segment.push_row(&mut entries, self.config.binary);
        }
        Ok(segment)
    }
}

impl Vectorizer for HashingVectorizer {
    fn fit<D: AsRef<str> + Sync>(&mut self, _documents: &[D]) -> Result<&mut Self> {
        self.config.validate()?;
        Ok(self)
    }

    fn transform<D: AsRef<str> + Sync>(&self, documents: &[D]) -> Result<CsrMatrix> {
        self.config.validate()?;
        let executor = ParallelExecutor::for_batch(self.config.n_jobs, documents.len())?;

        let segments = executor
            .map_shards(documents, |shard| self.hash_shard(shard))
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        let matrix = csr::assemble(&segments, self.n_features(), self.config.dtype, &executor);

        log::debug!(
            "hashed {} documents into {} stored values",
            matrix.n_rows(),
            matrix.nnz()
        );
        Ok(matrix)
    }

    fn fit_transform<D: AsRef<str> + Sync>(&mut self, documents: &[D]) -> Result<CsrMatrix> {
        self.fit(documents)?;
        self.transform(documents)
    }

    fn get_params(&self) -> Params {
        self.config
            .to_params()
            .with_nested("tokenizer", self.tokenizer.get_params())
    }

    fn is_fitted(&self) -> bool {
        true
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::hashing(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dtype;
    use crate::csr::MatrixValues;
    use crate::error::VectorizeError;
    use crate::params::ParamValue;
    use crate::tokenizer::TokenizerConfig;

    fn docs() -> Vec<&'static str> {
        vec!["the moon in the sky", "The sky is blue"]
    }

    #[test]
    fn test_matches_sklearn_reference() {
        // HashingVectorizer(norm=None, alternate_sign=False) in scikit-learn
        let vectorizer = HashingVectorizer::new(HashingConfig::default()).unwrap();
        let m = vectorizer.transform(&docs()).unwrap();

        assert_eq!(m.shape, (2, 1 << 20));
        assert_eq!(m.indptr, vec![0, 4, 8]);
        assert_eq!(
            m.indices,
            vec![268391, 286878, 720286, 828689, 144749, 268391, 286878, 790269]
        );
        assert_eq!(m.data, MatrixValues::Int32(vec![1, 2, 1, 1, 1, 1, 1, 1]));
        m.check().unwrap();
    }

    #[test]
    fn test_fit_transform_equals_transform() {
        let mut vectorizer = HashingVectorizer::new(HashingConfig::default()).unwrap();
        let a = vectorizer.fit_transform(&docs()).unwrap();
        let b = vectorizer.transform(&docs()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_binary_and_dtype() {
        let config = HashingConfig {
            binary: true,
            dtype: Dtype::Float64,
            ..Default::default()
        };
        let m = HashingVectorizer::new(config)
            .unwrap()
            .transform(&docs())
            .unwrap();
        assert_eq!(m.data, MatrixValues::Float64(vec![1.0; 8]));
    }

    #[test]
    fn test_small_feature_space_sums_collisions() {
        let config = HashingConfig {
            n_features: 1,
            ..Default::default()
        };
        let m = HashingVectorizer::new(config)
            .unwrap()
            .transform(&docs())
            .unwrap();
        assert_eq!(m.indices, vec![0, 0]);
        assert_eq!(m.data, MatrixValues::Int32(vec![5, 4]));
    }

    #[test]
    fn test_alternate_sign_uses_hash_sign() {
        let config = HashingConfig {
            alternate_sign: true,
            ..Default::default()
        };
        let vectorizer = HashingVectorizer::new(config).unwrap();
        let m = vectorizer.transform(&["foo"]).unwrap();
        // murmur3("foo") is negative
        assert_eq!(m.data, MatrixValues::Int32(vec![-1]));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let corpus: Vec<String> = (0..57)
            .map(|i| format!("doc {} shares words with doc {}", i, i % 7))
            .collect();
        let sequential = HashingVectorizer::new(HashingConfig::default()).unwrap().transform(&corpus).unwrap();

        for n_jobs in [2, 3, 8] {
            let config = HashingConfig {
                n_jobs,
                ..Default::default()
            };
            let m = HashingVectorizer::new(config)
                .unwrap()
                .transform(&corpus)
                .unwrap();
            assert_eq!(m, sequential, "n_jobs={}", n_jobs);
        }
    }

    #[test]
    fn test_empty_corpus_and_documents() {
        let vectorizer = HashingVectorizer::new(HashingConfig::default()).unwrap();
        let empty: Vec<String> = Vec::new();
        let m = vectorizer.transform(&empty).unwrap();
        assert_eq!(m.indptr, vec![0]);
        assert_eq!(m.nnz(), 0);

        let m = vectorizer.transform(&["", "a", "words here"]).unwrap();
        assert_eq!(m.indptr, vec![0, 0, 0, 2]);
    }

    #[test]
    fn test_invalid_config_fails_before_work() {
        let config = HashingConfig {
            n_jobs: 0,
            ..Default::default()
        };
        let mut vectorizer = HashingVectorizer::new(config).unwrap();
        assert!(matches!(
            vectorizer.fit(&docs()),
            Err(VectorizeError::Configuration(_))
        ));
        assert!(matches!(
            vectorizer.transform(&docs()),
            Err(VectorizeError::Configuration(_))
        ));
    }

    #[test]
    fn test_other_tokenizers() {
        for tokenizer in [
            TokenizerConfig::UnicodeWord { word_bounds: true },
            TokenizerConfig::Character { window_size: 4 },
            TokenizerConfig::LanguageAware {
                lang: "en".to_string(),
            },
        ] {
            let config = HashingConfig {
                tokenizer,
                ..Default::default()
            };
            let m = HashingVectorizer::new(config)
                .unwrap()
                .transform(&docs())
                .unwrap();
            assert_eq!(m.n_rows(), 2);
            m.check().unwrap();
        }
    }

    #[test]
    fn test_params_include_tokenizer() {
        let params = HashingVectorizer::new(HashingConfig::default()).unwrap().get_params();
        assert_eq!(params.get("n_features"), Some(&ParamValue::Int(1 << 20)));
        assert_eq!(
            params.get("tokenizer__pattern"),
            Some(&ParamValue::Str(r"\b\w\w+\b".to_string()))
        );
    }
}
