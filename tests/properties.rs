use proptest::prelude::*;
use std::collections::BTreeSet;
use textvec::{
    CharacterTokenizer, CountConfig, CountVectorizer, Estimator, HashingConfig, HashingVectorizer,
    RegexpTokenizer, Tokenizer, TokenizerConfig, Vectorizer, DEFAULT_TOKEN_PATTERN,
};

/// Small alphabet so documents share tokens and columns collide
fn corpus() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-e ]{0,24}", 0..40)
}

fn count_config(n_jobs: i32, binary: bool) -> CountConfig {
    CountConfig {
        n_jobs,
        binary,
        ..Default::default()
    }
}

fn hashing_config(n_jobs: i32, n_features: i64, alternate_sign: bool) -> HashingConfig {
    HashingConfig {
        n_jobs,
        n_features,
        alternate_sign,
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn count_output_is_independent_of_n_jobs(docs in corpus(), n_jobs in 2..6i32, binary in any::<bool>()) {
        let mut sequential = CountVectorizer::new(count_config(1, binary)).unwrap();
        let expected = sequential.fit_transform(&docs).unwrap();

        let mut parallel = CountVectorizer::new(count_config(n_jobs, binary)).unwrap();
        let actual = parallel.fit_transform(&docs).unwrap();

        prop_assert_eq!(parallel.vocabulary(), sequential.vocabulary());
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn hashing_output_is_independent_of_n_jobs(
        docs in corpus(),
        n_jobs in 2..6i32,
        n_features in 1..64i64,
        alternate_sign in any::<bool>(),
    ) {
        let sequential = HashingVectorizer::new(hashing_config(1, n_features, alternate_sign)).unwrap();
        let parallel = HashingVectorizer::new(hashing_config(n_jobs, n_features, alternate_sign)).unwrap();

        prop_assert_eq!(
            parallel.transform(&docs).unwrap(),
            sequential.transform(&docs).unwrap()
        );
    }

    #[test]
    fn fit_transform_equals_fit_then_transform(docs in corpus(), n_jobs in 1..5i32) {
        let mut a = CountVectorizer::new(count_config(n_jobs, false)).unwrap();
        let combined = a.fit_transform(&docs).unwrap();

        let mut b = CountVectorizer::new(count_config(n_jobs, false)).unwrap();
        b.fit(&docs).unwrap();
        prop_assert_eq!(b.transform(&docs).unwrap(), combined);
    }

    #[test]
    fn matrices_are_canonical(docs in corpus(), n_jobs in 1..5i32, n_features in 1..32i64) {
        let mut count = CountVectorizer::new(count_config(n_jobs, false)).unwrap();
        let m = count.fit_transform(&docs).unwrap();
        prop_assert!(m.check().is_ok());
        prop_assert_eq!(m.indptr.len(), docs.len() + 1);
        prop_assert_eq!(m.n_features(), count.vocabulary().unwrap().len());

        let hashing = HashingVectorizer::new(hashing_config(n_jobs, n_features, true)).unwrap();
        let m = hashing.transform(&docs).unwrap();
        prop_assert!(m.check().is_ok());
        prop_assert_eq!(m.shape, (docs.len(), n_features as usize));
    }

    #[test]
    fn vocabulary_follows_first_occurrence(docs in corpus(), n_jobs in 1..5i32) {
        let tokenizer = RegexpTokenizer::new(DEFAULT_TOKEN_PATTERN).unwrap();
        let mut expected: Vec<String> = Vec::new();
        for doc in &docs {
            for token in tokenizer.tokenize(doc) {
                if !expected.iter().any(|t| t == token) {
                    expected.push(token.to_string());
                }
            }
        }

        let mut v = CountVectorizer::new(count_config(n_jobs, false)).unwrap();
        v.fit(&docs).unwrap();
        let terms: Vec<String> = v
            .vocabulary()
            .unwrap()
            .iter()
            .map(|(term, _)| term.to_string())
            .collect();
        prop_assert_eq!(terms, expected);
    }

    #[test]
    fn row_nnz_is_distinct_token_count(docs in corpus()) {
        let tokenizer = RegexpTokenizer::new(DEFAULT_TOKEN_PATTERN).unwrap();
        let mut v = CountVectorizer::new(count_config(1, false)).unwrap();
        let m = v.fit_transform(&docs).unwrap();

        for (i, doc) in docs.iter().enumerate() {
            let distinct: BTreeSet<&str> = tokenizer.tokenize(doc).collect();
            prop_assert_eq!(m.indptr[i + 1] - m.indptr[i], distinct.len());

            let total: f64 = m.row(i).iter().map(|&(_, value)| value).sum();
            prop_assert_eq!(total as usize, tokenizer.tokenize(doc).count());
        }
    }

    #[test]
    fn snapshot_round_trip_preserves_output(docs in corpus(), fit_first in any::<bool>()) {
        let mut estimator = Estimator::count(count_config(2, false)).unwrap();
        if fit_first {
            estimator.fit(&docs).unwrap();
        }
        let restored = Estimator::from_bytes(&estimator.to_bytes().unwrap()).unwrap();

        prop_assert_eq!(restored.is_fitted(), estimator.is_fitted());
        if fit_first {
            prop_assert_eq!(
                restored.transform(&docs).unwrap(),
                estimator.transform(&docs).unwrap()
            );
        }
    }

    #[test]
    fn character_windows_cover_text(text in "\\PC{0,30}", window_size in 1..6usize) {
        let tokenizer = CharacterTokenizer::new(window_size).unwrap();
        let tokens: Vec<&str> = tokenizer.tokenize(&text).collect();
        let n_chars = text.chars().count();

        let expected = match n_chars {
            0 => 0,
            n if n < window_size => 1,
            n => n - window_size + 1,
        };
        prop_assert_eq!(tokens.len(), expected);
        for token in &tokens {
            prop_assert!(token.chars().count() <= window_size);
        }
        if let Some(first) = tokens.first() {
            prop_assert!(text.starts_with(first));
        }
    }

    #[test]
    fn every_tokenizer_handles_arbitrary_text(text in "\\PC{0,40}") {
        for config in [
            TokenizerConfig::default(),
            TokenizerConfig::UnicodeWord { word_bounds: true },
            TokenizerConfig::UnicodeWord { word_bounds: false },
            TokenizerConfig::Character { window_size: 3 },
            TokenizerConfig::LanguageAware { lang: "en".to_string() },
            TokenizerConfig::LanguageAware { lang: "fr".to_string() },
        ] {
            let tokenizer = config.build().unwrap();
            for token in tokenizer.tokenize(&text) {
                prop_assert!(!token.is_empty());
            }
        }
    }
}
