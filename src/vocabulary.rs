use crate::csr::RowSegment;
use crate::error::{Result, VectorizeError};
use crate::tokenizer::{preprocess, Tokenizer};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Learned token to column mapping
///
/// Columns are assigned in order of first occurrence across the fitted
/// documents, so `terms[i]` is the token of column `i`. Serializes as the
/// plain term list; deserializing rebuilds the lookup table and rejects
/// duplicate terms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
    lookup: FxHashMap<String, u32>,
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = VectorizeError;

    fn try_from(terms: Vec<String>) -> Result<Self> {
        Self::from_terms(terms)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.terms
    }
}

impl PartialEq for Vocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}

impl Eq for Vocabulary {}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from tokens listed in column order
    pub fn from_terms(terms: Vec<String>) -> Result<Self> {
        let mut vocabulary = Self {
            terms,
            lookup: FxHashMap::default(),
        };
        vocabulary.rebuild_lookup()?;
        Ok(vocabulary)
    }

    fn rebuild_lookup(&mut self) -> Result<()> {
        self.lookup.clear();
        self.lookup.reserve(self.terms.len());

        for (idx, term) in self.terms.iter().enumerate() {
            if self.lookup.insert(term.clone(), idx as u32).is_some() {
                return Err(VectorizeError::InvalidSnapshotFormat(format!(
                    "duplicate vocabulary term {:?}",
                    term
                )));
            }
        }
        Ok(())
    }

    /// Column of `token`, assigning the next one if it is new
    pub(crate) fn insert(&mut self, token: &str) -> u32 {
        if let Some(&idx) = self.lookup.get(token) {
            return idx;
        }
        let idx = self.terms.len() as u32;
        self.terms.push(token.to_string());
        self.lookup.insert(token.to_string(), idx);
        idx
    }

    pub fn get(&self, token: &str) -> Option<u32> {
        self.lookup.get(token).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.lookup.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// `(token, column)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.terms
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.as_str(), idx as u32))
    }
}

/// Tokens and counts gathered by one worker during fit
///
/// Local indices follow first occurrence inside the shard; the rows in
/// `segment` are expressed in those local indices.
#[derive(Debug, Default)]
pub struct ShardVocabulary {
    tokens: Vec<String>,
    lookup: FxHashMap<String, u32>,
    segment: RowSegment,
}

impl ShardVocabulary {
    /// Tokenize and count one shard of documents
    pub fn build<D: AsRef<str>>(
        documents: &[D],
        tokenizer: &dyn Tokenizer,
        lowercase: bool,
        binary: bool,
    ) -> Self {
        let mut shard = Self {
            tokens: Vec::new(),
            lookup: FxHashMap::default(),
            segment: RowSegment::with_capacity(documents.len()),
        };
        let mut entries: Vec<(u32, i32)> = Vec::new();

        for document in documents {
            let text = preprocess(document.as_ref(), lowercase);
            entries.clear();
            for token in tokenizer.tokenize(&text) {
                let idx = shard.local_index(token);
                entries.push((idx, 1));
            }
            shard.segment.push_row(&mut entries, binary);
        }

        log::trace!(
            "shard of {} documents: {} distinct tokens, {} stored values",
            documents.len(),
            shard.tokens.len(),
            shard.segment.nnz()
        );
        shard
    }

    fn local_index(&mut self, token: &str) -> u32 {
        if let Some(&idx) = self.lookup.get(token) {
            return idx;
        }
        let idx = self.tokens.len() as u32;
        self.tokens.push(token.to_string());
        self.lookup.insert(token.to_string(), idx);
        idx
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn segment(&self) -> &RowSegment {
        &self.segment
    }

    pub fn into_segment(self) -> RowSegment {
        self.segment
    }
}

/// Merge shard vocabularies into one global vocabulary
///
/// Shards are visited in document order and each shard's tokens in local
/// first-occurrence order, so every token gets the next free column at
/// its first global occurrence. The result does not depend on how the
/// documents were sharded. Also returns, per shard, the local to global
/// column map.
pub fn merge_shards(shards: &[ShardVocabulary]) -> (Vocabulary, Vec<Vec<u32>>) {
    let capacity = shards.iter().map(ShardVocabulary::token_count).max().unwrap_or(0);
    let mut vocabulary = Vocabulary {
        terms: Vec::with_capacity(capacity),
        lookup: FxHashMap::default(),
    };

    let remaps: Vec<Vec<u32>> = shards
        .iter()
        .map(|shard| {
            shard
                .tokens
                .iter()
                .map(|token| vocabulary.insert(token))
                .collect::<Vec<u32>>()
        })
        .collect();

    log::debug!(
        "merged {} shard vocabularies into {} terms",
        shards.len(),
        vocabulary.len()
    );
    (vocabulary, remaps)
}
