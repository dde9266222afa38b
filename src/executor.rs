use crate::error::{Result, VectorizeError};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::ops::Range;

/// Fork-join runner for one vectorizer call
///
/// `n_jobs == 1` runs everything on the calling thread. Larger values get
/// a dedicated pool that lives for the call, with no more threads than
/// there are shards to run.
pub struct ParallelExecutor {
    n_jobs: usize,
    pool: Option<ThreadPool>,
}

impl ParallelExecutor {
    pub fn new(n_jobs: i32) -> Result<Self> {
        Self::for_batch(n_jobs, usize::MAX)
    }

    /// Executor for a batch of `n_items` documents
    ///
    /// Sharding still follows `n_jobs`, but the pool is capped at
    /// `n_items` threads, and a batch of at most one item runs inline.
    pub fn for_batch(n_jobs: i32, n_items: usize) -> Result<Self> {
        if n_jobs < 1 {
            return Err(VectorizeError::Configuration(format!(
                "n_jobs={} must be an integer >= 1",
                n_jobs
            )));
        }
        let n_jobs = n_jobs as usize;
        let n_threads = n_jobs.min(n_items);

        let pool = if n_threads > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(n_threads)
                .thread_name(|i| format!("textvec-worker-{}", i))
                .build()
                .map_err(|e| VectorizeError::ThreadPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self { n_jobs, pool })
    }

    pub fn n_jobs(&self) -> usize {
        self.n_jobs
    }

    /// Worker threads backing this executor, `1` when sequential
    pub fn n_threads(&self) -> usize {
        self.pool
            .as_ref()
            .map_or(1, ThreadPool::current_num_threads)
    }

    pub fn is_sequential(&self) -> bool {
        self.pool.is_none()
    }

    /// Contiguous, balanced, order-preserving shard ranges over `n_docs`
    ///
    /// At most `n_jobs` shards; the first `n_docs % shards` get one extra
    /// document. No shards at all for an empty input.
    pub fn shard_ranges(&self, n_docs: usize) -> Vec<Range<usize>> {
        let n_shards = self.n_jobs.min(n_docs);
        if n_shards == 0 {
            return Vec::new();
        }

        let base = n_docs / n_shards;
        let extra = n_docs % n_shards;

        let mut ranges = Vec::with_capacity(n_shards);
        let mut start = 0;
        for shard in 0..n_shards {
            let len = base + usize::from(shard < extra);
            ranges.push(start..start + len);
            start += len;
        }
        ranges
    }

    /// Apply `f` to every item, in parallel when a pool exists
    ///
    /// Results come back in item order.
    pub fn map_each<T, R, F>(&self, items: Vec<T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync + Send,
    {
        match &self.pool {
            None => items.into_iter().map(f).collect(),
            Some(pool) => pool.install(|| items.into_par_iter().map(f).collect()),
        }
    }

    /// Run `f` once per shard of `documents`, results in shard order
    pub fn map_shards<'d, D, R, F>(&self, documents: &'d [D], f: F) -> Vec<R>
    where
        D: Sync,
        R: Send,
        F: Fn(&'d [D]) -> R + Sync + Send,
    {
        let ranges = self.shard_ranges(documents.len());
        log::debug!(
            "splitting {} documents into {} shards for {} jobs",
            documents.len(),
            ranges.len(),
            self.n_jobs
        );
        self.map_each(ranges, |range| f(&documents[range]))
    }
}
