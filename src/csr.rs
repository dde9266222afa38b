//! Sparse rows and compressed sparse row (CSR) assembly
//!
//! Workers build [`RowSegment`]s, a shard-local CSR fragment, without
//! sharing anything. [`assemble`] then prefix-sums the segment sizes,
//! allocates the output arrays once, splits them into disjoint slices and
//! lets every segment write its own slice in parallel.

use crate::config::Dtype;
use crate::error::{Result, VectorizeError};
use crate::executor::ParallelExecutor;

/// `(column, count)` pairs of one document, columns unique and ascending
pub type SparseRow = Vec<(u32, i32)>;

/// Shard-local run of sparse rows in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSegment {
    offsets: Vec<usize>,
    columns: Vec<u32>,
    counts: Vec<i32>,
}

impl Default for RowSegment {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl RowSegment {
    pub fn with_capacity(rows: usize) -> Self {
        let mut offsets = Vec::with_capacity(rows + 1);
        offsets.push(0);
        Self {
            offsets,
            columns: Vec::new(),
            counts: Vec::new(),
        }
    }

    /// Append one document from unsorted `(column, value)` entries
    ///
    /// Duplicate columns are summed, entries that sum to zero are dropped,
    /// and with `binary` every remaining value becomes 1. `entries` is left
    /// sorted; callers reuse it as scratch space.
    pub fn push_row(&mut self, entries: &mut [(u32, i32)], binary: bool) {
        entries.sort_unstable_by_key(|&(column, _)| column);

        let mut iter = entries.iter();
        if let Some(&(first_column, first_value)) = iter.next() {
            let mut column = first_column;
            let mut total = first_value;

            for &(next_column, value) in iter {
                if next_column == column {
                    total += value;
                } else {
                    self.push_entry(column, total, binary);
                    column = next_column;
                    total = value;
                }
            }
            self.push_entry(column, total, binary);
        }

        self.offsets.push(self.columns.len());
    }

    #[inline]
    fn push_entry(&mut self, column: u32, total: i32, binary: bool) {
        if total != 0 {
            self.columns.push(column);
            self.counts.push(if binary { 1 } else { total });
        }
    }

    pub fn n_rows(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn nnz(&self) -> usize {
        self.columns.len()
    }

    /// Columns and counts of local row `i`
    pub fn row(&self, i: usize) -> (&[u32], &[i32]) {
        let range = self.offsets[i]..self.offsets[i + 1];
        (&self.columns[range.clone()], &self.counts[range])
    }

    pub fn to_rows(&self) -> Vec<SparseRow> {
        (0..self.n_rows())
            .map(|i| {
                let (columns, counts) = self.row(i);
                columns.iter().copied().zip(counts.iter().copied()).collect()
            })
            .collect()
    }

    /// Rewrite every column through `map` and restore per-row ordering
    ///
    /// `map` must be injective so rows stay duplicate free.
    pub fn remap_columns(&mut self, map: &[u32]) {
        let mut scratch: Vec<(u32, i32)> = Vec::new();

        for i in 0..self.n_rows() {
            let range = self.offsets[i]..self.offsets[i + 1];
            scratch.clear();
            scratch.extend(
                self.columns[range.clone()]
                    .iter()
                    .zip(&self.counts[range.clone()])
                    .map(|(&column, &count)| (map[column as usize], count)),
            );
            scratch.sort_unstable_by_key(|&(column, _)| column);

            for (slot, (column, count)) in range.zip(scratch.iter().copied()) {
                self.columns[slot] = column;
                self.counts[slot] = count;
            }
        }
    }
}

/// Matrix values in the configured output type
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixValues {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
}

impl MatrixValues {
    pub fn dtype(&self) -> Dtype {
        match self {
            MatrixValues::Int32(_) => Dtype::Int32,
            MatrixValues::Int64(_) => Dtype::Int64,
            MatrixValues::Float32(_) => Dtype::Float32,
            MatrixValues::Float64(_) => Dtype::Float64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            MatrixValues::Int32(v) => v.len(),
            MatrixValues::Int64(v) => v.len(),
            MatrixValues::Float32(v) => v.len(),
            MatrixValues::Float64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get_f64(&self, i: usize) -> Option<f64> {
        match self {
            MatrixValues::Int32(v) => v.get(i).map(|x| *x as f64),
            MatrixValues::Int64(v) => v.get(i).map(|x| *x as f64),
            MatrixValues::Float32(v) => v.get(i).map(|x| *x as f64),
            MatrixValues::Float64(v) => v.get(i).copied(),
        }
    }

    pub fn to_f64_vec(&self) -> Vec<f64> {
        (0..self.len()).filter_map(|i| self.get_f64(i)).collect()
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            MatrixValues::Int32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<&[i64]> {
        match self {
            MatrixValues::Int64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            MatrixValues::Float32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            MatrixValues::Float64(v) => Some(v),
            _ => None,
        }
    }
}

/// Compressed sparse row matrix
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    pub indptr: Vec<usize>,
    pub indices: Vec<u32>,
    pub data: MatrixValues,
    pub shape: (usize, usize),
}

impl CsrMatrix {
    pub fn n_rows(&self) -> usize {
        self.shape.0
    }

    pub fn n_features(&self) -> usize {
        self.shape.1
    }

    pub fn nnz(&self) -> usize {
        self.indptr.last().copied().unwrap_or(0)
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    /// Columns stored for row `i`
    pub fn row_indices(&self, i: usize) -> &[u32] {
        &self.indices[self.indptr[i]..self.indptr[i + 1]]
    }

    /// Row `i` as `(column, value)` pairs
    pub fn row(&self, i: usize) -> Vec<(u32, f64)> {
        (self.indptr[i]..self.indptr[i + 1])
            .filter_map(|k| self.data.get_f64(k).map(|v| (self.indices[k], v)))
            .collect()
    }

    /// Value at `(row, column)`, zero when not stored
    pub fn get(&self, row: usize, column: u32) -> f64 {
        let start = self.indptr[row];
        match self.row_indices(row).binary_search(&column) {
            Ok(offset) => self.data.get_f64(start + offset).unwrap_or(0.0),
            Err(_) => 0.0,
        }
    }

    /// Dense row-major copy; only sensible for small matrices
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        (0..self.n_rows())
            .map(|i| {
                let mut dense = vec![0.0; self.n_features()];
                for (column, value) in self.row(i) {
                    dense[column as usize] = value;
                }
                dense
            })
            .collect()
    }

    /// Verify the structural CSR invariants
    pub fn check(&self) -> Result<()> {
        let fail = |msg: String| Err(VectorizeError::InvalidMatrix(msg));

        if self.indptr.len() != self.shape.0 + 1 {
            return fail(format!(
                "indptr has {} entries for {} rows",
                self.indptr.len(),
                self.shape.0
            ));
        }
        if self.indptr[0] != 0 {
            return fail("indptr[0] must be 0".to_string());
        }
        if self.indices.len() != self.nnz() || self.data.len() != self.nnz() {
            return fail("indices and data must both hold nnz entries".to_string());
        }
        if self.indptr.windows(2).any(|pair| pair[0] > pair[1]) {
            return fail("indptr must be non-decreasing".to_string());
        }
        for window in self.indptr.windows(2) {
            let row = &self.indices[window[0]..window[1]];
            if row.windows(2).any(|pair| pair[0] >= pair[1]) {
                return fail("row columns must be strictly increasing".to_string());
            }
            if row.iter().any(|&column| column as usize >= self.shape.1) {
                return fail("column index out of range".to_string());
            }
        }
        Ok(())
    }
}

/// Conversion from an accumulated count to an output value
trait CountValue: Copy + Default + Send + Sync {
    fn from_count(count: i32) -> Self;
}

macro_rules! impl_count_value {
    ($($ty:ty),*) => {
        $(impl CountValue for $ty {
            #[inline]
            fn from_count(count: i32) -> Self {
                count as $ty
            }
        })*
    };
}

impl_count_value!(i32, i64, f32, f64);

/// Split `slice` into consecutive disjoint pieces of the given lengths
fn split_disjoint<'a, T>(mut slice: &'a mut [T], lengths: &[usize]) -> Vec<&'a mut [T]> {
    let mut pieces = Vec::with_capacity(lengths.len());
    for &len in lengths {
        let (head, tail) = slice.split_at_mut(len);
        pieces.push(head);
        slice = tail;
    }
    pieces
}

fn assemble_typed<T: CountValue>(
    segments: &[RowSegment],
    executor: &ParallelExecutor,
) -> (Vec<usize>, Vec<u32>, Vec<T>) {
    let row_counts: Vec<usize> = segments.iter().map(RowSegment::n_rows).collect();
    let nnz_counts: Vec<usize> = segments.iter().map(RowSegment::nnz).collect();

    let mut nnz_bases = Vec::with_capacity(segments.len());
    let mut total_nnz = 0;
    for &nnz in &nnz_counts {
        nnz_bases.push(total_nnz);
        total_nnz += nnz;
    }
    let n_rows: usize = row_counts.iter().sum();

    let mut indptr = vec![0usize; n_rows + 1];
    let mut indices = vec![0u32; total_nnz];
    let mut data = vec![T::default(); total_nnz];

    let jobs: Vec<_> = segments
        .iter()
        .zip(split_disjoint(&mut indptr[1..], &row_counts))
        .zip(split_disjoint(&mut indices, &nnz_counts))
        .zip(split_disjoint(&mut data, &nnz_counts))
        .zip(nnz_bases)
        .collect();

    executor.map_each(jobs, |((((segment, indptr_out), indices_out), data_out), base)| {
        for (slot, offset) in indptr_out.iter_mut().zip(&segment.offsets[1..]) {
            *slot = base + offset;
        }
        indices_out.copy_from_slice(&segment.columns);
        for (slot, count) in data_out.iter_mut().zip(&segment.counts) {
            *slot = T::from_count(*count);
        }
    });

    (indptr, indices, data)
}

/// Concatenate shard segments, in order, into one CSR matrix
pub fn assemble(
    segments: &[RowSegment],
    n_features: usize,
    dtype: Dtype,
    executor: &ParallelExecutor,
) -> CsrMatrix {
    let (indptr, indices, data) = match dtype {
        Dtype::Int32 => {
            let (indptr, indices, data) = assemble_typed::<i32>(segments, executor);
            (indptr, indices, MatrixValues::Int32(data))
        }
        Dtype::Int64 => {
            let (indptr, indices, data) = assemble_typed::<i64>(segments, executor);
            (indptr, indices, MatrixValues::Int64(data))
        }
        Dtype::Float32 => {
            let (indptr, indices, data) = assemble_typed::<f32>(segments, executor);
            (indptr, indices, MatrixValues::Float32(data))
        }
        Dtype::Float64 => {
            let (indptr, indices, data) = assemble_typed::<f64>(segments, executor);
            (indptr, indices, MatrixValues::Float64(data))
        }
    };

    let n_rows = indptr.len() - 1;
    log::debug!(
        "assembled {}x{} matrix with {} stored values from {} segments",
        n_rows,
        n_features,
        indices.len(),
        segments.len()
    );

    CsrMatrix {
        indptr,
        indices,
        data,
        shape: (n_rows, n_features),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(rows: &[&[(u32, i32)]]) -> RowSegment {
        let mut seg = RowSegment::default();
        for row in rows {
            let mut entries = row.to_vec();
            seg.push_row(&mut entries, false);
        }
        seg
    }

    #[test]
    fn test_push_row_sums_duplicates() {
        let seg = segment(&[&[(5, 1), (1, 1), (5, 1), (3, 1)]]);
        assert_eq!(seg.to_rows(), vec![vec![(1, 1), (3, 1), (5, 2)]]);
    }

    #[test]
    fn test_push_row_drops_zero_sums() {
        let seg = segment(&[&[(2, 1), (2, -1), (4, -1)]]);
        assert_eq!(seg.to_rows(), vec![vec![(4, -1)]]);
    }

    #[test]
    fn test_push_row_binary() {
        let mut seg = RowSegment::default();
        let mut entries = vec![(7, 1), (7, 1), (7, 1), (2, -1)];
        seg.push_row(&mut entries, true);
        assert_eq!(seg.to_rows(), vec![vec![(2, 1), (7, 1)]]);
    }

    #[test]
    fn test_empty_row() {
        let seg = segment(&[&[], &[(0, 1)], &[]]);
        assert_eq!(seg.n_rows(), 3);
        assert_eq!(seg.nnz(), 1);
        assert_eq!(seg.row(0).0, &[] as &[u32]);
    }

    #[test]
    fn test_remap_columns_resorts() {
        let mut seg = segment(&[&[(0, 1), (1, 2), (2, 3)]]);
        seg.remap_columns(&[9, 4, 0]);
        assert_eq!(seg.to_rows(), vec![vec![(0, 3), (4, 2), (9, 1)]]);
    }

    #[test]
    fn test_assemble_concatenates_in_order() {
        let segments = vec![
            segment(&[&[(3, 1), (1, 2)], &[]]),
            segment(&[&[(1, 3), (5, 4)]]),
        ];
        let executor = ParallelExecutor::new(2).unwrap();
        let matrix = assemble(&segments, 6, Dtype::Int32, &executor);

        assert_eq!(matrix.indptr, vec![0, 2, 2, 4]);
        assert_eq!(matrix.indices, vec![1, 3, 1, 5]);
        assert_eq!(matrix.data.as_i32().unwrap(), &[2, 1, 3, 4]);
        assert_eq!(matrix.shape, (3, 6));
        assert!(matrix.check().is_ok());
        assert_eq!(matrix.get(2, 5), 4.0);
        assert_eq!(matrix.get(1, 5), 0.0);
        assert_eq!(matrix.to_dense()[0], vec![0.0, 2.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_assemble_dtypes() {
        let segments = vec![segment(&[&[(0, 2)]])];
        let executor = ParallelExecutor::new(1).unwrap();

        let m = assemble(&segments, 1, Dtype::Float64, &executor);
        assert_eq!(m.data.as_f64().unwrap(), &[2.0]);
        let m = assemble(&segments, 1, Dtype::Int64, &executor);
        assert_eq!(m.data.as_i64().unwrap(), &[2]);
        let m = assemble(&segments, 1, Dtype::Float32, &executor);
        assert_eq!(m.data.as_f32().unwrap(), &[2.0]);
        assert_eq!(m.dtype(), Dtype::Float32);
    }

    #[test]
    fn test_assemble_nothing() {
        let executor = ParallelExecutor::new(4).unwrap();
        let matrix = assemble(&[], 10, Dtype::Int32, &executor);
        assert_eq!(matrix.indptr, vec![0]);
        assert!(matrix.indices.is_empty());
        assert_eq!(matrix.shape, (0, 10));
        assert!(matrix.check().is_ok());
    }

    #[test]
    fn test_check_rejects_bad_matrices() {
        let good = CsrMatrix {
            indptr: vec![0, 2],
            indices: vec![0, 1],
            data: MatrixValues::Int32(vec![1, 1]),
            shape: (1, 2),
        };
        assert!(good.check().is_ok());

        let mut unsorted = good.clone();
        unsorted.indices = vec![1, 0];
        assert!(unsorted.check().is_err());

        let mut out_of_range = good.clone();
        out_of_range.shape = (1, 1);
        assert!(out_of_range.check().is_err());

        let mut short_indptr = good;
        short_indptr.indptr = vec![0];
        assert!(short_indptr.check().is_err());
    }
}
