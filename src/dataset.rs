use std::num::NonZeroUsize;

use ndarray::{s, Array2, ArrayView2};

use crate::{MlErr, Result};

/// A borrowed batch of samples and their class labels.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// The samples, `[N, D]`.
    pub x: ArrayView2<'a, f64>,
    /// One class index per sample.
    pub y: &'a [usize],
}

/// A source of batches that can be iterated any number of times, once per epoch.
pub trait BatchSource {
    /// Returns an iterator over every batch of the source, from the start.
    fn batches(&self) -> impl Iterator<Item = Batch<'_>>;
}

/// A labelled dataset held in memory, split into consecutive batches of a fixed size. The
/// last batch may be smaller.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    data: Array2<f64>,
    labels: Vec<usize>,
    batch_size: NonZeroUsize,
}

impl InMemoryDataset {
    /// Creates a new `InMemoryDataset`.
    ///
    /// # Arguments
    /// * `data` - The samples, one per row.
    /// * `labels` - The class of every sample.
    /// * `batch_size` - The amount of samples per batch.
    ///
    /// # Returns
    /// The dataset or `MlErr::SizeMismatch` if there isn't exactly one label per row.
    pub fn new(data: Array2<f64>, labels: Vec<usize>, batch_size: NonZeroUsize) -> Result<Self> {
        if data.nrows() != labels.len() {
            return Err(MlErr::SizeMismatch {
                a: "labels",
                b: "samples",
                got: labels.len(),
                expected: data.nrows(),
            });
        }

        Ok(Self {
            data,
            labels,
            batch_size,
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }
}

impl BatchSource for InMemoryDataset {
    fn batches(&self) -> impl Iterator<Item = Batch<'_>> {
        Batches {
            dataset: self,
            cursor: 0,
        }
    }
}

/// Zero-copy iterator over the batches of an `InMemoryDataset`.
struct Batches<'a> {
    dataset: &'a InMemoryDataset,
    cursor: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.dataset.len();
        if self.cursor >= len {
            return None;
        }

        let end = (self.cursor + self.dataset.batch_size.get()).min(len);
        let x = self.dataset.data.slice(s![self.cursor..end, ..]);
        let y = &self.dataset.labels[self.cursor..end];

        self.cursor = end;
        Some(Batch { x, y })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    fn dataset(batch_size: usize) -> InMemoryDataset {
        let data = Array2::from_shape_fn((5, 2), |(i, j)| (i * 2 + j) as f64);
        let batch_size = NonZeroUsize::new(batch_size).unwrap();
        InMemoryDataset::new(data, vec![0, 1, 2, 0, 1], batch_size).unwrap()
    }

    #[test]
    fn test_batches_respect_batch_size() {
        let ds = dataset(2);
        let batches: Vec<_> = ds.batches().collect();

        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].x, array![[0., 1.], [2., 3.]]);
        assert_eq!(batches[0].y, &[0, 1]);
        assert_eq!(batches[2].x, array![[8., 9.]]);
        assert_eq!(batches[2].y, &[1]);
    }

    #[test]
    fn test_reiteration_yields_same_samples() {
        let ds = dataset(3);

        let first: usize = ds.batches().map(|b| b.y.len()).sum();
        let second: usize = ds.batches().map(|b| b.y.len()).sum();

        assert_eq!(first, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_mismatched_labels() {
        let batch_size = NonZeroUsize::new(1).unwrap();
        let err = InMemoryDataset::new(Array2::zeros((3, 2)), vec![0, 1], batch_size);

        assert!(matches!(err, Err(MlErr::SizeMismatch { .. })));
    }

    #[test]
    fn test_empty_dataset_has_no_batches() {
        let batch_size = NonZeroUsize::new(4).unwrap();
        let ds = InMemoryDataset::new(Array2::zeros((0, 2)), vec![], batch_size).unwrap();

        assert!(ds.is_empty());
        assert_eq!(ds.batches().count(), 0);
    }
}
