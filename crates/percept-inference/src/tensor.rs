//! The tensor type used for model input and output.

use ndarray::{ArrayD, ArrayViewD, IxDyn};

use crate::error::InferenceError;
use crate::memory::{AllocGuard, MemoryTracker};
use crate::Result;

/// A shaped f32 array with an ownership contract: a tensor registered with a
/// [`MemoryTracker`] counts as live until it is dropped.
///
/// Tensors are not `Clone`: each allocation is owned by exactly one holder,
/// and intermediates created during a prediction must be dropped before the
/// call returns.
#[derive(Debug)]
pub struct Tensor {
    data: ArrayD<f32>,
    _alloc: Option<AllocGuard>,
}

impl Tensor {
    /// Wrap an array and register the allocation with `tracker`.
    pub fn tracked(data: ArrayD<f32>, tracker: &MemoryTracker) -> Self {
        Self {
            data,
            _alloc: Some(tracker.register()),
        }
    }

    /// Wrap an array without registering it anywhere.
    pub fn untracked(data: ArrayD<f32>) -> Self {
        Self { data, _alloc: None }
    }

    /// Build a tracked tensor from raw data and a shape.
    pub fn from_shape_vec(shape: &[usize], data: Vec<f32>, tracker: &MemoryTracker) -> Result<Self> {
        let arr = ArrayD::from_shape_vec(IxDyn(shape), data)
            .map_err(|e| InferenceError::InvalidInput(e.to_string()))?;
        Ok(Self::tracked(arr, tracker))
    }

    /// Shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read-only view of the data.
    pub fn view(&self) -> ArrayViewD<'_, f32> {
        self.data.view()
    }

    /// Contiguous element slice, if the layout allows it.
    pub fn as_slice(&self) -> Option<&[f32]> {
        self.data.as_slice()
    }

    /// Borrow the underlying array.
    pub fn data(&self) -> &ArrayD<f32> {
        &self.data
    }

    /// Consume the tensor, releasing its allocation guard.
    pub fn into_data(self) -> ArrayD<f32> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_shape_vec() {
        let tracker = MemoryTracker::new();
        let tensor = Tensor::from_shape_vec(&[1, 2, 2, 3], vec![0.5; 12], &tracker).unwrap();

        assert_eq!(tensor.shape(), &[1, 2, 2, 3]);
        assert_eq!(tensor.len(), 12);
        assert_eq!(tracker.live_tensors(), 1);
    }

    #[test]
    fn test_shape_mismatch_is_rejected() {
        let tracker = MemoryTracker::new();
        let result = Tensor::from_shape_vec(&[1, 2, 2, 3], vec![0.5; 7], &tracker);

        assert!(matches!(result, Err(InferenceError::InvalidInput(_))));
        assert_eq!(tracker.live_tensors(), 0);
    }

    #[test]
    fn test_drop_releases_allocation() {
        let tracker = MemoryTracker::new();
        let tensor = Tensor::from_shape_vec(&[4], vec![1.0, 2.0, 3.0, 4.0], &tracker).unwrap();
        assert_eq!(tracker.live_tensors(), 1);

        drop(tensor);
        assert_eq!(tracker.live_tensors(), 0);
    }

    #[test]
    fn test_untracked_does_not_count() {
        let tracker = MemoryTracker::new();
        let arr = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, 2.0]).unwrap();
        let _tensor = Tensor::untracked(arr);

        assert_eq!(tracker.live_tensors(), 0);
    }

    #[test]
    fn test_into_data_releases_guard() {
        let tracker = MemoryTracker::new();
        let tensor = Tensor::from_shape_vec(&[2], vec![1.0, 2.0], &tracker).unwrap();

        let data = tensor.into_data();
        assert_eq!(data.as_slice(), Some(&[1.0f32, 2.0][..]));
        assert_eq!(tracker.live_tensors(), 0);
    }
}
