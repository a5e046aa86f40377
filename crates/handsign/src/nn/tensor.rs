//! Tensor API.
//!
//! Tensors are the inputs and outputs of neural networks. Here they carry flat feature vectors in
//! and class scores out, but the type itself is just an N-dimensional `f32` array.

use std::fmt;

use tinyvec::TinyVec;

type Shape = TinyVec<[usize; 4]>;

/// A dynamically sized, row-major `f32` tensor.
///
/// # Construction
///
/// A tensor can be created from a 1-dimensional slice or array via the provided `From` impls, or
/// with an explicit shape through [`Tensor::from_iter`].
#[derive(Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    data: Box<[f32]>,
}

impl Tensor {
    /// Creates a tensor of the given shape by pulling elements from an iterator.
    ///
    /// # Panics
    ///
    /// `iter` must yield exactly as many elements as specified by `shape` (by multiplying all of
    /// its entries), otherwise this method will panic.
    #[track_caller]
    pub fn from_iter<I: IntoIterator<Item = f32>>(shape: &[usize], iter: I) -> Self {
        let data: Box<[f32]> = iter.into_iter().collect();
        let elements: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            elements,
            "tensor of shape {:?} needs {} elements, got {}",
            shape,
            elements,
            data.len(),
        );
        Self {
            shape: TinyVec::from(shape),
            data,
        }
    }

    pub(super) fn from_tract(tract: &tract_onnx::prelude::Tensor) -> anyhow::Result<Self> {
        let data = tract.as_slice::<f32>()?;
        Ok(Self::from_iter(tract.shape(), data.iter().copied()))
    }

    pub(super) fn to_tract(&self) -> anyhow::Result<tract_onnx::prelude::Tensor> {
        Ok(tract_onnx::prelude::Tensor::from_shape(
            self.shape(),
            &self.data[..],
        )?)
    }

    /// Returns the shape of this tensor.
    ///
    /// A tensor's shape is the number of entries in each dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions of this tensor.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Returns the total number of elements in this tensor.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns all elements of this tensor in row-major order, regardless of its shape.
    pub fn as_raw_data(&self) -> &[f32] {
        &self.data
    }

    /// Returns row `index` of a 2-dimensional tensor.
    ///
    /// # Panics
    ///
    /// Panics if `self` is not 2-dimensional or `index` is out of bounds.
    #[track_caller]
    pub fn row(&self, index: usize) -> &[f32] {
        assert_eq!(
            self.rank(),
            2,
            "attempted to access row of tensor with shape {:?}",
            self.shape()
        );
        let (rows, cols) = (self.shape[0], self.shape[1]);
        assert!(
            index < rows,
            "row {} out of bounds for tensor with shape {:?}",
            index,
            self.shape()
        );
        &self.data[index * cols..(index + 1) * cols]
    }

    /// Returns the values stored in a 1-dimensional tensor as a slice.
    ///
    /// # Panics
    ///
    /// `self` must have exactly 1 dimension, otherwise this method panics.
    #[track_caller]
    pub fn as_slice(&self) -> &[f32] {
        assert_eq!(
            self.rank(),
            1,
            "attempted to access tensor of shape {:?} as slice",
            self.shape()
        );
        &self.data
    }
}

impl<'a> From<&'a [f32]> for Tensor {
    fn from(slice: &'a [f32]) -> Self {
        Tensor::from_iter(&[slice.len()], slice.iter().copied())
    }
}

impl<const N: usize> From<[f32; N]> for Tensor {
    fn from(arr: [f32; N]) -> Self {
        Tensor::from_iter(&[N], arr)
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .finish()
    }
}
