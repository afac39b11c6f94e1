mod dims;

pub use dims::Dims;

use crate::dtype::DType;
use rand::Rng;
use rand::distributions::Distribution;
use std::fmt::{Debug, Formatter};
use std::ops::{Index, IndexMut};
use std::slice::{Chunks, ChunksMut};

/// Owned, contiguous, row-major tensor.
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tensor<T> {
    data: Vec<T>,
    dims: Dims,
}

impl<T> Tensor<T> {
    #[track_caller]
    pub fn from_vec(data: Vec<T>, dims: Dims) -> Self {
        assert_eq!(
            data.len(),
            dims.size(),
            "data length does not match dims {dims}"
        );
        Tensor { data, dims }
    }

    pub fn from_vec_1d(data: Vec<T>) -> Self {
        let len = data.len();
        Tensor {
            data,
            dims: Dims::D1(len),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn dims(&self) -> &Dims {
        &self.dims
    }

    #[inline]
    pub fn ndim(&self) -> usize {
        self.dims.ndim()
    }

    /// Reinterpret the dimensions without touching the data. The element
    /// count must be preserved.
    #[track_caller]
    pub fn reshape(mut self, dims: Dims) -> Self {
        assert_eq!(
            self.dims.size(),
            dims.size(),
            "cannot reshape {} into {dims}",
            self.dims
        );
        self.dims = dims;
        self
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Iterate over first-axis entries as flat slices.
    #[inline]
    pub fn iter_first_axis(&self) -> Chunks<'_, T> {
        self.data.chunks(self.dims.chunk_size())
    }

    #[inline]
    pub fn iter_first_axis_mut(&mut self) -> ChunksMut<'_, T> {
        let chunk = self.dims.chunk_size();
        self.data.chunks_mut(chunk)
    }
}

impl<T: Clone> Tensor<T> {
    pub fn filled(value: T, dims: Dims) -> Self {
        Tensor {
            data: vec![value; dims.size()],
            dims,
        }
    }

    #[inline]
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Owned copy of the first-axis range `start..end`.
    #[track_caller]
    pub fn slice_first_axis(&self, start: usize, end: usize) -> Self {
        assert!(
            start <= end && end <= self.dims.first(),
            "range {start}..{end} out of bounds for {}",
            self.dims
        );
        let chunk = self.dims.chunk_size();
        Tensor {
            data: self.data[start * chunk..end * chunk].to_vec(),
            dims: self.dims.with_first(end - start),
        }
    }

    /// Owned copy of the given first-axis entries, in the given order.
    /// Indices may repeat (sampling with replacement).
    #[track_caller]
    pub fn select_first_axis(&self, indices: &[usize]) -> Self {
        let chunk = self.dims.chunk_size();
        let mut data = Vec::with_capacity(indices.len() * chunk);
        for &i in indices {
            assert!(i < self.dims.first(), "index {i} out of bounds for {}", self.dims);
            data.extend_from_slice(&self.data[i * chunk..(i + 1) * chunk]);
        }
        Tensor {
            data,
            dims: self.dims.with_first(indices.len()),
        }
    }
}

impl<T: DType> Tensor<T> {
    #[inline]
    pub fn zeroed(dims: Dims) -> Self {
        Self::filled(T::ZERO, dims)
    }

    #[inline]
    pub fn fill_zero(&mut self) {
        self.data.fill(T::ZERO);
    }

    pub fn from_distribution<R, S>(rng: &mut R, dist: S, dims: Dims) -> Self
    where
        R: Rng,
        S: Distribution<T>,
    {
        let data: Vec<T> = dist.sample_iter(rng).take(dims.size()).collect();
        Tensor { data, dims }
    }

    /// Per-row index of the maximum element of a 2-D tensor. Ties resolve
    /// to the first occurrence in scan order.
    #[track_caller]
    pub fn argmax_rows(&self) -> Vec<usize> {
        let (rows, _) = self.dims.unwrap_2d();
        let mut out = Vec::with_capacity(rows);
        for row in self.iter_first_axis() {
            out.push(crate::math::argmax(row));
        }
        out
    }
}

impl<T> AsRef<[T]> for Tensor<T> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        &self.data
    }
}

impl<T> AsMut<[T]> for Tensor<T> {
    #[inline]
    fn as_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Index<usize> for Tensor<T> {
    type Output = T;
    #[inline]
    fn index(&self, index: usize) -> &T {
        self.data.index(index)
    }
}

impl<T> IndexMut<usize> for Tensor<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        self.data.index_mut(index)
    }
}

impl<T: Debug> Debug for Tensor<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tensor{} ", self.dims)?;
        f.debug_list().entries(self.data.iter()).finish()
    }
}

#[cfg(any(test, feature = "approx"))]
mod tensor_approx {
    use super::Tensor;
    use approx::AbsDiffEq;
    use std::iter::zip;

    impl<T: AbsDiffEq> AbsDiffEq for Tensor<T>
    where
        T::Epsilon: Copy,
    {
        type Epsilon = T::Epsilon;

        fn default_epsilon() -> Self::Epsilon {
            T::default_epsilon()
        }

        fn abs_diff_eq(&self, other: &Tensor<T>, epsilon: Self::Epsilon) -> bool {
            self.dims() == other.dims()
                && zip(self.as_ref(), other.as_ref()).all(|(a, b)| T::abs_diff_eq(a, b, epsilon))
        }
    }
}

/// Literal constructor for small 1-D and 2-D tensors, mainly for tests.
#[macro_export]
macro_rules! tensor {
    ($([$($x:expr),* $(,)?]),+ $(,)?) => {{
        let rows: Vec<Vec<_>> = vec![$(vec![$($x),*]),+];
        let num_rows = rows.len();
        let num_cols = rows[0].len();
        let mut data = Vec::with_capacity(num_rows * num_cols);
        for row in rows {
            assert_eq!(row.len(), num_cols, "ragged tensor literal");
            data.extend(row);
        }
        $crate::tensor::Tensor::from_vec(data, $crate::tensor::Dims::D2(num_rows, num_cols))
    }};
    ($($x:expr),* $(,)?) => {
        $crate::tensor::Tensor::from_vec_1d(vec![$($x),*])
    };
}

#[cfg(test)]
mod test {
    use super::{Dims, Tensor};

    #[test]
    fn test_from_vec_and_reshape() {
        let t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], Dims::D2(2, 3));
        assert_eq!(t.len(), 6);
        let t = t.reshape(Dims::D3(3, 2, 1));
        assert_eq!(t.dims(), &Dims::D3(3, 2, 1));
        assert_eq!(t.as_ref(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    #[should_panic(expected = "cannot reshape")]
    fn test_reshape_size_mismatch() {
        let t = Tensor::from_vec(vec![0.0f32; 6], Dims::D2(2, 3));
        let _ = t.reshape(Dims::D2(2, 4));
    }

    #[test]
    fn test_macro() {
        let v = tensor![1.0f64, 2.0, 3.0];
        assert_eq!(v.dims(), &Dims::D1(3));
        let m = tensor![[1.0f64, 2.0], [3.0, 4.0], [5.0, 6.0]];
        assert_eq!(m.dims(), &Dims::D2(3, 2));
        assert_eq!(m.as_ref(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_slice_and_select_first_axis() {
        let t = Tensor::from_vec((0..12).map(|v| v as f32).collect(), Dims::D3(4, 3, 1));
        let s = t.slice_first_axis(1, 3);
        assert_eq!(s.dims(), &Dims::D3(2, 3, 1));
        assert_eq!(s.as_ref(), &[3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

        let p = t.select_first_axis(&[3, 0, 3]);
        assert_eq!(p.dims(), &Dims::D3(3, 3, 1));
        assert_eq!(p.as_ref(), &[9.0, 10.0, 11.0, 0.0, 1.0, 2.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_argmax_rows_ties_first() {
        let m = tensor![[0.0f32, 5.0, 5.0], [2.0, 1.0, 2.0]];
        assert_eq!(m.argmax_rows(), vec![1, 0]);
    }

    #[test]
    fn test_iter_first_axis() {
        let t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], Dims::D2(2, 2));
        let rows: Vec<&[f32]> = t.iter_first_axis().collect();
        assert_eq!(rows, vec![&[1.0, 2.0][..], &[3.0, 4.0][..]]);
    }
}
