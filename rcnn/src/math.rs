use crate::dtype::DType;
use crate::tensor::Tensor;

/// Scalars that can drive the `matrixmultiply` gemm kernels.
pub trait DTypeOps: DType {
    /// `c = alpha * op(a) x op(b) + beta * c`, where `op` is an optional
    /// transpose expressed through the row/column strides.
    fn gemm(
        alpha: Self,
        a: &[Self],
        a_dims: (usize, usize),
        ta: bool,
        b: &[Self],
        b_dims: (usize, usize),
        tb: bool,
        beta: Self,
        c: &mut [Self],
        c_dims: (usize, usize),
    );
}

macro_rules! implement_dtype_ops {
    ($t:ident, $g:ident) => {
        impl DTypeOps for $t {
            fn gemm(
                alpha: Self,
                a: &[Self],
                a_dims: (usize, usize),
                ta: bool,
                b: &[Self],
                b_dims: (usize, usize),
                tb: bool,
                beta: Self,
                c: &mut [Self],
                c_dims: (usize, usize),
            ) {
                let (a_rows, a_cols) = a_dims;
                let (b_rows, b_cols) = b_dims;
                assert_eq!(a.len(), a_rows * a_cols, "lhs data does not match dims");
                assert_eq!(b.len(), b_rows * b_cols, "rhs data does not match dims");
                let (m, k, rsa, csa) = if ta {
                    (a_cols, a_rows, 1, a_cols as isize)
                } else {
                    (a_rows, a_cols, a_cols as isize, 1)
                };
                let n = if tb {
                    assert_eq!(b_cols, k, "inner dimensions do not agree");
                    b_rows
                } else {
                    assert_eq!(b_rows, k, "inner dimensions do not agree");
                    b_cols
                };
                let (rsb, csb) = if tb { (1, b_cols as isize) } else { (b_cols as isize, 1) };
                assert_eq!(c_dims, (m, n), "output dims do not match product");
                assert_eq!(c.len(), m * n, "output data does not match dims");
                unsafe {
                    matrixmultiply::$g(
                        m,
                        k,
                        n,
                        alpha,
                        a.as_ptr(),
                        rsa,
                        csa,
                        b.as_ptr(),
                        rsb,
                        csb,
                        beta,
                        c.as_mut_ptr(),
                        n as isize,
                        1,
                    );
                }
            }
        }
    };
}

implement_dtype_ops!(f32, sgemm);
implement_dtype_ops!(f64, dgemm);

/// 2-D tensor convenience wrapper around [`DTypeOps::gemm`].
#[track_caller]
pub fn matmul<T: DTypeOps>(
    alpha: T,
    a: &Tensor<T>,
    ta: bool,
    b: &Tensor<T>,
    tb: bool,
    beta: T,
    c: &mut Tensor<T>,
) {
    let a_dims = a.dims().unwrap_2d();
    let b_dims = b.dims().unwrap_2d();
    let c_dims = c.dims().unwrap_2d();
    T::gemm(
        alpha,
        a.as_ref(),
        a_dims,
        ta,
        b.as_ref(),
        b_dims,
        tb,
        beta,
        c.as_mut(),
        c_dims,
    );
}

/// `b[j] = sum over rows of a[.., j]`, overwriting `b`.
#[track_caller]
pub fn column_sum<T: DType>(a: &Tensor<T>, b: &mut Tensor<T>) {
    let (_, cols) = a.dims().unwrap_2d();
    assert_eq!(b.len(), cols, "column sum output has wrong length");
    b.fill_zero();
    let out = b.as_mut();
    for row in a.iter_first_axis() {
        for (acc, &v) in out.iter_mut().zip(row) {
            *acc += v;
        }
    }
}

/// Index of the maximum element. Ties resolve to the first occurrence.
#[track_caller]
pub fn argmax<T: PartialOrd>(values: &[T]) -> usize {
    assert!(!values.is_empty(), "argmax of an empty slice");
    let mut best = 0;
    for i in 1..values.len() {
        if values[i] > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tensor::Dims;

    macro_rules! assert_slice_equal {
        ($a:expr, $b:expr) => {{
            let a = $a;
            let b = $b;
            assert_eq!(a.len(), b.len(), "lengths differ: {:?} vs {:?}", a, b);
            for (i, (x, y)) in std::iter::zip(a.iter(), b.iter()).enumerate() {
                assert!(
                    (x - y).abs() <= 1e-5,
                    "mismatch at index {i}: {:?} vs {:?}",
                    a,
                    b
                );
            }
        }};
    }

    #[test]
    fn test_matmul() {
        let a = tensor![[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let b = tensor![[7.0f32, 8.0], [9.0, 10.0], [11.0, 12.0]];
        let mut c = Tensor::zeroed(Dims::D2(2, 2));

        matmul(1.0, &a, false, &b, false, 0.0, &mut c);
        assert_slice_equal!(c.as_ref(), [58.0, 64.0, 139.0, 154.0]);

        // beta keeps a scaled copy of the previous contents
        matmul(1.0, &a, false, &b, false, 1.0, &mut c);
        assert_slice_equal!(c.as_ref(), [116.0, 128.0, 278.0, 308.0]);
    }

    #[test]
    fn test_matmul_transpose_a() {
        let a = tensor![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let b = tensor![[1.0f32, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let mut c = Tensor::zeroed(Dims::D2(2, 2));
        matmul(1.0, &a, true, &b, false, 0.0, &mut c);
        assert_slice_equal!(c.as_ref(), [6.0, 8.0, 8.0, 10.0]);
    }

    #[test]
    fn test_matmul_transpose_b() {
        let a = tensor![[1.0f64, 2.0, 3.0]];
        let b = tensor![[1.0f64, 1.0, 1.0], [0.0, 2.0, 0.0]];
        let mut c = Tensor::zeroed(Dims::D2(1, 2));
        matmul(1.0, &a, false, &b, true, 0.0, &mut c);
        assert_slice_equal!(c.as_ref(), [6.0, 4.0]);
    }

    #[test]
    fn test_column_sum() {
        let a = tensor![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let mut b = Tensor::zeroed(Dims::D1(2));
        column_sum(&a, &mut b);
        assert_slice_equal!(b.as_ref(), [9.0, 12.0]);
    }

    #[test]
    fn test_argmax_first_occurrence() {
        assert_eq!(argmax(&[1.0f32, 3.0, 3.0, 2.0]), 1);
        assert_eq!(argmax(&[-2.0f64, -1.0, -5.0]), 1);
        assert_eq!(argmax(&[4.0f32]), 0);
    }
}
