use crate::error::Error;
use crate::math::{DTypeOps, column_sum};
use crate::tensor::{Dims, Tensor};

/// Spatial extent of a convolution (or pooling) output along one axis.
///
/// A result that would not be an integer means the kernel/stride/pad
/// combination does not tile the input and is rejected.
pub fn conv_output_size(
    input: usize,
    kernel: usize,
    pad: usize,
    stride: usize,
) -> Result<usize, Error> {
    if stride == 0 {
        return Err(Error::shape("convolution geometry", "stride must be positive"));
    }
    let padded = input + 2 * pad;
    if kernel == 0 || padded < kernel {
        return Err(Error::shape(
            "convolution geometry",
            format!("kernel size {kernel} does not fit the padded input {padded}"),
        ));
    }
    let span = padded - kernel;
    if span % stride != 0 {
        return Err(Error::shape(
            "convolution geometry",
            format!("({input} + 2*{pad} - {kernel}) is not divisible by stride {stride}"),
        ));
    }
    Ok(span / stride + 1)
}

/// Sliding-window linear transform over `(batch, channels, h, w)` maps.
///
/// Forward lowers every kernel-sized patch into a row of a 2-D matrix
/// (im2col) so the whole convolution becomes one gemm against the flattened
/// filters. The patch matrix is cached; backward reuses it for the weight
/// gradient and scatters the input gradient back through col2im, where
/// overlapping windows accumulate additively.
pub struct Convolution<T: DTypeOps> {
    w: Tensor<T>,
    b: Tensor<T>,
    stride: usize,
    pad: usize,
    dw: Tensor<T>,
    db: Tensor<T>,
    cache: Option<ConvCache<T>>,
}

struct ConvCache<T> {
    cols: Tensor<T>,
    input_dims: Dims,
    out_h: usize,
    out_w: usize,
}

impl<T: DTypeOps> Convolution<T> {
    /// `w` must be `(out_channels, in_channels, kernel_h, kernel_w)`,
    /// `b` `(out_channels,)`.
    pub fn new(w: Tensor<T>, b: Tensor<T>, stride: usize, pad: usize) -> Result<Self, Error> {
        let out_channels = match *w.dims() {
            Dims::D4(oc, ..) => oc,
            ref other => {
                return Err(Error::shape(
                    "convolution filters",
                    format!("expected 4-D filter weights, got {other}"),
                ));
            }
        };
        if b.dims() != &Dims::D1(out_channels) {
            return Err(Error::shape(
                "convolution bias",
                format!("expected ({out_channels},), got {}", b.dims()),
            ));
        }
        if stride == 0 {
            return Err(Error::shape("convolution geometry", "stride must be positive"));
        }
        let dw = Tensor::zeroed(*w.dims());
        let db = Tensor::zeroed(*b.dims());
        Ok(Convolution {
            w,
            b,
            stride,
            pad,
            dw,
            db,
            cache: None,
        })
    }

    pub fn forward(&mut self, x: Tensor<T>) -> Tensor<T> {
        let (n, c, h, w) = x.dims().unwrap_4d();
        let (out_c, in_c, kh, kw) = self.w.dims().unwrap_4d();
        assert_eq!(c, in_c, "input channel count does not match the filters");
        let out_h = match conv_output_size(h, kh, self.pad, self.stride) {
            Ok(size) => size,
            Err(e) => panic!("{e}"),
        };
        let out_w = match conv_output_size(w, kw, self.pad, self.stride) {
            Ok(size) => size,
            Err(e) => panic!("{e}"),
        };

        let cols = im2col(&x, kh, kw, self.stride, self.pad, out_h, out_w);
        let rows = n * out_h * out_w;
        let row_len = in_c * kh * kw;

        // (rows, out_c) = cols x filters^T, plus bias per row
        let mut scores = Tensor::zeroed(Dims::D2(rows, out_c));
        T::gemm(
            T::ONE,
            cols.as_ref(),
            (rows, row_len),
            false,
            self.w.as_ref(),
            (out_c, row_len),
            true,
            T::ZERO,
            scores.as_mut(),
            (rows, out_c),
        );
        for row in scores.iter_first_axis_mut() {
            for (v, &bias) in row.iter_mut().zip(self.b.as_ref()) {
                *v += bias;
            }
        }

        // (n, out_h, out_w, out_c) -> (n, out_c, out_h, out_w)
        let mut out = Tensor::zeroed(Dims::D4(n, out_c, out_h, out_w));
        let hw = out_h * out_w;
        let src = scores.as_ref();
        let dst = out.as_mut();
        for ni in 0..n {
            for p in 0..hw {
                let s = (ni * hw + p) * out_c;
                for oc in 0..out_c {
                    dst[(ni * out_c + oc) * hw + p] = src[s + oc];
                }
            }
        }

        self.cache = Some(ConvCache {
            cols,
            input_dims: *x.dims(),
            out_h,
            out_w,
        });
        out
    }

    pub fn backward(&mut self, dout: Tensor<T>) -> Tensor<T> {
        let cache = self.cache.as_ref().expect("backward called before forward");
        let (out_c, in_c, kh, kw) = self.w.dims().unwrap_4d();
        let n = cache.input_dims.first();
        assert_eq!(
            dout.dims(),
            &Dims::D4(n, out_c, cache.out_h, cache.out_w),
            "upstream gradient does not match the cached forward shape"
        );

        let hw = cache.out_h * cache.out_w;
        let rows = n * hw;
        let row_len = in_c * kh * kw;

        // (n, out_c, out_h, out_w) -> (rows, out_c)
        let mut dout2d = Tensor::zeroed(Dims::D2(rows, out_c));
        let src = dout.as_ref();
        let dst = dout2d.as_mut();
        for ni in 0..n {
            for p in 0..hw {
                let d = (ni * hw + p) * out_c;
                for oc in 0..out_c {
                    dst[d + oc] = src[(ni * out_c + oc) * hw + p];
                }
            }
        }

        column_sum(&dout2d, &mut self.db);

        // dW = dout2d^T x cols, landing directly in (out_c, row_len) layout
        T::gemm(
            T::ONE,
            dout2d.as_ref(),
            (rows, out_c),
            true,
            cache.cols.as_ref(),
            (rows, row_len),
            false,
            T::ZERO,
            self.dw.as_mut(),
            (out_c, row_len),
        );

        // d(cols) = dout2d x flattened filters
        let mut dcols = Tensor::zeroed(Dims::D2(rows, row_len));
        T::gemm(
            T::ONE,
            dout2d.as_ref(),
            (rows, out_c),
            false,
            self.w.as_ref(),
            (out_c, row_len),
            false,
            T::ZERO,
            dcols.as_mut(),
            (rows, row_len),
        );

        col2im(
            &dcols,
            cache.input_dims,
            kh,
            kw,
            self.stride,
            self.pad,
            cache.out_h,
            cache.out_w,
        )
    }

    pub fn weights(&self) -> &Tensor<T> {
        &self.w
    }

    pub fn bias(&self) -> &Tensor<T> {
        &self.b
    }

    pub(crate) fn param_grads(&mut self) -> [(&mut Tensor<T>, &Tensor<T>); 2] {
        let Convolution { w, b, dw, db, .. } = self;
        [(w, &*dw), (b, &*db)]
    }
}

/// Lower every stride-spaced `kh x kw` patch (across channels) into one row
/// of a `(batch * out_h * out_w, channels * kh * kw)` matrix. Out-of-bounds
/// positions are the zero padding.
fn im2col<T: DTypeOps>(
    x: &Tensor<T>,
    kh: usize,
    kw: usize,
    stride: usize,
    pad: usize,
    out_h: usize,
    out_w: usize,
) -> Tensor<T> {
    let (n, c, h, w) = x.dims().unwrap_4d();
    let row_len = c * kh * kw;
    let mut cols = Tensor::zeroed(Dims::D2(n * out_h * out_w, row_len));
    let src = x.as_ref();
    let dst = cols.as_mut();

    let mut r = 0;
    for ni in 0..n {
        for oy in 0..out_h {
            for ox in 0..out_w {
                let row = &mut dst[r * row_len..(r + 1) * row_len];
                let mut k = 0;
                for ci in 0..c {
                    let base = (ni * c + ci) * h * w;
                    for ky in 0..kh {
                        let y = (oy * stride + ky) as isize - pad as isize;
                        for kx in 0..kw {
                            let xp = (ox * stride + kx) as isize - pad as isize;
                            if y >= 0 && (y as usize) < h && xp >= 0 && (xp as usize) < w {
                                row[k] = src[base + y as usize * w + xp as usize];
                            }
                            k += 1;
                        }
                    }
                }
                r += 1;
            }
        }
    }
    cols
}

/// Inverse scatter of [`im2col`]: accumulate each patch row back into its
/// window. Overlap regions add up; padding positions are dropped.
fn col2im<T: DTypeOps>(
    cols: &Tensor<T>,
    input_dims: Dims,
    kh: usize,
    kw: usize,
    stride: usize,
    pad: usize,
    out_h: usize,
    out_w: usize,
) -> Tensor<T> {
    let (n, c, h, w) = input_dims.unwrap_4d();
    let row_len = c * kh * kw;
    assert_eq!(
        cols.dims(),
        &Dims::D2(n * out_h * out_w, row_len),
        "patch matrix does not match the target shape"
    );
    let mut x = Tensor::zeroed(input_dims);
    let src = cols.as_ref();
    let dst = x.as_mut();

    let mut r = 0;
    for ni in 0..n {
        for oy in 0..out_h {
            for ox in 0..out_w {
                let row = &src[r * row_len..(r + 1) * row_len];
                let mut k = 0;
                for ci in 0..c {
                    let base = (ni * c + ci) * h * w;
                    for ky in 0..kh {
                        let y = (oy * stride + ky) as isize - pad as isize;
                        for kx in 0..kw {
                            let xp = (ox * stride + kx) as isize - pad as isize;
                            if y >= 0 && (y as usize) < h && xp >= 0 && (xp as usize) < w {
                                dst[base + y as usize * w + xp as usize] += row[k];
                            }
                            k += 1;
                        }
                    }
                }
                r += 1;
            }
        }
    }
    x
}

#[cfg(test)]
mod test {
    use super::{Convolution, conv_output_size};
    use crate::layer::grad_check::{dot, numerical_grad};
    use crate::tensor::{Dims, Tensor};
    use approx::assert_abs_diff_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::StandardNormal;

    #[test]
    fn test_output_size() {
        assert_eq!(conv_output_size(28, 5, 0, 1).unwrap(), 24);
        assert_eq!(conv_output_size(5, 3, 1, 2).unwrap(), 3);
        assert!(conv_output_size(5, 3, 0, 0).is_err());
        assert!(conv_output_size(6, 3, 0, 2).is_err());
        assert!(conv_output_size(2, 5, 0, 1).is_err());
    }

    #[test]
    fn test_forward_known_values() {
        // identity-diagonal 2x2 kernel over a 3x3 input
        let w = Tensor::from_vec(vec![1.0, 0.0, 0.0, 1.0], Dims::D4(1, 1, 2, 2));
        let b = tensor![0.5];
        let mut conv = Convolution::new(w, b, 1, 0).unwrap();
        let x = Tensor::from_vec(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
            Dims::D4(1, 1, 3, 3),
        );
        let y = conv.forward(x);
        assert_eq!(y.dims(), &Dims::D4(1, 1, 2, 2));
        assert_abs_diff_eq!(
            y,
            Tensor::from_vec(vec![6.5, 8.5, 12.5, 14.5], Dims::D4(1, 1, 2, 2)),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_forward_padding() {
        // 3x3 kernel on a 1x1 input with pad 1: only the kernel centre sees data
        let w = Tensor::from_vec((1..=9).map(|v| v as f64).collect(), Dims::D4(1, 1, 3, 3));
        let b = tensor![0.0];
        let mut conv = Convolution::new(w, b, 1, 1).unwrap();
        let x = Tensor::from_vec(vec![2.0], Dims::D4(1, 1, 1, 1));
        let y = conv.forward(x);
        assert_eq!(y.dims(), &Dims::D4(1, 1, 1, 1));
        assert_abs_diff_eq!(y[0], 10.0, epsilon = 1e-12);
    }

    #[test]
    #[should_panic(expected = "not divisible by stride")]
    fn test_forward_rejects_untileable_input() {
        let w: Tensor<f64> = Tensor::zeroed(Dims::D4(1, 1, 3, 3));
        let b = Tensor::zeroed(Dims::D1(1));
        let mut conv = Convolution::new(w, b, 2, 0).unwrap();
        let _ = conv.forward(Tensor::zeroed(Dims::D4(1, 1, 6, 6)));
    }

    fn random_tensor(rng: &mut StdRng, dims: Dims) -> Tensor<f64> {
        Tensor::from_distribution(rng, StandardNormal, dims)
    }

    fn check_gradients(stride: usize, pad: usize, h: usize, w: usize) {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let w0 = random_tensor(&mut rng, Dims::D4(3, 2, 3, 3));
        let b0 = random_tensor(&mut rng, Dims::D1(3));
        let x0 = random_tensor(&mut rng, Dims::D4(2, 2, h, w));

        let mut conv = Convolution::new(w0.clone(), b0.clone(), stride, pad).unwrap();
        let y = conv.forward(x0.clone());
        let upstream = random_tensor(&mut rng, *y.dims());
        let dx = conv.backward(upstream.clone());
        let [(_, dw), (_, db)] = conv.param_grads();
        let (dw, db) = (dw.clone(), db.clone());

        let loss = |wt: &Tensor<f64>, bt: &Tensor<f64>, xt: &Tensor<f64>| {
            let mut probe = Convolution::new(wt.clone(), bt.clone(), stride, pad).unwrap();
            let y = probe.forward(xt.clone());
            dot(y.as_ref(), upstream.as_ref())
        };

        let num_dw = numerical_grad(&w0, |wt| loss(wt, &b0, &x0));
        let num_db = numerical_grad(&b0, |bt| loss(&w0, bt, &x0));
        let num_dx = numerical_grad(&x0, |xt| loss(&w0, &b0, xt));

        assert_abs_diff_eq!(dw, num_dw, epsilon = 1e-6);
        assert_abs_diff_eq!(db, num_db, epsilon = 1e-6);
        assert_abs_diff_eq!(dx, num_dx, epsilon = 1e-6);
    }

    #[test]
    fn test_gradients_stride_1_no_pad() {
        check_gradients(1, 0, 5, 5);
    }

    #[test]
    fn test_gradients_stride_2_with_pad() {
        // (5 + 2 - 3) / 2 + 1 = 3, with overlapping receptive fields
        check_gradients(2, 1, 5, 5);
    }

    #[test]
    fn test_gradients_rectangular_input() {
        check_gradients(1, 1, 4, 6);
    }
}
