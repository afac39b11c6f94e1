use crate::dtype::DType;
use crate::tensor::{Dims, Tensor};

/// Spatial max pooling over strided windows, no padding.
///
/// Forward memoizes, per output position, the flat index of the window
/// maximum (first occurrence wins on ties) so backward can route the whole
/// upstream gradient to exactly that element. Scatter accumulates with
/// `+=`, so windows overlapping under `stride < pool` stay correct.
pub struct Pooling {
    pool_h: usize,
    pool_w: usize,
    stride: usize,
    cache: Option<PoolCache>,
}

struct PoolCache {
    input_dims: Dims,
    arg_max: Vec<usize>,
}

impl Pooling {
    pub fn new(pool_h: usize, pool_w: usize, stride: usize) -> Self {
        assert!(pool_h > 0 && pool_w > 0, "pool window must be non-empty");
        assert!(stride > 0, "pool stride must be positive");
        Pooling {
            pool_h,
            pool_w,
            stride,
            cache: None,
        }
    }

    fn output_size(&self, h: usize, w: usize) -> (usize, usize) {
        assert!(
            h >= self.pool_h && w >= self.pool_w,
            "input ({h}, {w}) is smaller than the pool window"
        );
        (
            (h - self.pool_h) / self.stride + 1,
            (w - self.pool_w) / self.stride + 1,
        )
    }

    pub fn forward<T: DType>(&mut self, x: Tensor<T>) -> Tensor<T> {
        let (n, c, h, w) = x.dims().unwrap_4d();
        let (out_h, out_w) = self.output_size(h, w);
        let mut out = Tensor::zeroed(Dims::D4(n, c, out_h, out_w));
        let mut arg_max = Vec::with_capacity(out.len());

        let src = x.as_ref();
        let dst = out.as_mut();
        let mut oi = 0;
        for ni in 0..n {
            for ci in 0..c {
                let base = (ni * c + ci) * h * w;
                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let y0 = oy * self.stride;
                        let x0 = ox * self.stride;
                        let mut best = src[base + y0 * w + x0];
                        let mut best_idx = 0;
                        for ky in 0..self.pool_h {
                            for kx in 0..self.pool_w {
                                let v = src[base + (y0 + ky) * w + (x0 + kx)];
                                if v > best {
                                    best = v;
                                    best_idx = ky * self.pool_w + kx;
                                }
                            }
                        }
                        dst[oi] = best;
                        arg_max.push(best_idx);
                        oi += 1;
                    }
                }
            }
        }

        self.cache = Some(PoolCache {
            input_dims: *x.dims(),
            arg_max,
        });
        out
    }

    pub fn backward<T: DType>(&mut self, dout: Tensor<T>) -> Tensor<T> {
        let cache = self.cache.as_ref().expect("backward called before forward");
        let (n, c, h, w) = cache.input_dims.unwrap_4d();
        let (out_h, out_w) = self.output_size(h, w);
        assert_eq!(
            dout.dims(),
            &Dims::D4(n, c, out_h, out_w),
            "upstream gradient does not match the cached input shape"
        );

        let mut dx = Tensor::zeroed(cache.input_dims);
        let src = dout.as_ref();
        let dst = dx.as_mut();
        let mut oi = 0;
        for ni in 0..n {
            for ci in 0..c {
                let base = (ni * c + ci) * h * w;
                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let idx = cache.arg_max[oi];
                        let ky = idx / self.pool_w;
                        let kx = idx % self.pool_w;
                        let y = oy * self.stride + ky;
                        let x = ox * self.stride + kx;
                        dst[base + y * w + x] += src[oi];
                        oi += 1;
                    }
                }
            }
        }
        dx
    }
}

#[cfg(test)]
mod test {
    use super::Pooling;
    use crate::tensor::{Dims, Tensor};

    fn input_2x2_windows() -> Tensor<f64> {
        // one sample, one channel, 4x4
        Tensor::from_vec(
            vec![
                1.0, 5.0, 2.0, 1.0, //
                3.0, 2.0, 0.0, 4.0, //
                7.0, 0.0, 1.0, 1.0, //
                0.0, 6.0, 1.0, 9.0,
            ],
            Dims::D4(1, 1, 4, 4),
        )
    }

    #[test]
    fn test_forward_max_per_window() {
        let mut pool = Pooling::new(2, 2, 2);
        let y = pool.forward(input_2x2_windows());
        assert_eq!(y.dims(), &Dims::D4(1, 1, 2, 2));
        assert_eq!(y.as_ref(), &[5.0, 4.0, 7.0, 9.0]);
    }

    #[test]
    fn test_backward_routes_to_argmax_only() {
        let mut pool = Pooling::new(2, 2, 2);
        let _ = pool.forward(input_2x2_windows());
        let dout = Tensor::from_vec(vec![1.0, 2.0, 3.0, 4.0], Dims::D4(1, 1, 2, 2));
        let dx = pool.backward(dout);
        assert_eq!(
            dx.as_ref(),
            &[
                0.0, 1.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 2.0, //
                3.0, 0.0, 0.0, 0.0, //
                0.0, 0.0, 0.0, 4.0
            ]
        );
    }

    #[test]
    fn test_tie_resolves_to_first_in_scan_order() {
        let mut pool = Pooling::new(2, 2, 2);
        let x = Tensor::from_vec(vec![3.0f64, 3.0, 3.0, 3.0], Dims::D4(1, 1, 2, 2));
        let _ = pool.forward(x);
        let dx = pool.backward(Tensor::from_vec(vec![8.0f64], Dims::D4(1, 1, 1, 1)));
        assert_eq!(dx.as_ref(), &[8.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_overlapping_windows_accumulate() {
        // stride 1 with a 2x2 window: the centre element wins every window
        let mut pool = Pooling::new(2, 2, 1);
        let x = Tensor::from_vec(
            vec![
                0.0f64, 0.0, 0.0, //
                0.0, 9.0, 0.0, //
                0.0, 0.0, 0.0,
            ],
            Dims::D4(1, 1, 3, 3),
        );
        let y = pool.forward(x);
        assert_eq!(y.as_ref(), &[9.0, 9.0, 9.0, 9.0]);
        let dx = pool.backward(Tensor::filled(1.0f64, Dims::D4(1, 1, 2, 2)));
        assert_eq!(
            dx.as_ref(),
            &[
                0.0, 0.0, 0.0, //
                0.0, 4.0, 0.0, //
                0.0, 0.0, 0.0
            ]
        );
    }

    #[test]
    fn test_channels_pool_independently() {
        let mut pool = Pooling::new(2, 2, 2);
        let x = Tensor::from_vec(
            vec![
                1.0f64, 2.0, 3.0, 4.0, // channel 0
                8.0, 7.0, 6.0, 5.0, // channel 1
            ],
            Dims::D4(1, 2, 2, 2),
        );
        let y = pool.forward(x);
        assert_eq!(y.dims(), &Dims::D4(1, 2, 1, 1));
        assert_eq!(y.as_ref(), &[4.0, 8.0]);
    }
}
