use crate::dtype::DType;
use crate::tensor::{Dims, Tensor};

/// Softmax followed by cross-entropy, fused into one terminal layer.
///
/// The backward pass uses the analytic `(y - t) / batch` form of the joint
/// derivative instead of chaining a softmax backward into a loss backward;
/// the fused form never divides by a near-zero probability.
pub struct SoftmaxWithLoss<T: DType> {
    cache: Option<LossCache<T>>,
}

struct LossCache<T> {
    probs: Tensor<T>,
    target: Tensor<T>,
}

impl<T: DType> SoftmaxWithLoss<T> {
    pub fn new() -> Self {
        SoftmaxWithLoss { cache: None }
    }

    /// Average cross-entropy of `scores` against `target`.
    ///
    /// `target` is either a one-hot matrix shaped like `scores` or a 1-D
    /// vector of class indices; the rank decides the branch.
    pub fn forward(&mut self, scores: Tensor<T>, target: &Tensor<T>) -> T {
        let (rows, cols) = scores.dims().unwrap_2d();
        assert!(rows > 0, "cannot compute a loss over an empty batch");

        let mut probs = scores;
        for row in probs.iter_first_axis_mut() {
            softmax_row(row);
        }

        // guard against ln(0) from a fully saturated row
        let eps = T::from_f64(1e-7);
        let mut total = T::ZERO;
        match *target.dims() {
            Dims::D2(t_rows, t_cols) => {
                assert_eq!(
                    (rows, cols),
                    (t_rows, t_cols),
                    "one-hot target shape does not match the scores"
                );
                for (p_row, t_row) in probs.iter_first_axis().zip(target.iter_first_axis()) {
                    for (&p, &t) in p_row.iter().zip(t_row) {
                        total -= t * (p + eps).ln();
                    }
                }
            }
            Dims::D1(t_rows) => {
                assert_eq!(rows, t_rows, "label count does not match the batch size");
                for (p_row, label) in probs.iter_first_axis().zip(target.as_ref()) {
                    let class = DType::to_usize(*label);
                    assert!(class < cols, "label {class} out of range for {cols} classes");
                    total -= (p_row[class] + eps).ln();
                }
            }
            ref other => panic!("unsupported target rank {other}"),
        }

        let loss = total / T::from_usize(rows);
        self.cache = Some(LossCache {
            probs,
            target: target.clone(),
        });
        loss
    }

    /// Gradient of the averaged loss with respect to the raw scores, for a
    /// unit upstream gradient.
    pub fn backward(&mut self) -> Tensor<T> {
        let cache = self.cache.as_ref().expect("backward called before forward");
        let (rows, cols) = cache.probs.dims().unwrap_2d();
        let scale = T::ONE / T::from_usize(rows);

        let mut dx = cache.probs.clone();
        match *cache.target.dims() {
            Dims::D2(..) => {
                for (d, &t) in dx.as_mut().iter_mut().zip(cache.target.as_ref()) {
                    *d = (*d - t) * scale;
                }
            }
            Dims::D1(..) => {
                for (i, label) in cache.target.as_ref().iter().enumerate() {
                    dx[i * cols + DType::to_usize(*label)] -= T::ONE;
                }
                for d in dx.as_mut() {
                    *d *= scale;
                }
            }
            ref other => panic!("unsupported target rank {other}"),
        }
        dx
    }
}

impl<T: DType> Default for SoftmaxWithLoss<T> {
    fn default() -> Self {
        SoftmaxWithLoss::new()
    }
}

/// In-place numerically stable softmax of one row: shift by the row max
/// before exponentiating so the largest exponent is exactly zero.
fn softmax_row<T: DType>(row: &mut [T]) {
    let mut max = row[0];
    for &v in row.iter() {
        if v > max {
            max = v;
        }
    }
    let mut sum = T::ZERO;
    for v in row.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in row.iter_mut() {
        *v /= sum;
    }
}
