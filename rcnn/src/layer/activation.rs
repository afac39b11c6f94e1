use crate::dtype::DType;
use crate::tensor::Tensor;

/// Rectified linear unit. The only state is the positivity mask of the
/// last forward call, which the paired backward consumes; the next forward
/// overwrites it.
pub struct Relu {
    mask: Vec<bool>,
}

impl Relu {
    pub fn new() -> Self {
        Relu { mask: Vec::new() }
    }

    pub fn forward<T: DType>(&mut self, mut x: Tensor<T>) -> Tensor<T> {
        self.mask.clear();
        self.mask.extend(x.as_ref().iter().map(|&v| v > T::ZERO));
        for v in x.as_mut() {
            if *v <= T::ZERO {
                *v = T::ZERO;
            }
        }
        x
    }

    pub fn backward<T: DType>(&mut self, mut dout: Tensor<T>) -> Tensor<T> {
        assert_eq!(
            dout.len(),
            self.mask.len(),
            "upstream gradient does not match the cached activation mask"
        );
        for (v, &positive) in dout.as_mut().iter_mut().zip(&self.mask) {
            if !positive {
                *v = T::ZERO;
            }
        }
        dout
    }
}

impl Default for Relu {
    fn default() -> Self {
        Relu::new()
    }
}
