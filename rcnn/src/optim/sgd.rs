use crate::dtype::DType;
use crate::net::ParamGrad;
use crate::optim::Optimizer;

/// Plain stochastic gradient descent: `p -= lr * g`. Stateless.
pub struct Sgd<T: DType> {
    lr: T,
}

impl<T: DType> Sgd<T> {
    pub fn new(lr: T) -> Self {
        Sgd { lr }
    }
}

impl<T: DType> Optimizer<T> for Sgd<T> {
    fn update(&mut self, params: &mut [ParamGrad<'_, T>]) {
        for entry in params.iter_mut() {
            assert_eq!(
                entry.param.dims(),
                entry.grad.dims(),
                "gradient shape does not match parameter {}",
                entry.key
            );
            for (p, &g) in entry.param.as_mut().iter_mut().zip(entry.grad.as_ref()) {
                *p -= self.lr * g;
            }
        }
    }
}
