use crate::dtype::DType;
use crate::net::ParamGrad;
use crate::optim::Optimizer;
use crate::tensor::Tensor;
use std::collections::HashMap;
use std::iter::zip;

/// Adam update rule (Kingma & Ba, 2014), in the in-place formulation
/// `m += (1-b1)(g-m)`, `v += (1-b2)(g^2-v)` with the bias correction folded
/// into a per-step learning rate.
///
/// Moment tensors are zero-initialized lazily on the first update and keyed
/// like the parameter view; a single step counter covers the whole
/// parameter set.
pub struct Adam<T: DType> {
    lr: T,
    beta1: T,
    beta2: T,
    eps: T,
    iter: i32,
    moments: HashMap<&'static str, Moments<T>>,
}

struct Moments<T> {
    m: Tensor<T>,
    v: Tensor<T>,
}

impl<T: DType> Adam<T> {
    pub fn new(lr: T) -> Self {
        Adam {
            lr,
            beta1: T::from_f64(0.9),
            beta2: T::from_f64(0.999),
            eps: T::from_f64(1e-7),
            iter: 0,
            moments: HashMap::new(),
        }
    }
}

impl<T: DType> Optimizer<T> for Adam<T> {
    fn update(&mut self, params: &mut [ParamGrad<'_, T>]) {
        self.iter += 1;
        let lr_t = self.lr * (T::ONE - self.beta2.powi(self.iter)).sqrt()
            / (T::ONE - self.beta1.powi(self.iter));

        for entry in params.iter_mut() {
            assert_eq!(
                entry.param.dims(),
                entry.grad.dims(),
                "gradient shape does not match parameter {}",
                entry.key
            );
            let state = self.moments.entry(entry.key).or_insert_with(|| Moments {
                m: Tensor::zeroed(*entry.param.dims()),
                v: Tensor::zeroed(*entry.param.dims()),
            });
            assert_eq!(
                state.m.dims(),
                entry.param.dims(),
                "moment state shape drifted for {}",
                entry.key
            );

            let one_minus_b1 = T::ONE - self.beta1;
            let one_minus_b2 = T::ONE - self.beta2;
            for (((p, &g), m), v) in zip(
                zip(
                    zip(entry.param.as_mut().iter_mut(), entry.grad.as_ref()),
                    state.m.as_mut().iter_mut(),
                ),
                state.v.as_mut().iter_mut(),
            ) {
                *m += one_minus_b1 * (g - *m);
                *v += one_minus_b2 * (g * g - *v);
                *p -= lr_t * *m / (v.sqrt() + self.eps);
            }
        }
    }
}
