mod adam;
mod sgd;

pub use adam::Adam;
pub use sgd::Sgd;

use crate::dtype::DType;
use crate::net::ParamGrad;

/// Parameter update rule. One `update` call consumes the flat
/// parameter/gradient view of a single minibatch step and mutates every
/// parameter tensor in place; stateful rules key their statistics by the
/// entries' names and keep them for the optimizer's lifetime.
pub trait Optimizer<T: DType> {
    fn update(&mut self, params: &mut [ParamGrad<'_, T>]);
}
