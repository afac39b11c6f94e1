//! CPU training engine for a small convolutional classifier, built from
//! the layer math up: im2col convolution, max pooling, affine stages, a
//! fused softmax+cross-entropy loss, and Adam/SGD update rules. No
//! autodiff; every layer owns its analytic backward pass.

#[macro_use]
pub mod tensor;

pub mod dtype;
pub mod error;
pub mod layer;
pub mod math;
pub mod net;
pub mod optim;
pub mod util;
