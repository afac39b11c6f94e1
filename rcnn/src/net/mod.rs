mod init;
mod params;

pub use init::HeInitializer;
pub use params::ParamGrad;

use crate::error::Error;
use crate::layer::{Affine, Convolution, Layer, Pooling, Relu, SoftmaxWithLoss, conv_output_size};
use crate::math::DTypeOps;
use crate::tensor::{Dims, Tensor};

const POOL_SIZE: usize = 2;
const POOL_STRIDE: usize = 2;

/// Construction-time description of the fixed topology. The defaults are
/// the canonical MNIST configuration.
#[derive(Clone, Debug)]
pub struct ConvNetConfig {
    /// Input as `(channels, height, width)`.
    pub input_dim: (usize, usize, usize),
    pub filter_num: usize,
    pub filter_size: usize,
    pub pad: usize,
    pub stride: usize,
    pub hidden_size: usize,
    pub output_size: usize,
}

impl Default for ConvNetConfig {
    fn default() -> Self {
        ConvNetConfig {
            input_dim: (1, 28, 28),
            filter_num: 30,
            filter_size: 5,
            pad: 0,
            stride: 1,
            hidden_size: 100,
            output_size: 10,
        }
    }
}

/// Convolutional classifier with the fixed stack
/// Conv -> Relu -> Pool -> Affine -> Relu -> Affine -> Relu -> Affine,
/// terminated by a softmax+cross-entropy loss layer.
///
/// Exactly one forward/backward pair may be in flight at a time: every
/// stateful layer keeps a single forward's cache, which the next forward
/// overwrites. Parameters are only ever mutated through the flat
/// [`ParamGrad`] view handed to an optimizer.
pub struct ConvNet<T: DTypeOps> {
    layers: Vec<Layer<T>>,
    last_layer: SoftmaxWithLoss<T>,
}

const PARAM_KEYS: [(&str, &str); 4] = [("W1", "b1"), ("W2", "b2"), ("W3", "b3"), ("W4", "b4")];

impl<T: DTypeOps> ConvNet<T> {
    pub fn new(config: &ConvNetConfig, init: &mut HeInitializer) -> Result<Self, Error> {
        let (channels, height, width) = config.input_dim;
        if channels == 0 || height == 0 || width == 0 {
            return Err(Error::shape(
                "network construction",
                format!("input dimensions must be positive, got {:?}", config.input_dim),
            ));
        }
        if config.output_size == 0 || config.hidden_size == 0 || config.filter_num == 0 {
            return Err(Error::shape(
                "network construction",
                "layer widths must be positive",
            ));
        }

        let conv_h = conv_output_size(height, config.filter_size, config.pad, config.stride)?;
        let conv_w = conv_output_size(width, config.filter_size, config.pad, config.stride)?;
        let pool_h = conv_output_size(conv_h, POOL_SIZE, 0, POOL_STRIDE)?;
        let pool_w = conv_output_size(conv_w, POOL_SIZE, 0, POOL_STRIDE)?;
        let pool_features = config.filter_num * pool_h * pool_w;

        let conv_fan_in = channels * config.filter_size * config.filter_size;
        let w1 = init.weights(
            Dims::D4(config.filter_num, channels, config.filter_size, config.filter_size),
            conv_fan_in,
        );
        let b1 = init.biases(Dims::D1(config.filter_num));
        let w2 = init.weights(Dims::D2(pool_features, config.hidden_size), pool_features);
        let b2 = init.biases(Dims::D1(config.hidden_size));
        let w3 = init.weights(Dims::D2(config.hidden_size, config.hidden_size), config.hidden_size);
        let b3 = init.biases(Dims::D1(config.hidden_size));
        let w4 = init.weights(Dims::D2(config.hidden_size, config.output_size), config.hidden_size);
        let b4 = init.biases(Dims::D1(config.output_size));

        let layers = vec![
            Layer::Convolution(Convolution::new(w1, b1, config.stride, config.pad)?),
            Layer::Relu(Relu::new()),
            Layer::Pooling(Pooling::new(POOL_SIZE, POOL_SIZE, POOL_STRIDE)),
            Layer::Affine(Affine::new(w2, b2)?),
            Layer::Relu(Relu::new()),
            Layer::Affine(Affine::new(w3, b3)?),
            Layer::Relu(Relu::new()),
            Layer::Affine(Affine::new(w4, b4)?),
        ];

        Ok(ConvNet {
            layers,
            last_layer: SoftmaxWithLoss::new(),
        })
    }

    /// Raw class scores for a `(batch, channels, h, w)` input.
    pub fn predict(&mut self, x: &Tensor<T>) -> Tensor<T> {
        let mut out = x.clone();
        for layer in self.layers.iter_mut() {
            out = layer.forward(out);
        }
        out
    }

    /// Scalar average loss of the batch against `target`.
    pub fn loss(&mut self, x: &Tensor<T>, target: &Tensor<T>) -> T {
        let scores = self.predict(x);
        self.last_layer.forward(scores, target)
    }

    /// Fraction of exactly matched predictions, evaluated in whole
    /// `batch_size` chunks. Remainder samples that do not fill a chunk are
    /// dropped, while the divisor stays the full sample count.
    pub fn accuracy(&mut self, x: &Tensor<T>, target: &Tensor<T>, batch_size: usize) -> f64 {
        assert!(batch_size > 0, "batch size must be positive");
        let total = x.dims().first();
        assert_eq!(
            target.dims().first(),
            total,
            "sample and label counts differ"
        );

        let labels: Vec<usize> = if target.ndim() != 1 {
            target.argmax_rows()
        } else {
            target.as_ref().iter().map(|v| crate::dtype::DType::to_usize(*v)).collect()
        };

        let mut correct = 0;
        for chunk in 0..(total / batch_size) {
            let start = chunk * batch_size;
            let end = start + batch_size;
            let scores = self.predict(&x.slice_first_axis(start, end));
            correct += scores
                .argmax_rows()
                .into_iter()
                .zip(&labels[start..end])
                .filter(|&(predicted, &label)| predicted == label)
                .count();
        }
        correct as f64 / total as f64
    }

    /// One full forward/backward pass: runs `loss` to populate every
    /// layer cache, then walks the layers in exact reverse order so each
    /// parametric layer stores its fresh `dW`/`db`. Returns the loss.
    ///
    /// Collected gradients are overwritten wholesale on every call; nothing
    /// accumulates across minibatches.
    pub fn gradient(&mut self, x: &Tensor<T>, target: &Tensor<T>) -> T {
        let loss = self.loss(x, target);
        let mut dout = self.last_layer.backward();
        for layer in self.layers.iter_mut().rev() {
            dout = layer.backward(dout);
        }
        loss
    }

    /// Flat read-only view of the parameters, in key order.
    pub fn params(&self) -> Vec<(&'static str, &Tensor<T>)> {
        let mut out = Vec::with_capacity(2 * PARAM_KEYS.len());
        let mut index = 0;
        for layer in self.layers.iter() {
            let (w, b) = match layer {
                Layer::Convolution(conv) => (conv.weights(), conv.bias()),
                Layer::Affine(affine) => (affine.weights(), affine.bias()),
                _ => continue,
            };
            let (w_key, b_key) = PARAM_KEYS[index];
            index += 1;
            out.push((w_key, w));
            out.push((b_key, b));
        }
        out
    }

    /// Flat mutable parameter view zipped with the gradients of the last
    /// `gradient` call, for an optimizer to walk.
    pub fn params_and_grads(&mut self) -> Vec<ParamGrad<'_, T>> {
        let mut out = Vec::with_capacity(2 * PARAM_KEYS.len());
        let mut index = 0;
        for layer in self.layers.iter_mut() {
            let pairs = match layer {
                Layer::Convolution(conv) => conv.param_grads(),
                Layer::Affine(affine) => affine.param_grads(),
                _ => continue,
            };
            let (w_key, b_key) = PARAM_KEYS[index];
            index += 1;
            let [(w, dw), (b, db)] = pairs;
            out.push(ParamGrad {
                key: w_key,
                param: w,
                grad: dw,
            });
            out.push(ParamGrad {
                key: b_key,
                param: b,
                grad: db,
            });
        }
        out
    }
}
