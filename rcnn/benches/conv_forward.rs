#[macro_use]
extern crate bencher;

use bencher::Bencher;
use rcnn::math::{DTypeOps, matmul};
use rcnn::net::{ConvNet, ConvNetConfig, HeInitializer};
use rcnn::tensor::{Dims, Tensor};
use rcnn::util::bench::*;

macro_rules! impl_matmul_bench {
    ($name:ident, $ty:ty, $size:expr) => {
        fn $name(bench: &mut Bencher) {
            let [a, b, mut c] = get_square_matrices::<$ty>($size);
            bench.iter(|| matmul(1.0, &a, false, &b, false, 0.0, &mut c))
        }
    };
}

impl_matmul_bench!(matmul_f32_lg, f32, SIZE_LG);
impl_matmul_bench!(matmul_f32_md, f32, SIZE_MD);
impl_matmul_bench!(matmul_f32_sm, f32, SIZE_SM);
impl_matmul_bench!(matmul_f64_md, f64, SIZE_MD);
benchmark_group!(matmul, matmul_f32_lg, matmul_f32_md, matmul_f32_sm, matmul_f64_md);

fn mnist_net<T: DTypeOps>() -> ConvNet<T> {
    ConvNet::new(
        &ConvNetConfig::default(),
        &mut HeInitializer::seed_from_u64(0xf1234567),
    )
    .unwrap()
}

fn predict_batch_100(bench: &mut Bencher) {
    let mut net = mnist_net::<f32>();
    let x = get_image_batch::<f32>(100);
    bench.iter(|| net.predict(&x));
}

fn gradient_batch_100(bench: &mut Bencher) {
    let mut net = mnist_net::<f32>();
    let x = get_image_batch::<f32>(100);
    let t: Tensor<f32> = Tensor::from_vec((0..100).map(|i| (i % 10) as f32).collect(), Dims::D1(100));
    bench.iter(|| net.gradient(&x, &t));
}

benchmark_group!(network, predict_batch_100, gradient_batch_100);

benchmark_main!(matmul, network);
