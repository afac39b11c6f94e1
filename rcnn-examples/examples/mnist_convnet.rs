use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rcnn::net::{ConvNet, ConvNetConfig, HeInitializer};
use rcnn::optim::{Adam, Optimizer};
use rcnn_examples::util::{MnistData, load_mnist_data};
use std::time::Instant;

const MAX_ITERS: usize = 10_000;
const BATCH_SIZE: usize = 100;
const LEARN_RATE: f32 = 0.001;
const EVAL_SAMPLES: usize = 1_000;
const EVAL_BATCH_SIZE: usize = 100;

pub fn main() {
    let MnistData {
        train_images,
        train_labels,
        test_images,
        test_labels,
    } = load_mnist_data::<f32>(60_000, 10_000);

    let mut net = ConvNet::new(
        &ConvNetConfig::default(),
        &mut HeInitializer::seed_from_u64(0xf1234567),
    )
    .unwrap();
    let mut optimizer = Adam::new(LEARN_RATE);

    let train_size = train_images.dims().first();
    let mut sample_rng = StdRng::seed_from_u64(0xf666);
    let index_dist = Uniform::from(0..train_size);
    let iters_per_epoch = (train_size / BATCH_SIZE).max(1);

    let eval_train_images = train_images.slice_first_axis(0, EVAL_SAMPLES);
    let eval_train_labels = train_labels.slice_first_axis(0, EVAL_SAMPLES);
    let eval_test_images = test_images.slice_first_axis(0, EVAL_SAMPLES);
    let eval_test_labels = test_labels.slice_first_axis(0, EVAL_SAMPLES);

    let mut loss_history = Vec::with_capacity(MAX_ITERS);
    let start = Instant::now();

    for iter in 0..MAX_ITERS {
        // minibatch of uniform indices, drawn with replacement
        let batch: Vec<usize> = (0..BATCH_SIZE)
            .map(|_| index_dist.sample(&mut sample_rng))
            .collect();
        let x = train_images.select_first_axis(&batch);
        let t = train_labels.select_first_axis(&batch);

        let loss = net.gradient(&x, &t);
        optimizer.update(&mut net.params_and_grads());
        loss_history.push(loss);

        if iter % iters_per_epoch == 0 {
            let train_acc = net.accuracy(&eval_train_images, &eval_train_labels, EVAL_BATCH_SIZE);
            let test_acc = net.accuracy(&eval_test_images, &eval_test_labels, EVAL_BATCH_SIZE);
            println!(
                "iter {iter}: loss={loss:.4}, train acc={train_acc:.4}, test acc={test_acc:.4}"
            );
        }
    }

    let elapsed = start.elapsed();
    println!(
        "Training time for {MAX_ITERS} iterations and batch size {BATCH_SIZE}: {} sec",
        elapsed.as_secs_f32()
    );

    let final_train_acc = net.accuracy(&eval_train_images, &eval_train_labels, EVAL_BATCH_SIZE);
    let final_test_acc = net.accuracy(&test_images, &test_labels, EVAL_BATCH_SIZE);
    println!("final train acc={final_train_acc:.4}, final test acc={final_test_acc:.4}");
    println!(
        "final loss={:.4} (first recorded {:.4})",
        loss_history.last().unwrap(),
        loss_history.first().unwrap()
    );
}
