use mnist::{Mnist, MnistBuilder};
use rcnn::dtype::DType;
use rcnn::tensor::{Dims, Tensor};

const IMAGE_ROWS: usize = 28;
const IMAGE_COLS: usize = 28;
const IMAGE_PIXELS: usize = IMAGE_ROWS * IMAGE_COLS;
const NUM_CLASSES: usize = 10;

pub struct MnistData<D: DType> {
    /// `(N, 1, 28, 28)`, values in [0, 1]
    pub train_images: Tensor<D>,
    /// `(N, 10)` one-hot
    pub train_labels: Tensor<D>,
    pub test_images: Tensor<D>,
    pub test_labels: Tensor<D>,
}

pub fn load_mnist_data<D: DType>(train_samples: usize, test_samples: usize) -> MnistData<D> {
    let Mnist {
        trn_img,
        trn_lbl,
        tst_img,
        tst_lbl,
        ..
    } = MnistBuilder::new()
        .base_path("rcnn-examples/data")
        .label_format_one_hot()
        .training_set_length(train_samples as u32)
        .test_set_length(test_samples as u32)
        .finalize();

    assert_eq!(trn_img.len(), train_samples * IMAGE_PIXELS);
    assert_eq!(trn_lbl.len(), train_samples * NUM_CLASSES);
    assert_eq!(tst_img.len(), test_samples * IMAGE_PIXELS);
    assert_eq!(tst_lbl.len(), test_samples * NUM_CLASSES);

    MnistData {
        train_images: image_tensor(trn_img, train_samples),
        train_labels: label_tensor(trn_lbl, train_samples),
        test_images: image_tensor(tst_img, test_samples),
        test_labels: label_tensor(tst_lbl, test_samples),
    }
}

fn image_tensor<D: DType>(raw: Vec<u8>, samples: usize) -> Tensor<D> {
    let data: Vec<D> = raw
        .into_iter()
        .map(|p| D::from_f64(p as f64 / 256.0))
        .collect();
    Tensor::from_vec(data, Dims::D4(samples, 1, IMAGE_ROWS, IMAGE_COLS))
}

fn label_tensor<D: DType>(raw: Vec<u8>, samples: usize) -> Tensor<D> {
    let data: Vec<D> = raw.into_iter().map(|l| D::from_usize(l as usize)).collect();
    Tensor::from_vec(data, Dims::D2(samples, NUM_CLASSES))
}
