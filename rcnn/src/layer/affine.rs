use crate::error::Error;
use crate::math::{DTypeOps, column_sum, matmul};
use crate::tensor::{Dims, Tensor};

/// Dense linear transform `y = x W + b`.
///
/// Inputs of any rank are flattened to `(batch, features)` on the way in;
/// backward restores the original shape on the way out, so the layer can sit
/// directly behind a spatial stage.
pub struct Affine<T: DTypeOps> {
    w: Tensor<T>,
    b: Tensor<T>,
    dw: Tensor<T>,
    db: Tensor<T>,
    cache: Option<AffineCache<T>>,
}

struct AffineCache<T> {
    x: Tensor<T>,
    input_dims: Dims,
}

impl<T: DTypeOps> Affine<T> {
    /// `w` must be `(in_features, out_features)`, `b` `(out_features,)`.
    pub fn new(w: Tensor<T>, b: Tensor<T>) -> Result<Self, Error> {
        let (_, out_features) = match *w.dims() {
            Dims::D2(i, o) => (i, o),
            other => {
                return Err(Error::shape(
                    "affine weights",
                    format!("expected a 2-D weight matrix, got {other}"),
                ));
            }
        };
        if b.dims() != &Dims::D1(out_features) {
            return Err(Error::shape(
                "affine bias",
                format!("expected ({out_features},), got {}", b.dims()),
            ));
        }
        let dw = Tensor::zeroed(*w.dims());
        let db = Tensor::zeroed(*b.dims());
        Ok(Affine {
            w,
            b,
            dw,
            db,
            cache: None,
        })
    }

    pub fn in_features(&self) -> usize {
        self.w.dims().unwrap_2d().0
    }

    pub fn out_features(&self) -> usize {
        self.w.dims().unwrap_2d().1
    }

    pub fn forward(&mut self, x: Tensor<T>) -> Tensor<T> {
        let input_dims = *x.dims();
        let rows = input_dims.first();
        let cols = input_dims.chunk_size();
        assert_eq!(
            cols,
            self.in_features(),
            "input feature count does not match the weight matrix"
        );
        let x = x.reshape(Dims::D2(rows, cols));

        let mut out = Tensor::zeroed(Dims::D2(rows, self.out_features()));
        matmul(T::ONE, &x, false, &self.w, false, T::ZERO, &mut out);
        for row in out.iter_first_axis_mut() {
            for (v, &bias) in row.iter_mut().zip(self.b.as_ref()) {
                *v += bias;
            }
        }

        self.cache = Some(AffineCache { x, input_dims });
        out
    }

    pub fn backward(&mut self, dout: Tensor<T>) -> Tensor<T> {
        let cache = self.cache.as_ref().expect("backward called before forward");
        let (rows, _) = cache.x.dims().unwrap_2d();
        assert_eq!(
            dout.dims(),
            &Dims::D2(rows, self.out_features()),
            "upstream gradient does not match the cached input"
        );

        matmul(T::ONE, &cache.x, true, &dout, false, T::ZERO, &mut self.dw);
        column_sum(&dout, &mut self.db);

        let mut dx = Tensor::zeroed(Dims::D2(rows, self.in_features()));
        matmul(T::ONE, &dout, false, &self.w, true, T::ZERO, &mut dx);
        dx.reshape(cache.input_dims)
    }

    pub fn weights(&self) -> &Tensor<T> {
        &self.w
    }

    pub fn bias(&self) -> &Tensor<T> {
        &self.b
    }

    pub(crate) fn param_grads(&mut self) -> [(&mut Tensor<T>, &Tensor<T>); 2] {
        let Affine { w, b, dw, db, .. } = self;
        [(w, &*dw), (b, &*db)]
    }
}
