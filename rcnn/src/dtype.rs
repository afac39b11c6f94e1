use num_traits::{Float, Num, NumAssignOps};

/// Scalar element type of the engine. Everything numeric is generic over
/// this so the same layer code runs in `f32` (fast) or `f64` (gradient
/// checking) precision.
pub trait DType: 'static + Sized + Copy + Num + NumAssignOps + Float + PartialOrd {
    const ZERO: Self;
    const ONE: Self;
    fn from_f64(val: f64) -> Self;
    fn from_usize(val: usize) -> Self;
    fn to_f64(self) -> f64;
    fn to_usize(self) -> usize;
}

macro_rules! impl_dtype {
    ($ty:ty) => {
        impl DType for $ty {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            #[inline]
            fn from_f64(val: f64) -> Self {
                val as $ty
            }
            #[inline]
            fn from_usize(val: usize) -> Self {
                val as $ty
            }
            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }
            #[inline]
            fn to_usize(self) -> usize {
                self as usize
            }
        }
    };
}

impl_dtype!(f32);
impl_dtype!(f64);
