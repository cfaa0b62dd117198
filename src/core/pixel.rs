//! Sample types that can flow through a pipeline.

use std::fmt::Debug;

/// A scalar sample type.
///
/// Filters accumulate in `f64` and convert back with [`Pixel::from_f64`],
/// which rounds integer types to nearest and clamps to the representable
/// range.
pub trait Pixel: bytemuck::Pod + Default + PartialOrd + Debug + Send + Sync + 'static {
    /// Human-readable type name.
    const NAME: &'static str;
    /// Smallest representable value.
    const MIN_VALUE: f64;
    /// Largest representable value.
    const MAX_VALUE: f64;
    /// Value that maps to full white when exchanging with 2-D image files.
    const DISPLAY_MAX: f64;

    /// Widen to `f64`.
    fn to_f64(self) -> f64;

    /// Narrow from `f64`, clamping to the representable range.
    fn from_f64(value: f64) -> Self;

    /// Largest absolute difference two samples of this type can have.
    fn difference_span() -> f64 {
        Self::MAX_VALUE - Self::MIN_VALUE
    }
}

macro_rules! impl_integer_pixel {
    ($($ty:ty),*) => {
        $(
            impl Pixel for $ty {
                const NAME: &'static str = stringify!($ty);
                const MIN_VALUE: f64 = <$ty>::MIN as f64;
                const MAX_VALUE: f64 = <$ty>::MAX as f64;
                const DISPLAY_MAX: f64 = <$ty>::MAX as f64;

                #[inline]
                fn to_f64(self) -> f64 {
                    self as f64
                }

                #[inline]
                fn from_f64(value: f64) -> Self {
                    value.round().clamp(Self::MIN_VALUE, Self::MAX_VALUE) as $ty
                }
            }
        )*
    };
}

impl_integer_pixel!(u8, u16, i16, i32);

impl Pixel for f32 {
    const NAME: &'static str = "f32";
    const MIN_VALUE: f64 = f32::MIN as f64;
    const MAX_VALUE: f64 = f32::MAX as f64;
    const DISPLAY_MAX: f64 = 1.0;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value.clamp(Self::MIN_VALUE, Self::MAX_VALUE) as f32
    }
}

impl Pixel for f64 {
    const NAME: &'static str = "f64";
    const MIN_VALUE: f64 = f64::MIN;
    const MAX_VALUE: f64 = f64::MAX;
    const DISPLAY_MAX: f64 = 1.0;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    fn difference_span() -> f64 {
        f64::MAX
    }
}
