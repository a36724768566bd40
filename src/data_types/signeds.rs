use crate::data_types::{Dtype, Number};

macro_rules! impl_signed {
  ($t: ty, $unsigned: ty, $dtype: expr) => {
    impl Number for $t {
      const DTYPE: Dtype = $dtype;
      const SIZE: usize = std::mem::size_of::<$t>();

      #[inline]
      fn to_f64(self) -> f64 {
        self as f64
      }

      #[inline]
      fn from_f64(x: f64) -> Self {
        // `as` saturates, so reconstructions just outside the type's range
        // land on the nearest representable value
        x.round() as $t
      }

      #[inline]
      fn narrowing_margin(_magnitude: f64, tolerance: f64) -> f64 {
        // under half an integer step the rounding snaps back to the
        // original exactly; above it the rounding can move half a step
        if tolerance <= 0.5 {
          0.0
        } else {
          0.5
        }
      }

      #[inline]
      fn to_bits_u64(self) -> u64 {
        (self as $unsigned) as u64
      }

      #[inline]
      fn from_bits_u64(bits: u64) -> Self {
        (bits as $unsigned) as $t
      }

      #[inline]
      fn write_le(self, dst: &mut [u8]) {
        dst.copy_from_slice(&self.to_le_bytes());
      }

      #[inline]
      fn read_le(src: &[u8]) -> Self {
        <$t>::from_le_bytes(src.try_into().unwrap())
      }
    }
  };
}

impl_signed!(i8, u8, Dtype::I8);
impl_signed!(i16, u16, Dtype::I16);
impl_signed!(i32, u32, Dtype::I32);
impl_signed!(i64, u64, Dtype::I64);
