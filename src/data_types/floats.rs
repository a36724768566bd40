use crate::constants::Bitlen;
use crate::data_types::{Dtype, Float, Number};

macro_rules! impl_float {
  ($t: ty, $bits: ty, $dtype: expr, $mantissa_bits: expr) => {
    impl Number for $t {
      const DTYPE: Dtype = $dtype;
      const SIZE: usize = std::mem::size_of::<$t>();

      #[inline]
      fn to_f64(self) -> f64 {
        self as f64
      }

      #[inline]
      fn from_f64(x: f64) -> Self {
        x as $t
      }

      #[inline]
      fn narrowing_margin(magnitude: f64, _tolerance: f64) -> f64 {
        // half an ulp of this type at the given magnitude
        magnitude * (<$t>::EPSILON as f64) / 2.0
      }

      #[inline]
      fn to_bits_u64(self) -> u64 {
        self.to_bits() as u64
      }

      #[inline]
      fn from_bits_u64(bits: u64) -> Self {
        <$t>::from_bits(bits as $bits)
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

    impl Float for $t {
      const TOTAL_BITS: Bitlen = <$t>::SIZE as Bitlen * 8;
      const MANTISSA_BITS: Bitlen = $mantissa_bits;

      #[inline]
      fn to_bits(self) -> u64 {
        <$t>::to_bits(self) as u64
      }

      #[inline]
      fn from_bits(bits: u64) -> Self {
        <$t>::from_bits(bits as $bits)
      }

      #[inline]
      fn is_finite_(&self) -> bool {
        self.is_finite()
      }
    }
  };
}

impl_float!(f32, u32, Dtype::F32, 23);
impl_float!(f64, u64, Dtype::F64, 52);
