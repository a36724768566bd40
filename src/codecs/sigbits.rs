use crate::context::Context;
use crate::data_types::{match_float_dtype, Dtype, Float};
use crate::dims::Dims;
use crate::errors::{ScilError, ScilResult};
use crate::registry::StageOps;

/// Significant-bit truncation.
///
/// Keeps the sign and exponent of each float and the leading `k - 1` stored
/// mantissa bits (the implicit 1 counts toward `k`), rounding
/// half-away-from-zero at the kept-bit boundary. That choice minimizes the
/// worst-case relative error. The payload keeps the input's datatype and
/// element count; decompression is the identity.
pub(crate) struct Sigbits;

impl StageOps for Sigbits {
  fn compress(
    &self,
    ctx: &Context,
    dtype: Dtype,
    _dims: &Dims,
    src: &[u8],
    header: &mut Vec<u8>,
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    let k = ctx.param_u32("sigbits_k")?;
    header.push(k as u8);
    match_float_dtype!(
      dtype,
      T => {
        truncate::<T>(k, src, dst);
        Ok(src.len())
      },
      _ => Err(ScilError::unsupported(format!(
        "sigbits requires a float datatype; got {:?}",
        dtype
      ))),
    )
  }

  fn decompress(
    &self,
    _dtype: Dtype,
    _dims: &Dims,
    header: &[u8],
    src: &[u8],
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    if header.len() != 1 || header[0] == 0 {
      return Err(ScilError::invalid_argument(
        "malformed sigbits stage header",
      ));
    }
    dst[..src.len()].copy_from_slice(src);
    Ok(src.len())
  }
}

fn truncate<T: Float>(k: u32, src: &[u8], dst: &mut [u8]) {
  let kept = (k - 1).min(T::MANTISSA_BITS);
  let dropped = T::MANTISSA_BITS - kept;
  let exponent_mask =
    ((1_u64 << (T::TOTAL_BITS - 1 - T::MANTISSA_BITS)) - 1) << T::MANTISSA_BITS;
  for (src_elem, dst_elem) in src
    .chunks_exact(T::SIZE)
    .zip(dst.chunks_exact_mut(T::SIZE))
  {
    let value = T::read_le(src_elem);
    let rounded = if dropped == 0 || !value.is_finite_() {
      value
    } else {
      // sign-magnitude representation: adding half of the dropped range to
      // the magnitude bits rounds ties away from zero, and a mantissa
      // carry overflows into the exponent exactly when the rounded value
      // crosses a binade
      let mask = (1_u64 << dropped) - 1;
      let half = 1_u64 << (dropped - 1);
      let up = (value.to_bits() + half) & !mask;
      if up & exponent_mask == exponent_mask {
        // the carry crossed out of the top binade into the infinity
        // pattern; saturate to the largest lattice point below it
        T::from_bits(value.to_bits() & !mask)
      } else {
        T::from_bits(up)
      }
    };
    rounded.write_le(dst_elem);
  }
}
