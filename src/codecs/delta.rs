use crate::context::Context;
use crate::data_types::Dtype;
use crate::dims::Dims;
use crate::errors::{ScilError, ScilResult};
use crate::registry::StageOps;

/// Order-1 delta encoding over the i64 lattice.
///
/// Stores the first value as-is and every later value as the wrapping
/// difference from its predecessor. Smooth quantized data collapses to a
/// narrow band around zero, which the downstream packing and entropy
/// stages reward. Exactly invertible, so the stage is lossless.
pub(crate) struct Delta;

const ORDER: u8 = 1;

impl StageOps for Delta {
  fn compress(
    &self,
    _ctx: &Context,
    _dtype: Dtype,
    dims: &Dims,
    src: &[u8],
    header: &mut Vec<u8>,
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    header.push(ORDER);
    let count = dims.count() as usize;
    let mut previous = 0_i64;
    for (chunk, out) in src[..count * 8]
      .chunks_exact(8)
      .zip(dst.chunks_exact_mut(8))
    {
      let value = i64::from_le_bytes(chunk.try_into().unwrap());
      out.copy_from_slice(&value.wrapping_sub(previous).to_le_bytes());
      previous = value;
    }
    Ok(count * 8)
  }

  fn decompress(
    &self,
    _dtype: Dtype,
    dims: &Dims,
    header: &[u8],
    src: &[u8],
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    if header != [ORDER] {
      return Err(ScilError::invalid_argument(
        "malformed delta stage header",
      ));
    }
    let count = dims.count() as usize;
    if src.len() < count * 8 {
      return Err(ScilError::invalid_argument(format!(
        "delta payload holds {} bytes but {} lattice values are expected",
        src.len(),
        count,
      )));
    }
    let mut running = 0_i64;
    for (chunk, out) in src[..count * 8]
      .chunks_exact(8)
      .zip(dst.chunks_exact_mut(8))
    {
      let delta = i64::from_le_bytes(chunk.try_into().unwrap());
      running = running.wrapping_add(delta);
      out.copy_from_slice(&running.to_le_bytes());
    }
    Ok(count * 8)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::Context;
  use crate::hints::Hints;

  #[test]
  fn test_round_trip_with_wrapping() {
    let values: [i64; 5] = [i64::MIN, i64::MAX, 0, -17, 40];
    let dims = Dims::d1(values.len() as u64);
    let mut src = vec![0_u8; values.len() * 8];
    for (v, chunk) in values.iter().zip(src.chunks_exact_mut(8)) {
      chunk.copy_from_slice(&v.to_le_bytes());
    }

    let ctx = Context::new::<i64>(&[], Hints::default()).unwrap();
    let mut header = Vec::new();
    let mut encoded = vec![0_u8; src.len() * 2];
    let written = Delta
      .compress(&ctx, Dtype::I64, &dims, &src, &mut header, &mut encoded)
      .unwrap();
    assert_eq!(written, src.len());

    let mut decoded = vec![0_u8; src.len() * 2];
    let restored = Delta
      .decompress(Dtype::I64, &dims, &header, &encoded[..written], &mut decoded)
      .unwrap();
    assert_eq!(&decoded[..restored], &src[..]);
  }
}
