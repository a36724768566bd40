use crate::bits;
use crate::constants::TOLERANCE_SHAVE;
use crate::context::Context;
use crate::data_types::{match_number_dtype, Dtype, Number};
use crate::dims::Dims;
use crate::errors::{ScilError, ScilResult};
use crate::registry::StageOps;

/// Absolute-tolerance quantizer.
///
/// Maps each value onto the integer lattice `anchor + q * 2t`, where `t` is
/// the stated tolerance less the output type's narrowing margin and a
/// relative shave, so `|v - (anchor + q * 2t)| <= tolerance` holds even
/// after the f64 reconstruction rounds back into the native type. The
/// anchor is the minimum of the (already neutralized) input, making every
/// `q` non-negative.
///
/// Header: working tolerance (f64), anchor (f64), lattice bit width (u8).
pub(crate) struct Abstol;

impl StageOps for Abstol {
  fn compress(
    &self,
    ctx: &Context,
    dtype: Dtype,
    dims: &Dims,
    src: &[u8],
    header: &mut Vec<u8>,
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    let tolerance = ctx.param_f64("abstol_tolerance")?;
    match_number_dtype!(
      dtype,
      T => { quantize::<T>(tolerance, dims, src, header, dst) },
      _ => Err(ScilError::unsupported(format!(
        "abstol cannot quantize {:?}",
        dtype
      ))),
    )
  }

  fn decompress(
    &self,
    dtype: Dtype,
    dims: &Dims,
    header: &[u8],
    src: &[u8],
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    if header.len() != 17 {
      return Err(ScilError::invalid_argument(
        "malformed abstol stage header",
      ));
    }
    let tau = bits::read_f64_le(header, 0)?;
    let anchor = bits::read_f64_le(header, 8)?;
    if !(tau > 0.0) || !anchor.is_finite() || header[16] > 64 {
      return Err(ScilError::invalid_argument(
        "malformed abstol stage header",
      ));
    }
    match_number_dtype!(
      dtype,
      T => { reconstruct::<T>(tau, anchor, dims, src, dst) },
      _ => Err(ScilError::unsupported(format!(
        "abstol cannot reconstruct {:?}",
        dtype
      ))),
    )
  }
}

fn quantize<T: Number>(
  tolerance: f64,
  dims: &Dims,
  src: &[u8],
  header: &mut Vec<u8>,
  dst: &mut [u8],
) -> ScilResult<usize> {
  let count = dims.count() as usize;

  let mut min = f64::INFINITY;
  let mut max = f64::NEG_INFINITY;
  for chunk in src.chunks_exact(T::SIZE) {
    let v = T::read_le(chunk).to_f64();
    min = min.min(v);
    max = max.max(v);
  }
  let anchor = if count > 0 { min } else { 0.0 };

  let max_magnitude = if count > 0 {
    min.abs().max(max.abs()) + tolerance
  } else {
    tolerance
  };
  let margin = T::narrowing_margin(max_magnitude, tolerance);
  let tau = (tolerance - margin) * (1.0 - TOLERANCE_SHAVE);
  if !(tau > 0.0) {
    return Err(ScilError::invalid_argument(format!(
      "absolute tolerance {:e} is below {:?}'s rounding grain {:e} at \
       magnitude {:e}",
      tolerance,
      T::DTYPE,
      margin,
      max_magnitude,
    )));
  }
  let step = 2.0 * tau;
  if count > 0 && (max - anchor) / step >= i64::MAX as f64 {
    return Err(ScilError::invalid_argument(format!(
      "absolute tolerance {:e} is too fine for a data range of {:e}",
      tau,
      max - anchor,
    )));
  }

  let mut max_q = 0_u64;
  for (chunk, q_chunk) in src
    .chunks_exact(T::SIZE)
    .zip(dst.chunks_exact_mut(8))
  {
    let v = T::read_le(chunk).to_f64();
    let q = ((v - anchor) / step).round() as i64;
    max_q = max_q.max(q as u64);
    q_chunk.copy_from_slice(&q.to_le_bytes());
  }

  bits::write_f64_le(tau, header);
  bits::write_f64_le(anchor, header);
  header.push(bits::bits_to_encode(max_q) as u8);
  Ok(count * 8)
}

fn reconstruct<T: Number>(
  tau: f64,
  anchor: f64,
  dims: &Dims,
  src: &[u8],
  dst: &mut [u8],
) -> ScilResult<usize> {
  let count = dims.count() as usize;
  if src.len() < count * 8 {
    return Err(ScilError::invalid_argument(format!(
      "abstol payload holds {} bytes but {} elements are expected",
      src.len(),
      count,
    )));
  }
  let step = 2.0 * tau;
  for (q_chunk, chunk) in src[..count * 8]
    .chunks_exact(8)
    .zip(dst.chunks_exact_mut(T::SIZE))
  {
    let q = i64::from_le_bytes(q_chunk.try_into().unwrap());
    let v = anchor + q as f64 * step;
    T::from_f64(v).write_le(chunk);
  }
  Ok(count * T::SIZE)
}
