use crate::context::Context;
use crate::data_types::Number;
use crate::dims::{decompression_scratch_limit, Dims};
use crate::errors::{ScilError, ScilResult};
use crate::hints::Hints;
use crate::pipeline;

/// Decompresses `frame` and checks the reconstruction against `original`
/// under the context's effective hints.
///
/// Special values, the fill value, lossless-range members, and non-finite
/// values must come back bit-exact and are excluded from accuracy
/// accounting; every other element must land within its effective
/// tolerance. Returns the observed worst-case accuracy as a hints record
/// (absolute error, relative error percent).
pub(crate) fn validate<T: Number>(
  ctx: &Context,
  original: &[T],
  dims: &Dims,
  frame: &[u8],
) -> ScilResult<Hints> {
  let mut scratch = vec![0_u8; decompression_scratch_limit(dims, ctx.datatype()) as usize];
  let mut reconstructed = vec![T::default(); original.len()];
  pipeline::decompress(dims, frame, &mut scratch, &mut reconstructed)?;

  let effective = ctx.effective_hints();
  let special = ctx.special_value_bits();
  let fill_bits = effective.fill_value.map(|fill| T::from_f64(fill).to_bits_u64());
  let range_from = effective.lossless_data_range_from;
  let range_up_to = effective.lossless_data_range_up_to;
  let abs_tolerance = effective.absolute_tolerance.unwrap_or(0.0);
  let rel_factor = effective
    .relative_tolerance_percent
    .map(|pct| pct / 100.0)
    .unwrap_or(0.0);
  let finest = effective.relative_err_finest_abs_tolerance.unwrap_or(0.0);

  let mut max_abs_err = 0.0_f64;
  let mut max_rel_err = 0.0_f64;
  for (i, (x, x2)) in original.iter().zip(&reconstructed).enumerate() {
    let bits = x.to_bits_u64();
    let v = x.to_f64();
    let bit_exact_required = special.contains(&bits)
      || fill_bits == Some(bits)
      || !v.is_finite()
      || range_from.is_some_and(|from| v >= from)
      || range_up_to.is_some_and(|up_to| v <= up_to);
    if bit_exact_required || !ctx.chain.is_lossy() {
      if x2.to_bits_u64() != bits {
        return Err(ScilError::invalid_argument(format!(
          "element {} must survive bit-exact but {} came back as {}",
          i, x, x2,
        )));
      }
      continue;
    }

    let err = (v - x2.to_f64()).abs();
    let permitted = abs_tolerance + (v.abs() * rel_factor).max(finest);
    if err > permitted {
      return Err(ScilError::invalid_argument(format!(
        "element {}: |{} - {}| = {:e} exceeds the effective tolerance {:e}",
        i, x, x2, err, permitted,
      )));
    }
    max_abs_err = max_abs_err.max(err);
    // the relative observation is only meaningful under a declared
    // relative bound, and elements under the finest floor are bounded
    // absolutely; keep both out of it
    let rel_governs = effective.relative_tolerance_percent.is_some()
      && v.abs() * rel_factor >= finest;
    if v != 0.0 && rel_governs {
      max_rel_err = max_rel_err.max(err / v.abs());
    }
  }

  let mut observed = Hints::default();
  observed.absolute_tolerance = Some(max_abs_err);
  observed.relative_tolerance_percent = Some(max_rel_err * 100.0);
  Ok(observed)
}
