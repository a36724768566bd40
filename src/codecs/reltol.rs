use crate::bits;
use crate::constants::TOLERANCE_SHAVE;
use crate::context::Context;
use crate::data_types::{match_float_dtype, Dtype, Float};
use crate::dims::Dims;
use crate::errors::{ScilError, ScilResult};
use crate::registry::StageOps;

/// Relative-tolerance quantizer, built as abstol over a magnitude
/// partition.
///
/// Magnitudes split into binades starting at the exponent where the
/// relative bound `|v| * pct/100` rises above the finest absolute floor.
/// Each binade is quantized with the step derived from its lower bound, so
/// the per-element tolerance `max(finest, |v| * pct/100)` always dominates
/// the step used; magnitudes below the first binade share a flat lattice
/// with step `2 * finest`. Lattice indices are laid out binade after binade
/// with a fixed per-binade capacity, which keeps the mapping invertible
/// from the header alone.
///
/// Header: percent (f64), finest floor (f64), first binade exponent (i16).
pub(crate) struct Reltol;

impl StageOps for Reltol {
  fn compress(
    &self,
    ctx: &Context,
    dtype: Dtype,
    dims: &Dims,
    src: &[u8],
    header: &mut Vec<u8>,
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    let pct = ctx.param_f64("reltol_percent")?;
    let finest = ctx.param_f64("reltol_finest")?;
    match_float_dtype!(
      dtype,
      T => {
        let partition = Partition::new(pct, finest, grain_of::<T>())?;
        bits::write_f64_le(pct, header);
        bits::write_f64_le(finest, header);
        bits::write_i16_le(partition.min_exp as i16, header);
        quantize::<T>(&partition, dims, src, dst)
      },
      _ => Err(ScilError::unsupported(format!(
        "reltol requires a float datatype; got {:?}",
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
    if header.len() != 18 {
      return Err(ScilError::invalid_argument(
        "malformed reltol stage header",
      ));
    }
    let pct = bits::read_f64_le(header, 0)?;
    let finest = bits::read_f64_le(header, 8)?;
    let min_exp = bits::read_i16_le(header, 16)?;
    match_float_dtype!(
      dtype,
      T => {
        let partition = Partition::new(pct, finest, grain_of::<T>())?;
        if partition.min_exp != min_exp as i32 {
          return Err(ScilError::invalid_argument(
            "reltol header disagrees with its own partition boundaries",
          ));
        }
        reconstruct::<T>(&partition, dims, src, dst)
      },
      _ => Err(ScilError::unsupported(format!(
        "reltol cannot reconstruct {:?}",
        dtype
      ))),
    )
  }
}

/// Half an ulp of `T` as a fraction of magnitude: the relative error the
/// final narrowing out of f64 can add.
fn grain_of<T: Float>() -> f64 {
  (2.0_f64).powi(-(T::MANTISSA_BITS as i32 + 1))
}

/// The log-bucketed lattice layout shared by both directions; fully
/// determined by the percentage, the floor, and the output type's grain,
/// all of which the decompressor recovers from the header and the frame's
/// datatype.
struct Partition {
  min_exp: i32,
  /// Working relative factor, `pct/100` less the shave and the grain.
  rel: f64,
  /// Step of the flat region under the first binade.
  flat_step: f64,
  /// Highest flat-region index; binade indices start right above it.
  flat_cap: i64,
  /// Index capacity of every binade.
  binade_cap: i64,
  n_binades: i64,
}

impl Partition {
  /// Binades cover exponents up to 2^1023, i.e. every finite double.
  const MAX_EXP: i32 = 1023;

  fn new(pct: f64, finest: f64, grain: f64) -> ScilResult<Self> {
    if !(pct > 0.0 && pct <= 100.0) || !(finest > 0.0) || !finest.is_finite() {
      return Err(ScilError::invalid_argument(format!(
        "reltol needs a percentage in (0, 100] and a positive finite floor; \
         got {:e} and {:e}",
        pct, finest,
      )));
    }
    let min_exp =
      ((finest * 100.0 / pct).log2().ceil() as i32).clamp(-1022, Self::MAX_EXP);
    let threshold = 2.0_f64.powi(min_exp);

    // reserve the narrowing error of the final cast out of f64: binade
    // reconstructions reach 2(1 + rel) times the binade bottom, flat ones
    // stay under threshold + 2 * finest
    let rel = pct / 100.0 * (1.0 - TOLERANCE_SHAVE) - 6.0 * grain;
    let flat_step =
      2.0 * (finest - (threshold + 2.0 * finest) * grain) * (1.0 - TOLERANCE_SHAVE);
    if !(rel > 0.0) || !(flat_step > 0.0) {
      return Err(ScilError::invalid_argument(format!(
        "relative tolerance of {:e}% with floor {:e} is finer than the \
         datatype's precision",
        pct, finest,
      )));
    }

    let flat_cap = (threshold / flat_step).floor() as i64;
    let binade_cap_f = (0.5 / rel).floor() + 2.0;
    if !(binade_cap_f < 9.0e18) {
      return Err(ScilError::invalid_argument(format!(
        "relative tolerance of {:e}% needs a lattice wider than 64 bits",
        pct,
      )));
    }
    let binade_cap = binade_cap_f as i64;
    let n_binades = (Self::MAX_EXP - min_exp + 1) as i64;
    let end = flat_cap
      .checked_add(1)
      .and_then(|x| binade_cap.checked_mul(n_binades).map(|y| (x, y)))
      .and_then(|(x, y)| x.checked_add(y));
    if flat_cap < 0 || binade_cap < 0 || end.is_none() {
      return Err(ScilError::invalid_argument(format!(
        "relative tolerance of {:e}% with floor {:e} needs a lattice wider \
         than 64 bits",
        pct, finest,
      )));
    }

    Ok(Partition {
      min_exp,
      rel,
      flat_step,
      flat_cap,
      binade_cap,
      n_binades,
    })
  }

  fn index_of(&self, v: f64) -> i64 {
    let a = v.abs();
    let threshold = 2.0_f64.powi(self.min_exp);
    if !a.is_finite() {
      // non-finite values are recorded as exclusions before this stage
      // runs; park them at the origin
      return 0;
    }
    if a < threshold {
      return (v / self.flat_step).round() as i64;
    }
    let exp = (((a.to_bits() >> 52) & 0x7ff) as i32 - 1023).min(Self::MAX_EXP);
    let bottom = 2.0_f64.powi(exp);
    let step = bottom * 2.0 * self.rel;
    let idx = ((a - bottom) / step).round() as i64;
    let magnitude = self.flat_cap
      + 1
      + (exp - self.min_exp) as i64 * self.binade_cap
      + idx.min(self.binade_cap - 1);
    if v < 0.0 {
      -magnitude
    } else {
      magnitude
    }
  }

  fn value_of(&self, q: i64) -> ScilResult<f64> {
    let magnitude = (q as i128).unsigned_abs() as u64;
    let sign = if q < 0 { -1.0 } else { 1.0 };
    if magnitude <= self.flat_cap as u64 {
      return Ok(q as f64 * self.flat_step);
    }
    let offset = (magnitude - self.flat_cap as u64 - 1) as i64;
    let binade = offset / self.binade_cap;
    let idx = offset % self.binade_cap;
    if binade >= self.n_binades {
      return Err(ScilError::invalid_argument(format!(
        "reltol lattice index {} is out of range",
        q
      )));
    }
    let bottom = 2.0_f64.powi(self.min_exp + binade as i32);
    let step = bottom * 2.0 * self.rel;
    Ok(sign * (bottom + idx as f64 * step))
  }
}

fn quantize<T: Float>(
  partition: &Partition,
  dims: &Dims,
  src: &[u8],
  dst: &mut [u8],
) -> ScilResult<usize> {
  let count = dims.count() as usize;
  for (chunk, q_chunk) in src
    .chunks_exact(T::SIZE)
    .zip(dst.chunks_exact_mut(8))
  {
    let v = T::read_le(chunk).to_f64();
    let q = partition.index_of(v);
    q_chunk.copy_from_slice(&q.to_le_bytes());
  }
  Ok(count * 8)
}

fn reconstruct<T: Float>(
  partition: &Partition,
  dims: &Dims,
  src: &[u8],
  dst: &mut [u8],
) -> ScilResult<usize> {
  let count = dims.count() as usize;
  if src.len() < count * 8 {
    return Err(ScilError::invalid_argument(format!(
      "reltol payload holds {} bytes but {} elements are expected",
      src.len(),
      count,
    )));
  }
  for (q_chunk, chunk) in src[..count * 8]
    .chunks_exact(8)
    .zip(dst.chunks_exact_mut(T::SIZE))
  {
    let q = i64::from_le_bytes(q_chunk.try_into().unwrap());
    let v = partition.value_of(q)?;
    T::from_f64(v).write_le(chunk);
  }
  Ok(count * T::SIZE)
}
