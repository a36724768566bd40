use tracing::debug;

use crate::constants::EMPTY_FRAME_BYTE;
use crate::context::Context;
use crate::data_types::{Dtype, Number};
use crate::dims::{decompression_scratch_limit, Dims};
use crate::errors::{ScilError, ScilResult};
use crate::frame;
use crate::registry::{Algorithm, StageRole};

/// Runs the context's chain forward over `nums` and assembles the frame
/// into `dst`, returning the frame size.
pub(crate) fn compress<T: Number>(
  ctx: &Context,
  nums: &[T],
  dims: &Dims,
  dst: &mut [u8],
) -> ScilResult<usize> {
  check_dtype::<T>(ctx.datatype())?;
  if nums.len() as u64 != dims.count() {
    return Err(ScilError::invalid_argument(format!(
      "dims describe {} elements but {} were provided",
      dims.count(),
      nums.len(),
    )));
  }
  if nums.is_empty() {
    if dst.is_empty() {
      return Err(ScilError::buffer_too_small(
        "even the empty sentinel frame needs one byte",
      ));
    }
    dst[0] = EMPTY_FRAME_BYTE;
    return Ok(1);
  }

  let dtype = T::DTYPE;
  let lossy = ctx.chain.is_lossy();
  let (exclusions, neutral) = if lossy {
    scan_exclusions(ctx, nums)
  } else {
    (Vec::new(), T::default())
  };

  let buffer_size = decompression_scratch_limit(dims, dtype) as usize;
  let mut buf_a = vec![0_u8; buffer_size];
  let mut buf_b = vec![0_u8; buffer_size];

  let mut next_exclusion = 0;
  for (i, (value, chunk)) in nums
    .iter()
    .zip(buf_a.chunks_exact_mut(T::SIZE))
    .enumerate()
  {
    let substituted = if next_exclusion < exclusions.len()
      && exclusions[next_exclusion].0 == i as u64
    {
      next_exclusion += 1;
      neutral
    } else {
      *value
    };
    substituted.write_le(chunk);
  }

  let mut headers = Vec::with_capacity(ctx.chain.stages.len());
  let mut current_len = dims.byte_size(dtype) as usize;
  for (algo, stage_dtype) in ctx
    .chain
    .stages
    .iter()
    .zip(stage_dtypes(&ctx.chain.stages, dtype))
  {
    let mut header = Vec::new();
    let written = algo.ops.compress(
      ctx,
      stage_dtype,
      dims,
      &buf_a[..current_len],
      &mut header,
      &mut buf_b,
    )?;
    debug!(
      stage = algo.name,
      bytes_in = current_len,
      bytes_out = written,
      "ran compression stage"
    );
    headers.push(header);
    std::mem::swap(&mut buf_a, &mut buf_b);
    current_len = written;
  }

  frame::write_frame(
    &ctx.chain,
    &exclusions,
    T::SIZE,
    &headers,
    &buf_a[..current_len],
    dst,
  )
}

/// Parses `frame` and runs its chain in reverse, reconstructing into `dst`.
///
/// Needs only the frame, the datatype, and the dims; `scratch` must hold at
/// least [`decompression_scratch_limit`] bytes.
pub(crate) fn decompress<T: Number>(
  dims: &Dims,
  frame_bytes: &[u8],
  scratch: &mut [u8],
  dst: &mut [T],
) -> ScilResult<()> {
  let dtype = T::DTYPE;
  let count = dims.count();
  if dst.len() as u64 != count {
    return Err(ScilError::invalid_argument(format!(
      "dims describe {} elements but the output slice holds {}",
      count,
      dst.len(),
    )));
  }
  if count == 0 {
    return if frame_bytes.len() == 1 && frame_bytes[0] == EMPTY_FRAME_BYTE {
      Ok(())
    } else {
      Err(ScilError::invalid_argument(
        "zero-element dims require the 1-byte sentinel frame",
      ))
    };
  }

  let needed_scratch = decompression_scratch_limit(dims, dtype) as usize;
  if scratch.len() < needed_scratch {
    return Err(ScilError::buffer_too_small(format!(
      "decompression scratch needs {} bytes but holds {}",
      needed_scratch,
      scratch.len(),
    )));
  }

  let parsed = frame::parse_frame(frame_bytes, dtype)?;
  let dtypes = stage_dtypes(&parsed.stages, dtype);

  let mut internal = vec![0_u8; needed_scratch];
  let mut buffers: [&mut [u8]; 2] = [&mut scratch[..needed_scratch], &mut internal[..]];
  let mut current = 0;
  let mut current_len = parsed.payload.len();
  if current_len > buffers[0].len() {
    return Err(ScilError::buffer_too_small(
      "frame payload exceeds the scratch buffer",
    ));
  }
  buffers[0][..current_len].copy_from_slice(parsed.payload);

  for (i, algo) in parsed.stages.iter().enumerate().rev() {
    let (left, right) = buffers.split_at_mut(1);
    let (src_buf, dst_buf): (&[u8], &mut [u8]) = if current == 0 {
      (&left[0][..current_len], &mut right[0][..])
    } else {
      (&right[0][..current_len], &mut left[0][..])
    };
    let written =
      algo.ops.decompress(dtypes[i], dims, parsed.headers[i], src_buf, dst_buf)?;
    debug!(
      stage = algo.name,
      bytes_in = current_len,
      bytes_out = written,
      "inverted compression stage"
    );
    current = 1 - current;
    current_len = written;
  }

  let byte_size = dims.byte_size(dtype) as usize;
  if current_len != byte_size {
    return Err(ScilError::invalid_argument(format!(
      "chain reconstructed {} bytes where the dims demand {}",
      current_len, byte_size,
    )));
  }
  for (chunk, out) in buffers[current][..byte_size]
    .chunks_exact(T::SIZE)
    .zip(dst.iter_mut())
  {
    *out = T::read_le(chunk);
  }

  for &(index, value_bits) in &parsed.exclusions {
    let slot = dst.get_mut(index as usize).ok_or_else(|| {
      ScilError::invalid_argument(format!(
        "frame records an exclusion at index {} beyond {} elements",
        index, count,
      ))
    })?;
    *slot = T::from_bits_u64(value_bits);
  }
  Ok(())
}

/// Values that must pass through lossy stages untouched: special values,
/// the fill value, lossless-range members, and non-finite floats. Returns
/// the (index, bit pattern) list and a neutral in-range substitute the
/// lossy stages see instead.
fn scan_exclusions<T: Number>(ctx: &Context, nums: &[T]) -> (Vec<(u64, u64)>, T) {
  let effective = ctx.effective_hints();
  let special = ctx.special_value_bits();
  let fill_bits = effective.fill_value.map(|fill| T::from_f64(fill).to_bits_u64());
  let range_from = effective.lossless_data_range_from;
  let range_up_to = effective.lossless_data_range_up_to;

  let mut exclusions = Vec::new();
  let mut neutral = None;
  for (i, value) in nums.iter().enumerate() {
    let bits = value.to_bits_u64();
    let v = value.to_f64();
    let excluded = special.contains(&bits)
      || fill_bits == Some(bits)
      || !v.is_finite()
      || range_from.is_some_and(|from| v >= from)
      || range_up_to.is_some_and(|up_to| v <= up_to);
    if excluded {
      exclusions.push((i as u64, bits));
    } else if neutral.is_none() {
      neutral = Some(*value);
    }
  }
  (exclusions, neutral.unwrap_or_default())
}

/// The native-side datatype each stage sees: its input during compression,
/// its output during decompression.
fn stage_dtypes(stages: &[&'static Algorithm], native: Dtype) -> Vec<Dtype> {
  let mut seen_converter = false;
  stages
    .iter()
    .map(|algo| match algo.role {
      StageRole::PrecondFirst => native,
      StageRole::Converter => {
        seen_converter = true;
        native
      }
      StageRole::PrecondSecond => Dtype::I64,
      StageRole::DataCompressor => {
        if seen_converter {
          Dtype::I64
        } else {
          native
        }
      }
      StageRole::ByteCompressor => Dtype::Binary,
    })
    .collect()
}

fn check_dtype<T: Number>(expected: Dtype) -> ScilResult<()> {
  if T::DTYPE == expected {
    Ok(())
  } else {
    Err(ScilError::invalid_argument(format!(
      "context was created for {:?} but the buffer holds {:?}",
      expected,
      T::DTYPE,
    )))
  }
}
