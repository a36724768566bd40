use crate::bits;
use crate::context::Context;
use crate::data_types::Dtype;
use crate::dims::Dims;
use crate::errors::{ScilError, ScilResult};
use crate::registry::StageOps;

/// Minimal-bit-width integer packing.
///
/// Finds the range of the input, subtracts the minimum, and packs each
/// offset with just enough bits to cover the range, LSB-first within
/// little-endian words. Quantized lattices and deltas rarely need more
/// than a handful of bits per value.
///
/// Header: offset (i64), bit width (u8).
pub(crate) struct Bitpack;

impl StageOps for Bitpack {
  fn compress(
    &self,
    _ctx: &Context,
    dtype: Dtype,
    dims: &Dims,
    src: &[u8],
    header: &mut Vec<u8>,
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    let values = read_signed(dtype, dims, src)?;

    let mut min = i64::MAX;
    let mut max = i64::MIN;
    for &v in &values {
      min = min.min(v);
      max = max.max(v);
    }
    let (offset, width) = if values.is_empty() {
      (0, 0)
    } else {
      (min, bits::bits_to_encode(max.wrapping_sub(min) as u64))
    };

    bits::write_i64_le(offset, header);
    header.push(width as u8);

    // the accumulator flushes whole bytes, so it never holds more than
    // 7 + 64 bits
    let mut acc = 0_u128;
    let mut acc_bits = 0_u32;
    let mut pos = 0;
    for &v in &values {
      let delta = v.wrapping_sub(offset) as u64;
      acc |= (delta as u128) << acc_bits;
      acc_bits += width;
      while acc_bits >= 8 {
        dst[pos] = acc as u8;
        acc >>= 8;
        acc_bits -= 8;
        pos += 1;
      }
    }
    if acc_bits > 0 {
      dst[pos] = acc as u8;
      pos += 1;
    }
    Ok(pos)
  }

  fn decompress(
    &self,
    dtype: Dtype,
    dims: &Dims,
    header: &[u8],
    src: &[u8],
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    if header.len() != 9 || header[8] > 64 {
      return Err(ScilError::invalid_argument(
        "malformed bitpack stage header",
      ));
    }
    let offset = bits::read_i64_le(header, 0)?;
    let width = header[8] as u32;

    let count = dims.count() as usize;
    let needed = bits::ceil_div(count * width as usize, 8);
    if src.len() < needed {
      return Err(ScilError::invalid_argument(format!(
        "bitpack payload holds {} bytes but {} are needed",
        src.len(),
        needed,
      )));
    }

    let mask = if width == 64 {
      u128::from(u64::MAX)
    } else {
      (1_u128 << width) - 1
    };
    let mut acc = 0_u128;
    let mut acc_bits = 0_u32;
    let mut pos = 0;
    let elem_size = dtype.size();
    for out in dst[..count * elem_size].chunks_exact_mut(elem_size) {
      while acc_bits < width {
        acc |= (src[pos] as u128) << acc_bits;
        acc_bits += 8;
        pos += 1;
      }
      let delta = (acc & mask) as u64;
      acc >>= width;
      acc_bits -= width;
      let value = offset.wrapping_add(delta as i64);
      write_signed(dtype, value, out)?;
    }
    Ok(count * elem_size)
  }
}

/// Sign-extends the native elements onto i64.
fn read_signed(dtype: Dtype, dims: &Dims, src: &[u8]) -> ScilResult<Vec<i64>> {
  let count = dims.count() as usize;
  let elem_size = dtype.size();
  if src.len() < count * elem_size {
    return Err(ScilError::invalid_argument(format!(
      "bitpack input holds {} bytes but {} elements are expected",
      src.len(),
      count,
    )));
  }
  let chunks = src[..count * elem_size].chunks_exact(elem_size);
  let values = match dtype {
    Dtype::I8 => chunks
      .map(|c| i8::from_le_bytes(c.try_into().unwrap()) as i64)
      .collect(),
    Dtype::I16 => chunks
      .map(|c| i16::from_le_bytes(c.try_into().unwrap()) as i64)
      .collect(),
    Dtype::I32 => chunks
      .map(|c| i32::from_le_bytes(c.try_into().unwrap()) as i64)
      .collect(),
    Dtype::I64 => chunks
      .map(|c| i64::from_le_bytes(c.try_into().unwrap()))
      .collect(),
    _ => {
      return Err(ScilError::unsupported(format!(
        "bitpack cannot pack {:?}",
        dtype
      )))
    }
  };
  Ok(values)
}

fn write_signed(dtype: Dtype, value: i64, out: &mut [u8]) -> ScilResult<()> {
  match dtype {
    Dtype::I8 => out.copy_from_slice(&(value as i8).to_le_bytes()),
    Dtype::I16 => out.copy_from_slice(&(value as i16).to_le_bytes()),
    Dtype::I32 => out.copy_from_slice(&(value as i32).to_le_bytes()),
    Dtype::I64 => out.copy_from_slice(&value.to_le_bytes()),
    _ => {
      return Err(ScilError::unsupported(format!(
        "bitpack cannot unpack {:?}",
        dtype
      )))
    }
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::context::Context;
  use crate::hints::Hints;

  fn round_trip(values: &[i64]) -> (usize, Vec<i64>) {
    let dims = Dims::d1(values.len() as u64);
    let mut src = vec![0_u8; values.len() * 8];
    for (v, chunk) in values.iter().zip(src.chunks_exact_mut(8)) {
      chunk.copy_from_slice(&v.to_le_bytes());
    }
    let ctx = Context::new::<i64>(&[], Hints::default()).unwrap();
    let mut header = Vec::new();
    let mut packed = vec![0_u8; src.len() * 2 + 16];
    let written = Bitpack
      .compress(&ctx, Dtype::I64, &dims, &src, &mut header, &mut packed)
      .unwrap();
    let mut out = vec![0_u8; src.len()];
    Bitpack
      .decompress(Dtype::I64, &dims, &header, &packed[..written], &mut out)
      .unwrap();
    let recovered = out
      .chunks_exact(8)
      .map(|c| i64::from_le_bytes(c.try_into().unwrap()))
      .collect();
    (written, recovered)
  }

  #[test]
  fn test_narrow_range_packs_tightly() {
    let values: Vec<i64> = (0..1000).map(|i| 100 + (i % 7)).collect();
    let (written, recovered) = round_trip(&values);
    assert_eq!(recovered, values);
    // 7 distinct values fit in 3 bits each
    assert_eq!(written, (1000 * 3 + 7) / 8);
  }

  #[test]
  fn test_constant_input_needs_no_payload() {
    let values = vec![42_i64; 64];
    let (written, recovered) = round_trip(&values);
    assert_eq!(recovered, values);
    assert_eq!(written, 0);
  }

  #[test]
  fn test_extreme_range() {
    let values = vec![i64::MIN, i64::MAX, -1, 0, 1];
    let (written, recovered) = round_trip(&values);
    assert_eq!(recovered, values);
    assert_eq!(written, 5 * 8);
  }

  #[test]
  fn test_i16_elements() {
    let dims = Dims::d1(3);
    let values: [i16; 3] = [-5, 300, 32000];
    let mut src = vec![0_u8; 6];
    for (v, chunk) in values.iter().zip(src.chunks_exact_mut(2)) {
      chunk.copy_from_slice(&v.to_le_bytes());
    }
    let ctx = Context::new::<i16>(&[], Hints::default()).unwrap();
    let mut header = Vec::new();
    let mut packed = vec![0_u8; 64];
    let written = Bitpack
      .compress(&ctx, Dtype::I16, &dims, &src, &mut header, &mut packed)
      .unwrap();
    let mut out = vec![0_u8; 6];
    Bitpack
      .decompress(Dtype::I16, &dims, &header, &packed[..written], &mut out)
      .unwrap();
    assert_eq!(out, src);
  }
}
