use crate::bits;
use crate::context::Context;
use crate::data_types::Dtype;
use crate::dims::Dims;
use crate::errors::{ScilError, ScilResult};
use crate::registry::StageOps;

/// snappy byte-compressor adapter, chosen over zstd when a throughput hint
/// outruns zstd's declared speed.
///
/// Header: raw (uncompressed) size as u64.
pub(crate) struct Snappy;

impl StageOps for Snappy {
  fn compress(
    &self,
    _ctx: &Context,
    _dtype: Dtype,
    _dims: &Dims,
    src: &[u8],
    header: &mut Vec<u8>,
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    let compressed = snap::raw::Encoder::new()
      .compress_vec(src)
      .map_err(|err| ScilError::unknown(format!("snappy: {}", err)))?;
    if compressed.len() > dst.len() {
      return Err(ScilError::buffer_too_small(format!(
        "snappy produced {} bytes but only {} fit",
        compressed.len(),
        dst.len(),
      )));
    }
    bits::write_u64_le(src.len() as u64, header);
    dst[..compressed.len()].copy_from_slice(&compressed);
    Ok(compressed.len())
  }

  fn decompress(
    &self,
    _dtype: Dtype,
    _dims: &Dims,
    header: &[u8],
    src: &[u8],
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    if header.len() != 8 {
      return Err(ScilError::invalid_argument(
        "malformed snappy stage header",
      ));
    }
    let raw_size = bits::read_u64_le(header, 0)? as usize;
    if raw_size > dst.len() {
      return Err(ScilError::buffer_too_small(format!(
        "snappy frame claims {} raw bytes but only {} fit",
        raw_size,
        dst.len(),
      )));
    }
    let raw = snap::raw::Decoder::new()
      .decompress_vec(src)
      .map_err(|err| ScilError::unknown(format!("snappy: {}", err)))?;
    if raw.len() != raw_size {
      return Err(ScilError::invalid_argument(format!(
        "snappy frame decompressed to {} bytes instead of the declared {}",
        raw.len(),
        raw_size,
      )));
    }
    dst[..raw_size].copy_from_slice(&raw);
    Ok(raw_size)
  }
}
