use crate::bits;
use crate::context::Context;
use crate::data_types::Dtype;
use crate::dims::Dims;
use crate::errors::{ScilError, ScilResult};
use crate::registry::StageOps;

/// zstd byte-compressor adapter, the default lossless tail of every chain.
///
/// Header: raw (uncompressed) size as u64; the zstd framing itself lives in
/// the payload and stays opaque to the rest of the pipeline.
pub(crate) struct Zstd;

impl StageOps for Zstd {
  fn compress(
    &self,
    ctx: &Context,
    _dtype: Dtype,
    _dims: &Dims,
    src: &[u8],
    header: &mut Vec<u8>,
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    let level = ctx.param_i32("zstd_level")?;
    let compressed = zstd::bulk::compress(src, level)?;
    if compressed.len() > dst.len() {
      return Err(ScilError::buffer_too_small(format!(
        "zstd produced {} bytes but only {} fit",
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
        "malformed zstd stage header",
      ));
    }
    let raw_size = bits::read_u64_le(header, 0)? as usize;
    if raw_size > dst.len() {
      return Err(ScilError::buffer_too_small(format!(
        "zstd frame claims {} raw bytes but only {} fit",
        raw_size,
        dst.len(),
      )));
    }
    let raw = zstd::bulk::decompress(src, raw_size)?;
    if raw.len() != raw_size {
      return Err(ScilError::invalid_argument(format!(
        "zstd frame decompressed to {} bytes instead of the declared {}",
        raw.len(),
        raw_size,
      )));
    }
    dst[..raw_size].copy_from_slice(&raw);
    Ok(raw_size)
  }
}
