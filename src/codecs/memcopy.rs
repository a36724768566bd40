use crate::context::Context;
use crate::data_types::Dtype;
use crate::dims::Dims;
use crate::errors::ScilResult;
use crate::registry::StageOps;

/// Identity preconditioner, used when no lossy transform is selected.
pub(crate) struct Memcopy;

impl StageOps for Memcopy {
  fn compress(
    &self,
    _ctx: &Context,
    _dtype: Dtype,
    _dims: &Dims,
    src: &[u8],
    _header: &mut Vec<u8>,
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    dst[..src.len()].copy_from_slice(src);
    Ok(src.len())
  }

  fn decompress(
    &self,
    _dtype: Dtype,
    _dims: &Dims,
    _header: &[u8],
    src: &[u8],
    dst: &mut [u8],
  ) -> ScilResult<usize> {
    dst[..src.len()].copy_from_slice(src);
    Ok(src.len())
  }
}
