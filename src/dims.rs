use crate::constants::{
  EXCLUSION_ENTRY_INDEX_SIZE, FRAME_OVERHEAD, MAX_DIMS, STAGE_EXPANSION_FACTOR,
};
use crate::data_types::Dtype;
use crate::errors::{ScilError, ScilResult};

/// The shape of an N-dimensional array, with 1 to 4 axes.
///
/// Axis 0 is the innermost (fastest-varying) axis: `linear_index` follows
/// `pos[0] + len[0] * (pos[1] + len[1] * ...)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dims {
  lens: [u64; MAX_DIMS],
  ndims: usize,
}

impl Dims {
  pub fn new(lens: &[u64]) -> ScilResult<Self> {
    if lens.is_empty() || lens.len() > MAX_DIMS {
      return Err(ScilError::invalid_argument(format!(
        "dims must have 1 to {} axes; got {}",
        MAX_DIMS,
        lens.len(),
      )));
    }
    let mut res = Dims {
      lens: [1; MAX_DIMS],
      ndims: lens.len(),
    };
    res.lens[..lens.len()].copy_from_slice(lens);
    Ok(res)
  }

  pub fn d1(n: u64) -> Self {
    Self::new(&[n]).unwrap()
  }

  pub fn d2(n0: u64, n1: u64) -> Self {
    Self::new(&[n0, n1]).unwrap()
  }

  pub fn d3(n0: u64, n1: u64, n2: u64) -> Self {
    Self::new(&[n0, n1, n2]).unwrap()
  }

  pub fn d4(n0: u64, n1: u64, n2: u64, n3: u64) -> Self {
    Self::new(&[n0, n1, n2, n3]).unwrap()
  }

  pub fn ndims(&self) -> usize {
    self.ndims
  }

  pub fn lens(&self) -> &[u64] {
    &self.lens[..self.ndims]
  }

  /// Total element count, the product of all axis lengths.
  pub fn count(&self) -> u64 {
    self.lens().iter().product()
  }

  pub fn byte_size(&self, dtype: Dtype) -> u64 {
    self.count() * dtype.size() as u64
  }

  /// Row-major linear index with axis 0 innermost.
  ///
  /// Panics if `pos` has the wrong rank or is out of bounds.
  pub fn linear_index(&self, pos: &[u64]) -> u64 {
    assert_eq!(pos.len(), self.ndims, "position rank mismatch");
    let mut idx = 0;
    for axis in (0..self.ndims).rev() {
      assert!(pos[axis] < self.lens[axis], "position out of bounds");
      idx = idx * self.lens[axis] + pos[axis];
    }
    idx
  }
}

/// An upper bound on the compressed frame size for this shape and datatype.
///
/// Every stage is guaranteed an output buffer of at least twice its input,
/// and the widest intermediate payload is the i64 lattice, so the bound
/// covers twice that plus the frame sections.
pub fn compressed_size_limit(dims: &Dims, dtype: Dtype) -> u64 {
  let count = dims.count();
  let widest = dims.byte_size(dtype).max(count * 8);
  let exclusion_bound = count * (EXCLUSION_ENTRY_INDEX_SIZE + dtype.size() as u64);
  FRAME_OVERHEAD as u64 + STAGE_EXPANSION_FACTOR * widest + exclusion_bound
}

/// The minimum scratch buffer size `decompress` accepts for this shape and
/// datatype.
pub fn decompression_scratch_limit(dims: &Dims, dtype: Dtype) -> u64 {
  let widest = dims.byte_size(dtype).max(dims.count() * 8);
  FRAME_OVERHEAD as u64 + STAGE_EXPANSION_FACTOR * widest
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::data_types::Dtype;

  #[test]
  fn test_rank_limits() {
    assert!(Dims::new(&[]).is_err());
    assert!(Dims::new(&[1, 2, 3, 4, 5]).is_err());
    assert!(Dims::new(&[7]).is_ok());
  }

  #[test]
  fn test_count_and_byte_size() {
    let dims = Dims::d3(3, 4, 5);
    assert_eq!(dims.count(), 60);
    assert_eq!(dims.byte_size(Dtype::F64), 480);
    assert_eq!(dims.byte_size(Dtype::I8), 60);
    assert_eq!(Dims::d1(0).count(), 0);
  }

  #[test]
  fn test_linear_index_axis0_innermost() {
    let dims = Dims::d2(4, 3);
    assert_eq!(dims.linear_index(&[0, 0]), 0);
    assert_eq!(dims.linear_index(&[1, 0]), 1);
    assert_eq!(dims.linear_index(&[0, 1]), 4);
    assert_eq!(dims.linear_index(&[3, 2]), 11);
  }

  #[test]
  fn test_limit_covers_doubled_input() {
    let dims = Dims::d1(1000);
    let limit = compressed_size_limit(&dims, Dtype::F32);
    assert!(limit >= 2 * dims.byte_size(Dtype::F32) + FRAME_OVERHEAD as u64);
  }
}
