use crate::codecs;
use crate::constants::{
  LOSSY_STAGE_MIB_PER_S, MEMCOPY_MIB_PER_S, SNAPPY_COMP_MIB_PER_S, SNAPPY_DECOMP_MIB_PER_S,
  ZSTD_COMP_MIB_PER_S, ZSTD_DECOMP_MIB_PER_S,
};
use crate::context::Context;
use crate::data_types::Dtype;
use crate::dims::Dims;
use crate::errors::ScilResult;

/// Where in a chain a stage may appear, and what its datatype contract is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageRole {
  /// Operates on the native datatype; header plus same-datatype payload.
  PrecondFirst,
  /// Quantizes the native datatype onto the i64 lattice.
  Converter,
  /// Operates on the i64 lattice; header plus i64 payload.
  PrecondSecond,
  /// Native datatype or i64 in, opaque bytes out.
  DataCompressor,
  /// Opaque bytes in and out; required lossless.
  ByteCompressor,
}

impl StageRole {
  pub fn is_compressor(&self) -> bool {
    matches!(
      self,
      StageRole::DataCompressor | StageRole::ByteCompressor
    )
  }
}

/// The operations every stage implements, byte-level.
///
/// `dtype` is the element type of the stage's native side: the input during
/// compression, the output during decompression. Compressors see `Binary`
/// output; byte compressors see `Binary` on both sides. Each op returns the
/// number of bytes written to `dst`; the executor guarantees `dst` holds at
/// least twice `src`'s length.
pub(crate) trait StageOps: Sync {
  fn compress(
    &self,
    ctx: &Context,
    dtype: Dtype,
    dims: &Dims,
    src: &[u8],
    header: &mut Vec<u8>,
    dst: &mut [u8],
  ) -> ScilResult<usize>;

  fn decompress(
    &self,
    dtype: Dtype,
    dims: &Dims,
    header: &[u8],
    src: &[u8],
    dst: &mut [u8],
  ) -> ScilResult<usize>;
}

/// A registered algorithm. Numeric ids are stable and identify stages in
/// the frame.
pub struct Algorithm {
  pub name: &'static str,
  pub id: u8,
  pub role: StageRole,
  pub is_lossy: bool,
  pub dtypes: &'static [Dtype],
  pub comp_mib_per_s: f64,
  pub decomp_mib_per_s: f64,
  pub(crate) ops: &'static dyn StageOps,
}

impl Algorithm {
  pub fn supports(&self, dtype: Dtype) -> bool {
    self.dtypes.contains(&dtype)
  }
}

impl std::fmt::Debug for Algorithm {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Algorithm")
      .field("name", &self.name)
      .field("id", &self.id)
      .field("role", &self.role)
      .field("is_lossy", &self.is_lossy)
      .field("dtypes", &self.dtypes)
      .field("comp_mib_per_s", &self.comp_mib_per_s)
      .field("decomp_mib_per_s", &self.decomp_mib_per_s)
      .finish()
  }
}

const ALL_NUMERIC: &[Dtype] = &[
  Dtype::F32,
  Dtype::F64,
  Dtype::I8,
  Dtype::I16,
  Dtype::I32,
  Dtype::I64,
];
const FLOATS: &[Dtype] = &[Dtype::F32, Dtype::F64];
const SIGNEDS: &[Dtype] = &[Dtype::I8, Dtype::I16, Dtype::I32, Dtype::I64];
const BYTES: &[Dtype] = &[Dtype::Binary];

static REGISTRY: &[Algorithm] = &[
  Algorithm {
    name: "memcopy",
    id: 0,
    role: StageRole::PrecondFirst,
    is_lossy: false,
    dtypes: ALL_NUMERIC,
    comp_mib_per_s: MEMCOPY_MIB_PER_S,
    decomp_mib_per_s: MEMCOPY_MIB_PER_S,
    ops: &codecs::memcopy::Memcopy,
  },
  Algorithm {
    name: "abstol",
    id: 1,
    role: StageRole::Converter,
    is_lossy: true,
    dtypes: ALL_NUMERIC,
    comp_mib_per_s: LOSSY_STAGE_MIB_PER_S,
    decomp_mib_per_s: LOSSY_STAGE_MIB_PER_S,
    ops: &codecs::abstol::Abstol,
  },
  Algorithm {
    name: "zstd",
    id: 2,
    role: StageRole::ByteCompressor,
    is_lossy: false,
    dtypes: BYTES,
    comp_mib_per_s: ZSTD_COMP_MIB_PER_S,
    decomp_mib_per_s: ZSTD_DECOMP_MIB_PER_S,
    ops: &codecs::zstd::Zstd,
  },
  Algorithm {
    name: "sigbits",
    id: 3,
    role: StageRole::PrecondFirst,
    is_lossy: true,
    dtypes: FLOATS,
    comp_mib_per_s: LOSSY_STAGE_MIB_PER_S,
    decomp_mib_per_s: MEMCOPY_MIB_PER_S,
    ops: &codecs::sigbits::Sigbits,
  },
  Algorithm {
    name: "reltol",
    id: 4,
    role: StageRole::Converter,
    is_lossy: true,
    dtypes: FLOATS,
    comp_mib_per_s: LOSSY_STAGE_MIB_PER_S,
    decomp_mib_per_s: LOSSY_STAGE_MIB_PER_S,
    ops: &codecs::reltol::Reltol,
  },
  Algorithm {
    name: "snappy",
    id: 5,
    role: StageRole::ByteCompressor,
    is_lossy: false,
    dtypes: BYTES,
    comp_mib_per_s: SNAPPY_COMP_MIB_PER_S,
    decomp_mib_per_s: SNAPPY_DECOMP_MIB_PER_S,
    ops: &codecs::snappy::Snappy,
  },
  Algorithm {
    name: "delta",
    id: 6,
    role: StageRole::PrecondSecond,
    is_lossy: false,
    dtypes: &[Dtype::I64],
    comp_mib_per_s: MEMCOPY_MIB_PER_S,
    decomp_mib_per_s: MEMCOPY_MIB_PER_S,
    ops: &codecs::delta::Delta,
  },
  Algorithm {
    name: "bitpack",
    id: 7,
    role: StageRole::DataCompressor,
    is_lossy: false,
    dtypes: SIGNEDS,
    comp_mib_per_s: LOSSY_STAGE_MIB_PER_S,
    decomp_mib_per_s: LOSSY_STAGE_MIB_PER_S,
    ops: &codecs::bitpack::Bitpack,
  },
];

pub(crate) fn all() -> &'static [Algorithm] {
  REGISTRY
}

pub(crate) fn by_name(name: &str) -> Option<&'static Algorithm> {
  REGISTRY.iter().find(|algo| algo.name == name)
}

pub(crate) fn by_id(id: u8) -> Option<&'static Algorithm> {
  REGISTRY.iter().find(|algo| algo.id == id)
}

/// The names of all registered stage algorithms, in id order.
pub fn available_compressors() -> Vec<&'static str> {
  REGISTRY.iter().map(|algo| algo.name).collect()
}
