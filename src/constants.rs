// Bit counts fit comfortably in u32 and bit shifts on u32 are cheap.
pub type Bitlen = u32;

// shape limits
pub const MAX_DIMS: usize = 4;

// chain limits
pub const PRECONDITIONER_LIMIT: usize = 10;
pub const MAX_CHAIN_STAGES: usize = 21;

// frame layout
pub const EMPTY_FRAME_BYTE: u8 = 0;
// chain-length byte + stage ids + compressor bitmap, before the variable
// sections
pub const MAX_PREAMBLE_SIZE: usize = 1 + MAX_CHAIN_STAGES + (MAX_CHAIN_STAGES + 7) / 8;
// allowance for every stage header plus its varint length prefix
pub const MAX_HEADER_SECTION_SIZE: usize = MAX_CHAIN_STAGES * 40;
pub const FRAME_OVERHEAD: usize = MAX_PREAMBLE_SIZE + MAX_HEADER_SECTION_SIZE + 16;

// every stage is promised an output buffer of at least twice its input
pub const STAGE_EXPANSION_FACTOR: u64 = 2;

// exclusion bookkeeping: u64 index + at most 8 value bytes per entry
pub const EXCLUSION_ENTRY_INDEX_SIZE: u64 = 8;

// quantizers work a hair under the stated tolerance, on top of the output
// type's narrowing margin, so reconstruction arithmetic cannot drift past
// the bound
pub const TOLERANCE_SHAVE: f64 = 1e-9;

// declared throughputs for the chooser's speed tie-break, MiB/s
pub const MEMCOPY_MIB_PER_S: f64 = 10240.0;
pub const ZSTD_COMP_MIB_PER_S: f64 = 400.0;
pub const ZSTD_DECOMP_MIB_PER_S: f64 = 1200.0;
pub const SNAPPY_COMP_MIB_PER_S: f64 = 1500.0;
pub const SNAPPY_DECOMP_MIB_PER_S: f64 = 3000.0;
pub const LOSSY_STAGE_MIB_PER_S: f64 = 2000.0;

// defaults
pub const DEFAULT_ZSTD_LEVEL: i32 = 3;
pub const FAST_ZSTD_LEVEL: i32 = 1;

#[cfg(test)]
mod tests {
  use crate::constants::*;

  #[test]
  fn test_preamble_fits_max_chain() {
    // length byte, one id byte per stage, bitmap bit per stage
    assert!(MAX_PREAMBLE_SIZE >= 1 + MAX_CHAIN_STAGES + MAX_CHAIN_STAGES / 8);
  }

  #[test]
  fn test_chain_cap_holds_both_precond_banks() {
    assert!(MAX_CHAIN_STAGES >= 2 * PRECONDITIONER_LIMIT + 1);
  }

  #[test]
  fn test_tolerance_shave_is_small() {
    assert!(TOLERANCE_SHAVE > 0.0 && TOLERANCE_SHAVE < 1e-6);
  }
}
