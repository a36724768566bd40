#![doc = include_str!("../README.md")]
//! # API Notes
//!
//! * Contexts are immutable after creation and may be shared across threads
//! for concurrent work on *different* buffers; scratch and output buffers
//! must never be shared between concurrent calls.
//! * On any error the output buffer is left in an unspecified state and
//! must not be consumed.

pub use context::Context;
pub use data_types::{Dtype, Float, Number};
pub use dims::{compressed_size_limit, decompression_scratch_limit, Dims};
pub use errors::{ErrorKind, ScilError, ScilResult};
pub use hints::{Hints, SpeedHint, SpeedUnit};
pub use registry::{available_compressors, Algorithm, StageRole};

pub mod data_types;
pub mod errors;

mod bits;
mod chain;
mod chooser;
mod codecs;
mod constants;
mod context;
mod dims;
mod frame;
mod hints;
mod pipeline;
mod registry;
mod validator;

/// Compresses `nums` with the context's chain, writing a self-describing
/// frame into `dst` and returning its size.
///
/// `dst` should hold [`compressed_size_limit`] bytes; smaller buffers fail
/// with [`ErrorKind::BufferTooSmall`] once the frame outgrows them. A
/// zero-element input produces a 1-byte sentinel frame.
pub fn compress<T: Number>(
  ctx: &Context,
  nums: &[T],
  dims: &Dims,
  dst: &mut [u8],
) -> ScilResult<usize> {
  pipeline::compress(ctx, nums, dims, dst)
}

/// Reconstructs the array held in `frame` into `dst`.
///
/// The frame is self-describing, so no context is needed: only the
/// datatype (via `T`), the dims, and a scratch buffer of at least
/// [`decompression_scratch_limit`] bytes.
pub fn decompress<T: Number>(
  dims: &Dims,
  frame: &[u8],
  scratch: &mut [u8],
  dst: &mut [T],
) -> ScilResult<()> {
  pipeline::decompress(dims, frame, scratch, dst)
}

/// Decompresses `frame` and verifies the reconstruction stays within the
/// context's effective hints, returning the observed worst-case accuracy.
///
/// Accuracy violations surface here as errors; `compress` and `decompress`
/// never check accuracy themselves.
pub fn validate<T: Number>(
  ctx: &Context,
  original: &[T],
  dims: &Dims,
  frame: &[u8],
) -> ScilResult<Hints> {
  validator::validate(ctx, original, dims, frame)
}

#[cfg(test)]
mod tests;
