use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::data_types::Number;
use crate::dims::{compressed_size_limit, decompression_scratch_limit, Dims};
use crate::Context;

pub fn compress_to_vec<T: Number>(ctx: &Context, nums: &[T], dims: &Dims) -> Vec<u8> {
  let mut frame = vec![0_u8; compressed_size_limit(dims, T::DTYPE) as usize];
  let written = crate::compress(ctx, nums, dims, &mut frame).unwrap();
  frame.truncate(written);
  frame
}

pub fn decompress_frame<T: Number>(frame: &[u8], dims: &Dims) -> Vec<T> {
  let mut scratch = vec![0_u8; decompression_scratch_limit(dims, T::DTYPE) as usize];
  let mut out = vec![T::default(); dims.count() as usize];
  crate::decompress(dims, frame, &mut scratch, &mut out).unwrap();
  out
}

pub fn round_trip<T: Number>(ctx: &Context, nums: &[T]) -> Vec<T> {
  let dims = Dims::d1(nums.len() as u64);
  let frame = compress_to_vec(ctx, nums, &dims);
  decompress_frame(&frame, &dims)
}

pub fn uniform_f64s(n: usize, lo: f64, hi: f64, seed: u64) -> Vec<f64> {
  let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
  (0..n).map(|_| rng.gen_range(lo..hi)).collect()
}
