use crate::bits;
use crate::chain::Chain;
use crate::data_types::Dtype;
use crate::errors::{ScilError, ScilResult};
use crate::registry;
use crate::registry::Algorithm;

/// The parsed sections of a frame, borrowing the caller's buffer.
///
/// Layout, little-endian throughout:
///
/// ```text
/// byte 0               chain length L (1..=21); a single 0 byte is the
///                      empty-input sentinel handled by the executor
/// bytes 1..=L          stage numeric ids, execution order
/// next ceil(L/8) bytes is-compressor bitmap, LSB-first
/// exclusions           iff the chain is lossy: u64 count, then
///                      count x (u64 index, element value)
/// stage headers        per stage: LEB128 length, then that many bytes
/// payload              final-stage output
/// ```
#[derive(Debug)]
pub(crate) struct ParsedFrame<'a> {
  pub stages: Vec<&'static Algorithm>,
  pub exclusions: Vec<(u64, u64)>,
  pub headers: Vec<&'a [u8]>,
  pub payload: &'a [u8],
}

pub(crate) fn write_frame(
  chain: &Chain,
  exclusions: &[(u64, u64)],
  elem_size: usize,
  headers: &[Vec<u8>],
  payload: &[u8],
  dst: &mut [u8],
) -> ScilResult<usize> {
  let n_stages = chain.stages.len();
  debug_assert_eq!(headers.len(), n_stages);

  let mut meta = Vec::new();
  meta.push(n_stages as u8);
  for algo in &chain.stages {
    meta.push(algo.id);
  }
  let mut bitmap = vec![0_u8; bits::ceil_div(n_stages, 8)];
  for (i, algo) in chain.stages.iter().enumerate() {
    if algo.role.is_compressor() {
      bitmap[i / 8] |= 1 << (i % 8);
    }
  }
  meta.extend_from_slice(&bitmap);

  if chain.is_lossy() {
    bits::write_u64_le(exclusions.len() as u64, &mut meta);
    for &(index, value_bits) in exclusions {
      bits::write_u64_le(index, &mut meta);
      meta.extend_from_slice(&value_bits.to_le_bytes()[..elem_size]);
    }
  }

  for header in headers {
    bits::write_varint(header.len() as u64, &mut meta);
    meta.extend_from_slice(header);
  }

  let total = meta.len() + payload.len();
  if total > dst.len() {
    return Err(ScilError::buffer_too_small(format!(
      "frame needs {} bytes but the output buffer holds {}",
      total,
      dst.len(),
    )));
  }
  dst[..meta.len()].copy_from_slice(&meta);
  dst[meta.len()..total].copy_from_slice(payload);
  Ok(total)
}

pub(crate) fn parse_frame(frame: &[u8], dtype: Dtype) -> ScilResult<ParsedFrame> {
  if frame.is_empty() {
    return Err(ScilError::invalid_argument("frame is empty"));
  }
  let n_stages = frame[0] as usize;
  if n_stages == 0 || 1 + n_stages > frame.len() {
    return Err(ScilError::invalid_argument(format!(
      "frame declares {} stages but holds {} bytes",
      n_stages,
      frame.len(),
    )));
  }

  let mut stages = Vec::with_capacity(n_stages);
  for &id in &frame[1..1 + n_stages] {
    let algo = registry::by_id(id).ok_or_else(|| {
      ScilError::unknown_algorithm(format!(
        "frame names unregistered stage id {}",
        id
      ))
    })?;
    stages.push(algo);
  }
  // re-validating the role grammar rejects frames with shuffled stages
  let chain = Chain::new(stages, dtype)?;
  let stages = chain.stages.clone();

  let mut pos = 1 + n_stages;
  let bitmap_len = bits::ceil_div(n_stages, 8);
  if pos + bitmap_len > frame.len() {
    return Err(ScilError::invalid_argument(
      "frame ends inside the compressor bitmap",
    ));
  }
  for (i, algo) in stages.iter().enumerate() {
    let bit = frame[pos + i / 8] >> (i % 8) & 1;
    if (bit == 1) != algo.role.is_compressor() {
      return Err(ScilError::invalid_argument(format!(
        "compressor bitmap disagrees with stage {} ({})",
        i, algo.name,
      )));
    }
  }
  pos += bitmap_len;

  let mut exclusions = Vec::new();
  if chain.is_lossy() {
    let count = bits::read_u64_le(frame, pos)?;
    pos += 8;
    let elem_size = dtype.size();
    let entry_size = 8 + elem_size;
    if count > (frame.len() - pos) as u64 / entry_size as u64 {
      return Err(ScilError::invalid_argument(format!(
        "frame declares {} exclusions but cannot hold them",
        count,
      )));
    }
    exclusions.reserve(count as usize);
    for _ in 0..count {
      let index = bits::read_u64_le(frame, pos)?;
      let mut value_bytes = [0_u8; 8];
      value_bytes[..elem_size].copy_from_slice(&frame[pos + 8..pos + entry_size]);
      exclusions.push((index, u64::from_le_bytes(value_bytes)));
      pos += entry_size;
    }
  }

  let mut headers = Vec::with_capacity(n_stages);
  for _ in 0..n_stages {
    let (len, consumed) = bits::read_varint(frame, pos)?;
    pos += consumed;
    let end = pos + len as usize;
    if len > frame.len() as u64 || end > frame.len() {
      return Err(ScilError::invalid_argument(
        "frame ends inside a stage header",
      ));
    }
    headers.push(&frame[pos..end]);
    pos = end;
  }

  Ok(ParsedFrame {
    stages,
    exclusions,
    headers,
    payload: &frame[pos..],
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::ErrorKind;

  fn lossy_chain() -> Chain {
    Chain::from_forced("sigbits,abstol,delta,bitpack,zstd", Dtype::F64).unwrap()
  }

  fn headers_for(chain: &Chain) -> Vec<Vec<u8>> {
    chain
      .stages
      .iter()
      .enumerate()
      .map(|(i, _)| vec![i as u8; i])
      .collect()
  }

  #[test]
  fn test_frame_round_trip() {
    let chain = lossy_chain();
    let headers = headers_for(&chain);
    let exclusions = vec![(3, f64::NAN.to_bits()), (9, 0)];
    let payload = [1, 2, 3, 4, 5];
    let mut dst = vec![0_u8; 4096];
    let written =
      write_frame(&chain, &exclusions, 8, &headers, &payload, &mut dst).unwrap();

    let parsed = parse_frame(&dst[..written], Dtype::F64).unwrap();
    assert_eq!(parsed.stages.len(), 5);
    assert_eq!(parsed.exclusions, exclusions);
    assert_eq!(parsed.headers.len(), headers.len());
    for (parsed_header, header) in parsed.headers.iter().zip(&headers) {
      assert_eq!(parsed_header, &header.as_slice());
    }
    assert_eq!(parsed.payload, &payload);
  }

  #[test]
  fn test_unknown_stage_id() {
    let frame = [1_u8, 250, 0];
    let err = parse_frame(&frame, Dtype::F64).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownAlgorithm);
  }

  #[test]
  fn test_bitmap_mismatch_rejected() {
    let chain = Chain::from_forced("memcopy,zstd", Dtype::F64).unwrap();
    let headers = vec![Vec::new(), vec![0; 8]];
    let mut dst = vec![0_u8; 256];
    let written =
      write_frame(&chain, &[], 8, &headers, &[7; 3], &mut dst).unwrap();
    // flip memcopy's bitmap bit
    dst[3] ^= 1;
    assert!(parse_frame(&dst[..written], Dtype::F64).is_err());
  }

  #[test]
  fn test_truncated_frame_rejected() {
    let chain = lossy_chain();
    let headers = headers_for(&chain);
    let mut dst = vec![0_u8; 4096];
    let written =
      write_frame(&chain, &[(0, 0)], 8, &headers, &[9; 10], &mut dst).unwrap();
    for cut in [2, written / 3, written / 2] {
      assert!(parse_frame(&dst[..cut], Dtype::F64).is_err());
    }
  }
}
