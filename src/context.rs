use std::collections::HashMap;

use crate::chain::Chain;
use crate::chooser;
use crate::data_types::{Dtype, Number};
use crate::errors::{ScilError, ScilResult};
use crate::hints::Hints;

/// A resolved compression configuration, immutable after creation.
///
/// Holds the datatype, the user hints, the effective hints realized by the
/// chosen chain, the bit patterns of values that must survive round-trips
/// unchanged, and the stage parameter dictionary. A context may be shared
/// across threads for concurrent compression or decompression of different
/// buffers; dropping it releases everything it owns.
#[derive(Debug)]
pub struct Context {
  datatype: Dtype,
  hints: Hints,
  effective_hints: Hints,
  special_values: Vec<u64>,
  pub(crate) chain: Chain,
  params: HashMap<String, String>,
  lossless_compression_needed: bool,
}

impl Context {
  /// Resolves `hints` into a concrete chain for `T`'s datatype.
  ///
  /// `special_values` lists values that must round-trip bit-exact
  /// regardless of lossy settings.
  pub fn new<T: Number>(special_values: &[T], hints: Hints) -> ScilResult<Self> {
    hints.check_consistent()?;
    let datatype = T::DTYPE;
    let resolution = chooser::choose(datatype, &hints)?;
    Ok(Context {
      datatype,
      lossless_compression_needed: !hints.has_accuracy_hint(),
      hints,
      effective_hints: resolution.effective_hints,
      special_values: special_values
        .iter()
        .map(|value| value.to_bits_u64())
        .collect(),
      chain: resolution.chain,
      params: resolution.params,
    })
  }

  pub fn datatype(&self) -> Dtype {
    self.datatype
  }

  /// The hints the context was created with.
  pub fn hints(&self) -> &Hints {
    &self.hints
  }

  /// The accuracy bounds the chosen chain actually guarantees; this is
  /// what [`validate`][crate::validate] enforces.
  pub fn effective_hints(&self) -> &Hints {
    &self.effective_hints
  }

  /// The chain's stage names in execution order, comma-separated.
  pub fn chain_description(&self) -> String {
    self.chain.description()
  }

  pub fn lossless_compression_needed(&self) -> bool {
    self.lossless_compression_needed
  }

  pub(crate) fn special_value_bits(&self) -> &[u64] {
    &self.special_values
  }

  pub(crate) fn param(&self, key: &str) -> Option<&str> {
    self.params.get(key).map(|value| value.as_str())
  }

  pub(crate) fn param_f64(&self, key: &str) -> ScilResult<f64> {
    self
      .param(key)
      .and_then(|raw| raw.parse().ok())
      .ok_or_else(|| {
        ScilError::invalid_argument(format!(
          "pipeline parameter {} is missing or malformed",
          key
        ))
      })
  }

  pub(crate) fn param_u32(&self, key: &str) -> ScilResult<u32> {
    self
      .param(key)
      .and_then(|raw| raw.parse().ok())
      .ok_or_else(|| {
        ScilError::invalid_argument(format!(
          "pipeline parameter {} is missing or malformed",
          key
        ))
      })
  }

  pub(crate) fn param_i32(&self, key: &str) -> ScilResult<i32> {
    self
      .param(key)
      .and_then(|raw| raw.parse().ok())
      .ok_or_else(|| {
        ScilError::invalid_argument(format!(
          "pipeline parameter {} is missing or malformed",
          key
        ))
      })
  }
}
