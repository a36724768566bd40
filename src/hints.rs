use crate::constants::MEMCOPY_MIB_PER_S;
use crate::errors::{ScilError, ScilResult};

const LOG2_10: f64 = 3.321928094887362;

/// The unit a throughput target is stated in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SpeedUnit {
  #[default]
  MibPerS,
  GibPerS,
  /// Relative to the declared throughput of a plain memory copy.
  RatioToMemcopy,
}

/// A compression or decompression throughput target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedHint {
  pub multiplier: f64,
  pub unit: SpeedUnit,
}

impl SpeedHint {
  pub(crate) fn mib_per_s(&self) -> f64 {
    match self.unit {
      SpeedUnit::MibPerS => self.multiplier,
      SpeedUnit::GibPerS => self.multiplier * 1024.0,
      SpeedUnit::RatioToMemcopy => self.multiplier * MEMCOPY_MIB_PER_S,
    }
  }
}

/// User-stated accuracy and performance targets.
///
/// Every field is optional; leaving them all unset demands bit-exact
/// lossless compression. The same record is used for the *effective* hints a
/// context reports back: the accuracy its chosen chain actually guarantees.
#[derive(Clone, Debug, Default, PartialEq)]
#[non_exhaustive]
pub struct Hints {
  /// Permitted worst-case absolute error, `|x - x'| <= t`. Must be
  /// positive.
  pub absolute_tolerance: Option<f64>,
  /// Permitted relative error as a percentage of each value's magnitude,
  /// in `(0, 100]`.
  pub relative_tolerance_percent: Option<f64>,
  /// Absolute floor under the relative tolerance: values so small that the
  /// relative bound would go below this floor use the floor instead. Only
  /// meaningful together with `relative_tolerance_percent`.
  pub relative_err_finest_abs_tolerance: Option<f64>,
  /// Number of leading mantissa bits to preserve, counting the implicit
  /// leading 1.
  pub significant_bits: Option<u32>,
  /// Number of significant decimal digits to preserve. When both this and
  /// `significant_bits` are given, whichever implies fewer bits wins.
  pub significant_digits: Option<u32>,
  /// Compression throughput target; steers algorithm tie-breaks only.
  pub comp_speed: Option<SpeedHint>,
  /// Decompression throughput target; steers algorithm tie-breaks only.
  pub decomp_speed: Option<SpeedHint>,
  /// Values at or above this are preserved bit-exact.
  pub lossless_data_range_from: Option<f64>,
  /// Values at or below this are preserved bit-exact.
  pub lossless_data_range_up_to: Option<f64>,
  /// A value excluded from accuracy accounting and propagated bit-exact.
  pub fill_value: Option<f64>,
  /// Comma-separated stage names or numeric ids; overrides the chooser.
  /// Token order is the execution order.
  pub force_compression_methods: Option<String>,
}

impl Hints {
  /// Whether any accuracy hint permits loss.
  pub fn has_accuracy_hint(&self) -> bool {
    self.absolute_tolerance.is_some()
      || self.relative_tolerance_percent.is_some()
      || self.significant_bits.is_some()
      || self.significant_digits.is_some()
  }

  /// The significant-bit count implied by `significant_bits` and
  /// `significant_digits` together; the coarser (fewer bits) wins.
  pub fn effective_significant_bits(&self) -> Option<u32> {
    let from_digits = self.significant_digits.map(digits_to_bits);
    match (self.significant_bits, from_digits) {
      (Some(b), Some(d)) => Some(b.min(d)),
      (Some(b), None) => Some(b),
      (None, Some(d)) => Some(d),
      (None, None) => None,
    }
  }

  pub(crate) fn check_consistent(&self) -> ScilResult<()> {
    if let Some(t) = self.absolute_tolerance {
      if !(t > 0.0) {
        return Err(ScilError::invalid_argument(format!(
          "absolute_tolerance must be positive; got {}",
          t
        )));
      }
    }
    if let Some(pct) = self.relative_tolerance_percent {
      if !(pct > 0.0 && pct <= 100.0) {
        return Err(ScilError::invalid_argument(format!(
          "relative_tolerance_percent must be in (0, 100]; got {}",
          pct
        )));
      }
    }
    if let Some(finest) = self.relative_err_finest_abs_tolerance {
      if self.relative_tolerance_percent.is_none() {
        return Err(ScilError::invalid_argument(
          "relative_err_finest_abs_tolerance is a floor for \
           relative_tolerance_percent and cannot stand alone",
        ));
      }
      if !(finest > 0.0) {
        return Err(ScilError::invalid_argument(format!(
          "relative_err_finest_abs_tolerance must be positive; got {}",
          finest
        )));
      }
    }
    if self.significant_bits == Some(0) || self.significant_digits == Some(0) {
      return Err(ScilError::invalid_argument(
        "significant bits/digits of 0 would keep nothing",
      ));
    }
    if let (Some(from), Some(up_to)) = (
      self.lossless_data_range_from,
      self.lossless_data_range_up_to,
    ) {
      if from <= up_to {
        return Err(ScilError::invalid_argument(format!(
          "lossless range from {} up to {} covers every value; drop the \
           accuracy hints instead",
          from, up_to
        )));
      }
    }
    for speed in [&self.comp_speed, &self.decomp_speed].into_iter().flatten() {
      if !(speed.multiplier > 0.0) {
        return Err(ScilError::invalid_argument(format!(
          "speed multiplier must be positive; got {}",
          speed.multiplier
        )));
      }
    }
    Ok(())
  }
}

/// Bits needed to carry `digits` significant decimal digits.
pub(crate) fn digits_to_bits(digits: u32) -> u32 {
  (digits as f64 * LOG2_10).ceil() as u32
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_digits_to_bits() {
    assert_eq!(digits_to_bits(1), 4);
    assert_eq!(digits_to_bits(3), 10);
    assert_eq!(digits_to_bits(16), 54);
  }

  #[test]
  fn test_fewer_bits_win() {
    let hints = Hints {
      significant_bits: Some(20),
      significant_digits: Some(3),
      ..Default::default()
    };
    assert_eq!(hints.effective_significant_bits(), Some(10));
  }

  #[test]
  fn test_inconsistent_hints() {
    let lone_finest = Hints {
      relative_err_finest_abs_tolerance: Some(1e-9),
      ..Default::default()
    };
    assert!(lone_finest.check_consistent().is_err());

    let all_lossless_range = Hints {
      absolute_tolerance: Some(0.1),
      lossless_data_range_from: Some(-1.0),
      lossless_data_range_up_to: Some(1.0),
      ..Default::default()
    };
    assert!(all_lossless_range.check_consistent().is_err());

    let zero_tolerance = Hints {
      absolute_tolerance: Some(0.0),
      ..Default::default()
    };
    assert!(zero_tolerance.check_consistent().is_err());
  }

  #[test]
  fn test_speed_units() {
    let hint = SpeedHint {
      multiplier: 2.0,
      unit: SpeedUnit::GibPerS,
    };
    assert_eq!(hint.mib_per_s(), 2048.0);
  }
}
