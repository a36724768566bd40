use std::collections::HashMap;

use tracing::debug;

use crate::chain::Chain;
use crate::constants::{DEFAULT_ZSTD_LEVEL, FAST_ZSTD_LEVEL, ZSTD_COMP_MIB_PER_S};
use crate::data_types::Dtype;
use crate::errors::{ScilError, ScilResult};
use crate::hints::Hints;
use crate::registry;
use crate::registry::Algorithm;

/// The outcome of resolving hints against the registry: a runnable chain,
/// the accuracy it guarantees, and the parameters its stages will read.
#[derive(Debug)]
pub(crate) struct Resolution {
  pub chain: Chain,
  pub effective_hints: Hints,
  pub params: HashMap<String, String>,
}

pub(crate) fn choose(dtype: Dtype, hints: &Hints) -> ScilResult<Resolution> {
  let lossless_needed = !hints.has_accuracy_hint();

  let chain = if let Some(forced) = &hints.force_compression_methods {
    let chain = Chain::from_forced(forced, dtype)?;
    if lossless_needed && chain.is_lossy() {
      return Err(ScilError::lossy_forbidden(format!(
        "forced chain {} contains a lossy stage but no accuracy hint \
         permits loss",
        chain.description(),
      )));
    }
    chain
  } else {
    heuristic_chain(dtype, hints)?
  };

  let resolution = finalize(chain, dtype, hints)?;
  debug!(
    chain = %resolution.chain.description(),
    lossy = resolution.chain.is_lossy(),
    "resolved compression chain"
  );
  Ok(resolution)
}

/// Builds a chain from the hints alone: the strictest applicable lossy
/// stages, then a lossless tail.
fn heuristic_chain(dtype: Dtype, hints: &Hints) -> ScilResult<Chain> {
  let byte = pick_byte_compressor(hints);
  let mut stages: Vec<&'static Algorithm> = Vec::new();

  if !hints.has_accuracy_hint() {
    stages.push(named("memcopy"));
    stages.push(byte);
    return Chain::new(stages, dtype);
  }

  if hints.effective_significant_bits().is_some() {
    if !dtype.is_float() {
      return Err(ScilError::unsupported(format!(
        "significant-bit truncation is not available for {:?}",
        dtype
      )));
    }
    stages.push(named("sigbits"));
  }

  let quantizer = if hints.absolute_tolerance.is_some() {
    Some(named("abstol"))
  } else if hints.relative_tolerance_percent.is_some() {
    if !dtype.is_float() {
      return Err(ScilError::unsupported(format!(
        "relative tolerance is not available for {:?}",
        dtype
      )));
    }
    Some(named("reltol"))
  } else {
    None
  };
  if let Some(converter) = quantizer {
    stages.push(converter);
    stages.push(named("delta"));
    stages.push(named("bitpack"));
  }

  stages.push(byte);
  Chain::new(stages, dtype)
}

/// zstd wins the id tie-break; a throughput hint beyond zstd's declared
/// speed switches to snappy.
fn pick_byte_compressor(hints: &Hints) -> &'static Algorithm {
  let zstd = named("zstd");
  let wants_faster_comp = hints
    .comp_speed
    .is_some_and(|speed| speed.mib_per_s() > zstd.comp_mib_per_s);
  let wants_faster_decomp = hints
    .decomp_speed
    .is_some_and(|speed| speed.mib_per_s() > zstd.decomp_mib_per_s);
  if wants_faster_comp || wants_faster_decomp {
    named("snappy")
  } else {
    zstd
  }
}

/// Walks the chosen chain, computing the accuracy it realizes and the
/// parameters each stage reads at compression time. Fails if a stage's
/// controlling hint is missing, which can only happen on the forced path.
fn finalize(chain: Chain, dtype: Dtype, hints: &Hints) -> ScilResult<Resolution> {
  let mut effective = Hints::default();
  let mut params = HashMap::new();
  let mut rel_pct = 0.0_f64;

  for algo in &chain.stages {
    match algo.name {
      "sigbits" => {
        let wanted = hints.effective_significant_bits().ok_or_else(|| {
          ScilError::invalid_argument(
            "a sigbits stage requires significant_bits or significant_digits",
          )
        })?;
        let max_bits = match dtype {
          Dtype::F32 => 24,
          _ => 53,
        };
        let k = wanted.min(max_bits);
        effective.significant_bits = Some(k);
        rel_pct += 100.0 * (2.0_f64).powi(-(k as i32 - 1));
        params.insert("sigbits_k".to_string(), k.to_string());
      }
      "abstol" => {
        let tolerance = hints.absolute_tolerance.ok_or_else(|| {
          ScilError::invalid_argument(
            "an abstol stage requires absolute_tolerance",
          )
        })?;
        effective.absolute_tolerance = Some(tolerance);
        params.insert(
          "abstol_tolerance".to_string(),
          format!("{:e}", tolerance),
        );
      }
      "reltol" => {
        let pct = hints.relative_tolerance_percent.ok_or_else(|| {
          ScilError::invalid_argument(
            "a reltol stage requires relative_tolerance_percent",
          )
        })?;
        let finest = hints
          .relative_err_finest_abs_tolerance
          .unwrap_or(f64::MIN_POSITIVE);
        rel_pct += pct;
        effective.relative_err_finest_abs_tolerance = Some(finest);
        params.insert("reltol_percent".to_string(), format!("{:e}", pct));
        params.insert("reltol_finest".to_string(), format!("{:e}", finest));
      }
      "zstd" => {
        let level = if hints
          .comp_speed
          .is_some_and(|speed| speed.mib_per_s() > ZSTD_COMP_MIB_PER_S / 2.0)
        {
          FAST_ZSTD_LEVEL
        } else {
          DEFAULT_ZSTD_LEVEL
        };
        params.insert("zstd_level".to_string(), level.to_string());
      }
      _ => (),
    }
  }

  if rel_pct > 0.0 {
    effective.relative_tolerance_percent = Some(rel_pct);
  }
  effective.fill_value = hints.fill_value;
  effective.lossless_data_range_from = hints.lossless_data_range_from;
  effective.lossless_data_range_up_to = hints.lossless_data_range_up_to;

  Ok(Resolution {
    chain,
    effective_hints: effective,
    params,
  })
}

fn named(name: &str) -> &'static Algorithm {
  registry::by_name(name).expect("registry is missing a built-in algorithm")
}
