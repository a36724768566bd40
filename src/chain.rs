use crate::constants::{MAX_CHAIN_STAGES, PRECONDITIONER_LIMIT};
use crate::data_types::Dtype;
use crate::errors::{ScilError, ScilResult};
use crate::registry;
use crate::registry::{Algorithm, StageRole};

/// An ordered, validated sequence of stages forming a codec.
///
/// Legal role sequences are
/// `PrecondFirst* (Converter PrecondSecond*)? (DataCompressor | ByteCompressor) ByteCompressor?`
/// with at most [`PRECONDITIONER_LIMIT`] preconditioners per bank and
/// [`MAX_CHAIN_STAGES`] stages overall.
#[derive(Clone, Debug)]
pub(crate) struct Chain {
  pub stages: Vec<&'static Algorithm>,
}

impl Chain {
  pub fn new(stages: Vec<&'static Algorithm>, dtype: Dtype) -> ScilResult<Self> {
    let chain = Chain { stages };
    chain.validate(dtype)?;
    Ok(chain)
  }

  /// Parses a forced-method string: comma-separated stage names or numeric
  /// ids, in execution order.
  pub fn from_forced(methods: &str, dtype: Dtype) -> ScilResult<Self> {
    let mut stages = Vec::new();
    for token in methods.split(',') {
      let token = token.trim();
      let algo = if let Ok(id) = token.parse::<u8>() {
        registry::by_id(id)
      } else {
        registry::by_name(token)
      };
      match algo {
        Some(algo) => stages.push(algo),
        None => {
          return Err(ScilError::unknown_algorithm(format!(
            "no algorithm named \"{}\"",
            token
          )))
        }
      }
    }
    Self::new(stages, dtype)
  }

  pub fn is_lossy(&self) -> bool {
    self.stages.iter().any(|algo| algo.is_lossy)
  }

  pub fn description(&self) -> String {
    self
      .stages
      .iter()
      .map(|algo| algo.name)
      .collect::<Vec<_>>()
      .join(",")
  }

  fn validate(&self, dtype: Dtype) -> ScilResult<()> {
    if self.stages.is_empty() {
      return Err(ScilError::invalid_argument(
        "a chain needs at least one stage",
      ));
    }
    if self.stages.len() > MAX_CHAIN_STAGES {
      return Err(ScilError::invalid_argument(format!(
        "chain of {} stages exceeds the limit of {}",
        self.stages.len(),
        MAX_CHAIN_STAGES,
      )));
    }

    let mut pre_first = 0;
    let mut pre_second = 0;
    let mut seen_converter = false;
    let mut seen_data_comp = false;
    let mut byte_comps = 0;

    let require_open = |blocked: bool, name: &str| {
      if blocked {
        Err(ScilError::invalid_argument(format!(
          "stage {} appears out of role order",
          name
        )))
      } else {
        Ok(())
      }
    };
    let require_dtype = |algo: &Algorithm, dt: Dtype| {
      if algo.supports(dt) {
        Ok(())
      } else {
        Err(ScilError::unsupported(format!(
          "stage {} does not support {:?} inputs",
          algo.name, dt
        )))
      }
    };

    for algo in &self.stages {
      let compressed = seen_data_comp || byte_comps > 0;
      match algo.role {
        StageRole::PrecondFirst => {
          require_open(seen_converter || compressed, algo.name)?;
          pre_first += 1;
          if pre_first > PRECONDITIONER_LIMIT {
            return Err(ScilError::invalid_argument(format!(
              "more than {} first-stage preconditioners",
              PRECONDITIONER_LIMIT
            )));
          }
          require_dtype(algo, dtype)?;
        }
        StageRole::Converter => {
          require_open(compressed, algo.name)?;
          if seen_converter {
            return Err(ScilError::invalid_argument(
              "a chain may hold at most one converter",
            ));
          }
          seen_converter = true;
          require_dtype(algo, dtype)?;
        }
        StageRole::PrecondSecond => {
          require_open(compressed, algo.name)?;
          if !seen_converter {
            return Err(ScilError::invalid_argument(format!(
              "second-stage preconditioner {} requires a converter before it",
              algo.name
            )));
          }
          pre_second += 1;
          if pre_second > PRECONDITIONER_LIMIT {
            return Err(ScilError::invalid_argument(format!(
              "more than {} second-stage preconditioners",
              PRECONDITIONER_LIMIT
            )));
          }
          require_dtype(algo, Dtype::I64)?;
        }
        StageRole::DataCompressor => {
          require_open(compressed, algo.name)?;
          seen_data_comp = true;
          let current = if seen_converter { Dtype::I64 } else { dtype };
          require_dtype(algo, current)?;
        }
        StageRole::ByteCompressor => {
          byte_comps += 1;
          if byte_comps > 2 || (seen_data_comp && byte_comps > 1) {
            return Err(ScilError::invalid_argument(
              "at most one trailing byte compressor is allowed",
            ));
          }
        }
      }
    }

    if !self.stages.last().unwrap().role.is_compressor() {
      return Err(ScilError::invalid_argument(
        "a chain must terminate with a data or byte compressor",
      ));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::errors::ErrorKind;

  fn forced(methods: &str, dtype: Dtype) -> ScilResult<Chain> {
    Chain::from_forced(methods, dtype)
  }

  #[test]
  fn test_token_order_is_execution_order() {
    let chain = forced("sigbits,abstol,delta,bitpack,zstd", Dtype::F64).unwrap();
    assert_eq!(
      chain.description(),
      "sigbits,abstol,delta,bitpack,zstd"
    );
    assert!(chain.is_lossy());
  }

  #[test]
  fn test_numeric_ids_resolve() {
    let chain = forced("0,2", Dtype::F32).unwrap();
    assert_eq!(chain.description(), "memcopy,zstd");
    assert!(!chain.is_lossy());
  }

  #[test]
  fn test_unknown_name() {
    let err = forced("nonexistent", Dtype::F64).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownAlgorithm);
  }

  #[test]
  fn test_grammar_rejections() {
    // no terminal compressor
    assert!(forced("memcopy", Dtype::F64).is_err());
    // second-stage preconditioner without a converter
    assert!(forced("delta,zstd", Dtype::F64).is_err());
    // preconditioner after the compressor
    assert!(forced("zstd,memcopy", Dtype::F64).is_err());
    // two converters
    assert!(forced("abstol,abstol,zstd", Dtype::F64).is_err());
    // three byte compressors
    assert!(forced("zstd,zstd,zstd", Dtype::F64).is_err());
  }

  #[test]
  fn test_dtype_gating() {
    // sigbits is float-only
    let err = forced("sigbits,zstd", Dtype::I32).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unsupported);
    // bitpack accepts the lattice a converter emits, but not raw floats
    assert!(forced("abstol,bitpack,zstd", Dtype::F64).is_ok());
    let err = forced("bitpack,zstd", Dtype::F64).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unsupported);
  }
}
