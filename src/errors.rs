use std::error::Error;
use std::fmt::{Display, Formatter};
use std::{fmt, io};

/// The different kinds of errors the library can return.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
  /// `InvalidArgument` errors indicate the parameters provided to a
  /// function were invalid or mutually inconsistent: bad dims, conflicting
  /// hints, a chain that cannot run, or a frame that violates the format.
  InvalidArgument,
  /// `Unknown` errors are propagated from byte-compressor back-ends or
  /// other places the library cannot classify further.
  Unknown,
  /// `Unsupported` errors indicate a datatype/algorithm combination the
  /// registry cannot satisfy.
  Unsupported,
  /// `BufferTooSmall` errors indicate a caller-provided output or scratch
  /// buffer was smaller than the documented bound.
  BufferTooSmall,
  /// `LossyForbidden` errors occur when a forced chain contains a lossy
  /// stage but no accuracy hint permits loss.
  LossyForbidden,
  /// `UnknownAlgorithm` errors occur when `force_compression_methods`
  /// names something the registry does not contain.
  UnknownAlgorithm,
}

impl ErrorKind {
  /// The stable numeric code for this kind of error.
  ///
  /// Code 0 is reserved for the absence of an error.
  pub fn code(&self) -> u8 {
    match self {
      ErrorKind::InvalidArgument => 1,
      ErrorKind::Unknown => 2,
      ErrorKind::Unsupported => 3,
      ErrorKind::BufferTooSmall => 4,
      ErrorKind::LossyForbidden => 5,
      ErrorKind::UnknownAlgorithm => 6,
    }
  }
}

/// The error type used in results for all `scil` functionality.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScilError {
  pub kind: ErrorKind,
  pub message: String,
}

impl ScilError {
  pub(crate) fn new<S: AsRef<str>>(kind: ErrorKind, message: S) -> Self {
    ScilError {
      kind,
      message: message.as_ref().to_string(),
    }
  }

  pub(crate) fn invalid_argument<S: AsRef<str>>(message: S) -> Self {
    Self::new(ErrorKind::InvalidArgument, message)
  }

  pub(crate) fn unknown<S: AsRef<str>>(message: S) -> Self {
    Self::new(ErrorKind::Unknown, message)
  }

  pub(crate) fn unsupported<S: AsRef<str>>(message: S) -> Self {
    Self::new(ErrorKind::Unsupported, message)
  }

  pub(crate) fn buffer_too_small<S: AsRef<str>>(message: S) -> Self {
    Self::new(ErrorKind::BufferTooSmall, message)
  }

  pub(crate) fn lossy_forbidden<S: AsRef<str>>(message: S) -> Self {
    Self::new(ErrorKind::LossyForbidden, message)
  }

  pub(crate) fn unknown_algorithm<S: AsRef<str>>(message: S) -> Self {
    Self::new(ErrorKind::UnknownAlgorithm, message)
  }
}

impl Display for ScilError {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "scil {:?} error: {}",
      self.kind, &self.message
    )
  }
}

impl From<io::Error> for ScilError {
  fn from(err: io::Error) -> Self {
    ScilError::unknown(format!("{}", err))
  }
}

impl Error for ScilError {}

pub type ScilResult<T> = Result<T, ScilError>;
