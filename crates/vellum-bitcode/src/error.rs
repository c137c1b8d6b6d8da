use std::fmt;

/// Low-level container errors, each mapping to a distinct bit a caller can
/// test for (per the error-handling design's "artifact errors ... map to
/// distinct bitcode-error bits so the caller can diagnose").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BitcodeError {
  BadMagic = 1,
  TruncatedStream = 2,
  ValueOutOfRange = 3,
  CorruptAbbrev = 4,
  UnbalancedBlock = 5,
}

impl BitcodeError {
  pub fn bit(self) -> u8 {
    1 << (self as u8 - 1)
  }
}

impl fmt::Display for BitcodeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let msg = match self {
      Self::BadMagic => "bad magic header",
      Self::TruncatedStream => "truncated bitcode stream",
      Self::ValueOutOfRange => "value out of range",
      Self::CorruptAbbrev => "corrupt abbreviation",
      Self::UnbalancedBlock => "unbalanced enter/end block pair",
    };
    f.write_str(msg)
  }
}

impl std::error::Error for BitcodeError {}
