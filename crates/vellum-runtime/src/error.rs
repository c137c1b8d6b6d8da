//! Runtime errors, kept deliberately smaller and flatter than
//! `vellum_core::VellumError`: the runtime never needs source locations or
//! the hint/warning/critical severity bucketing a compile-time error does.

use std::fmt::{Debug, Display, Formatter};

/// Failures encountered while loading a byte artifact (spec's "Artifact
/// errors" family). All of these are fatal to the load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
  Bitcode(vellum_bitcode::BitcodeError),
  /// A block or record referenced an index outside the table it names
  /// (e.g. a string index past the end of the strings table).
  IndexOutOfRange { what: &'static str, index: u32, len: usize },
  /// A block expected at this point in the container was missing or
  /// out of the order the loader requires to size its tables.
  MissingBlock { name: &'static str },
  /// A record carried a value this loader doesn't recognize (an unknown
  /// RTN state-kind tag, GLA prediction kind, and similar).
  MalformedRecord { detail: String },
}

impl Display for LoadError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      LoadError::Bitcode(e) => write!(f, "bitcode error: {e}"),
      LoadError::IndexOutOfRange { what, index, len } => write!(f, "{what} index {index} out of range (table has {len} entries)"),
      LoadError::MissingBlock { name } => write!(f, "artifact is missing its {name} block"),
      LoadError::MalformedRecord { detail } => write!(f, "malformed record: {detail}"),
    }
  }
}

impl std::error::Error for LoadError {}

impl From<vellum_bitcode::BitcodeError> for LoadError {
  fn from(e: vellum_bitcode::BitcodeError) -> Self {
    LoadError::Bitcode(e)
  }
}

/// Failures encountered while driving the interpreter (spec's "Parse
/// errors" family): recoverable by the client, which may discard the
/// parse-state or retry from a duplicate taken before the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
  /// No IntFA transition out of a non-final state for the current byte.
  NoIntFaTransition { offset: usize, byte: u8 },
  /// No RTN transition matches the terminal (or prediction) just produced.
  NoRtnTransition { offset: usize, terminal: u32 },
  /// No GLA transition matches the terminal just produced.
  NoGlaTransition { offset: usize, terminal: u32 },
  /// A callback asked the interpreter to stop; the parse-state is no
  /// longer resumable once this is returned.
  Cancelled,
}

impl Display for ParseError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      ParseError::NoIntFaTransition { offset, byte } => write!(f, "no lexer transition for byte {byte:#04x} at offset {offset}"),
      ParseError::NoRtnTransition { offset, terminal } => write!(f, "no parser transition for terminal #{terminal} at offset {offset}"),
      ParseError::NoGlaTransition { offset, terminal } => write!(f, "no lookahead transition for terminal #{terminal} at offset {offset}"),
      ParseError::Cancelled => write!(f, "parse cancelled by callback"),
    }
  }
}

impl std::error::Error for ParseError {}
