//! Compile-time error and warning types, plus the severity bitmask and
//! grouping helpers used to print and filter them.

use crate::token::Token;
use std::fmt::{Debug, Display, Formatter};

#[bitmask_enum::bitmask]
pub enum VellumSeverity {
  Hint = 0b100,
  Warning = 0b10,
  Critical = 0b1,
}

#[derive(Debug, Clone)]
pub enum VellumError {
  /// An error anchored to a location in grammar source: undefined symbol,
  /// redefinition, malformed rule, and similar.
  GrammarError { message: String, source_name: String, token: Option<Token> },
  /// Left recursion detected in a rule's derivation.
  LeftRecursion { nonterminal: String, token: Option<Token> },
  /// A rule has no alternative that does not recurse into itself.
  NoBaseCase { nonterminal: String, token: Option<Token> },
  /// A prioritized alternative can never be reached because an earlier
  /// alternative in the same priority class already accepts everything it
  /// would accept.
  UnreachableAlternative { nonterminal: String, token: Option<Token> },
  /// Two terminals' IntFAs, coalesced into the same lexer state, both
  /// accept with no priority to break the tie.
  LexerConflict { state_description: String },
  /// The grammar requires more lookahead than the configured `max_k`, or
  /// the LL(*) construction's termination heuristic gave up.
  AmbiguousGrammar { nonterminal: String, histories: Vec<String> },
  /// Wraps an underlying bitcode I/O failure encountered while emitting
  /// a compiled artifact.
  Bitcode(vellum_bitcode::BitcodeError),
  /// A grouping of several errors collected during one compile pass.
  Many(Vec<VellumError>),
}

impl VellumError {
  pub fn severity(&self) -> VellumSeverity {
    match self {
      VellumError::Many(errs) => errs.iter().map(VellumError::severity).fold(VellumSeverity::none(), |a, b| a | b),
      _ => VellumSeverity::Critical,
    }
  }
}

impl Display for VellumError {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      VellumError::GrammarError { message, source_name, token } => match token {
        Some(t) => write!(f, "{}:{}: {}", source_name, t.loc_stub(), message),
        None => write!(f, "{}: {}", source_name, message),
      },
      VellumError::LeftRecursion { nonterminal, .. } => {
        write!(f, "left recursion in `{nonterminal}`: no input is consumed before it recurses into itself")
      }
      VellumError::NoBaseCase { nonterminal, .. } => {
        write!(f, "`{nonterminal}` has no alternative that does not recurse into itself")
      }
      VellumError::UnreachableAlternative { nonterminal, .. } => {
        write!(f, "an alternative of `{nonterminal}` can never be reached; an earlier, higher-priority alternative already accepts everything it would")
      }
      VellumError::LexerConflict { state_description } => {
        write!(f, "lexer conflict: {state_description}")
      }
      VellumError::AmbiguousGrammar { nonterminal, histories } => {
        writeln!(f, "`{nonterminal}` is ambiguous; divergent paths:")?;
        for (i, h) in histories.iter().enumerate() {
          writeln!(f, "  path {i}: {h}")?;
        }
        Ok(())
      }
      VellumError::Bitcode(e) => write!(f, "bitcode error: {e}"),
      VellumError::Many(errs) => {
        for e in errs {
          writeln!(f, "{e}")?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for VellumError {}

impl From<vellum_bitcode::BitcodeError> for VellumError {
  fn from(e: vellum_bitcode::BitcodeError) -> Self {
    VellumError::Bitcode(e)
  }
}

/// Splits a flat error list into hints, warnings, and critical errors, the
/// way a CLI front-end chooses how much to print and whether to fail.
#[derive(Debug, Default)]
pub struct ErrorGroups {
  pub hints: Vec<VellumError>,
  pub warnings: Vec<VellumError>,
  pub critical: Vec<VellumError>,
}

impl ErrorGroups {
  pub fn from_errors(errors: impl IntoIterator<Item = VellumError>) -> Self {
    let mut groups = ErrorGroups::default();
    for e in errors {
      let sev = e.severity();
      if sev.contains(VellumSeverity::Critical) {
        groups.critical.push(e);
      } else if sev.contains(VellumSeverity::Warning) {
        groups.warnings.push(e);
      } else {
        groups.hints.push(e);
      }
    }
    groups
  }

  pub fn has_critical(&self) -> bool {
    !self.critical.is_empty()
  }
}

pub trait VellumErrorContainer {
  fn errors(&self) -> &[VellumError];
  fn has_errors(&self) -> bool {
    !self.errors().is_empty()
  }
}
