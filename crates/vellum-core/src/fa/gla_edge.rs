//! GLA edges: a terminal name or the end-of-file marker, or epsilon.

use crate::ids::TermId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GlaEdge {
  Terminal(TermId),
  Eof,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GlaProps;

/// What a GLA final state predicts: either a specific outgoing transition
/// of the RTN state being disambiguated (by index into that state's
/// transition list), or a return from the current rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum GlaPrediction {
  Transition(u32),
  Return,
}
