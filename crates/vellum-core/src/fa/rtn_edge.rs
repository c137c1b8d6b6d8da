//! RTN edges: a reference to a terminal (by name) or to another
//! nonterminal, or epsilon (`None` in `Transition::edge`).

use crate::ids::{NonTermId, TermId};
use std::collections::BTreeMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RtnEdge {
  Terminal(TermId),
  NonTerm(NonTermId),
}

/// A priority class is a user-declared group of mutually-prioritized
/// alternatives (`a / b / c`); the rank orders them within that group.
pub type PriorityClass = u32;
pub type PriorityRank = u32;

/// Properties carried by an RTN transition: a named slot for tree-building
/// callbacks, and the priority-class -> rank map used for disambiguation
/// (populated by priority propagation, see `priority.rs`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RtnProps {
  pub slot_index: Option<u32>,
  pub slot_name: Option<String>,
  pub priorities: BTreeMap<PriorityClass, PriorityRank>,
}

/// The final marker for an RTN state: always-final-capable states carry
/// this alongside their priority map (a state can be final *and* have
/// outgoing transitions, e.g. `a -> "x" "y"?`).
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RtnFinal {
  pub priorities: BTreeMap<PriorityClass, PriorityRank>,
}
