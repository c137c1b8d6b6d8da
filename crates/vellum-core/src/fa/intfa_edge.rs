//! IntFA edges: byte/codepoint ranges, the alphabet `NFA→DFA` partitions
//! via [`crate::intset::equivalence_classes`].

use crate::intset::IntSet;

/// Properties attached to an IntFA transition. IntFAs are pure lexers, so
/// transitions carry no slot/priority metadata — only the states and edges
/// matter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntFaProps;

/// The final marker for an IntFA accept state: the terminal it recognizes.
/// During determinization, multiple NFA finals may collapse into the same
/// DFA state; when that happens and more than one distinct terminal
/// survives, it signals a lexer conflict (see `coalesce.rs`).
pub type IntFaFinal = crate::ids::TermId;
