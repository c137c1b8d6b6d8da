//! Client callback surface (spec §6.4's `bind_grammar`). The interpreter is
//! generic over anything implementing `ParseCallbacks` so a client can close
//! over tree-building state without the runtime boxing or dispatching
//! dynamically on every terminal.

use crate::types::LoadedGrammar;
use std::sync::Arc;

/// Returned by `terminal` to let a callback ask the interpreter to stop at
/// the next instruction boundary (spec §5 "a callback may request
/// cancellation").
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlFlow {
  Continue,
  Cancel,
}

/// The three notifications a bound grammar's client receives, fired in the
/// order spec §5 mandates: rule-start precedes every terminal callback for
/// terminals inside it, rule-end follows them, and terminal callbacks fire
/// in input order.
pub trait ParseCallbacks {
  fn start_rule(&mut self, rule: u32);
  fn end_rule(&mut self, rule: u32);
  fn terminal(&mut self, terminal: u32, offset: usize, len: usize) -> ControlFlow;
}

/// A loaded grammar paired with the callbacks that will observe parses
/// driven against it. Cheap to clone: the grammar is shared via `Arc`, only
/// the callbacks are owned.
pub struct BoundGrammar<C: ParseCallbacks> {
  pub grammar: Arc<LoadedGrammar>,
  pub callbacks: C,
}

pub fn bind_grammar<C: ParseCallbacks>(grammar: Arc<LoadedGrammar>, callbacks: C) -> BoundGrammar<C> {
  BoundGrammar { grammar, callbacks }
}
