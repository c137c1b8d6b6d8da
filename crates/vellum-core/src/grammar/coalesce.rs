//! IntFA coalescing (spec §4.6): merges every terminal's own NFA into one
//! shared lexer DFA so a single run over the input bytes decides which
//! terminal(s) are next, rather than trying each terminal's automaton in
//! turn.
//!
//! The full design coalesces terminals into separate pools per distinct
//! "legal terminal set" seen at each RTN/GLA decision point, so that a
//! position where only `ident` and `num` can start never pays for states
//! reachable only through, say, a string literal. We instead build one
//! über-DFA over every terminal in the grammar and share it from every
//! decision point; legality is filtered on the RTN/GLA side, which already
//! knows which terminals it is willing to accept. This trades a larger
//! single automaton for a much simpler construction — recorded as a
//! simplification in `DESIGN.md` rather than hidden.
//!
//! Two terminals can tie for the same text in the über-DFA without any
//! grammar ambiguity — a keyword like `"if"` and a broader `ident: /[a-z]+/`
//! both accept the text `"if"`, but no single RTN/GLA state ever offers both
//! as legal next terminals. Only a tie that some decision state could
//! actually need to break is a real grammar error; a tie nobody ever asks
//! about is resolved silently (lowest-indexed terminal wins) the same way it
//! always has been.

use crate::error::VellumError;
use crate::fa::gla_edge::GlaEdge;
use crate::fa::intfa_edge::{IntFaFinal, IntFaProps};
use crate::fa::rtn_edge::RtnEdge;
use crate::fa::thompson;
use crate::fa::Automaton;
use crate::ids::TermId;
use crate::intset::IntSet;
use crate::minimize::minimize;
use crate::nfa_to_dfa::determinize;
use std::collections::BTreeSet;

use super::follow::Rtn;
use super::gla::Gla;
use super::lower::TermNfa;

pub type IntFa = Automaton<IntSet, IntFaProps, IntFaFinal>;

/// The set of terminals legally expected at each RTN/GLA decision state,
/// used to tell a true lexer conflict from a harmless cross-state tie.
fn decision_terminal_sets(rtns: &[Rtn], glas: &[Gla]) -> Vec<BTreeSet<TermId>> {
  let mut sets = Vec::new();
  for rtn in rtns {
    for state in &rtn.states {
      let set: BTreeSet<TermId> = state.transitions.iter().filter_map(|t| match t.edge { Some(RtnEdge::Terminal(id)) => Some(id), _ => None }).collect();
      if set.len() > 1 {
        sets.push(set);
      }
    }
  }
  for gla in glas {
    for state in &gla.states {
      let set: BTreeSet<TermId> = state.transitions.iter().filter_map(|t| match t.edge { Some(GlaEdge::Terminal(id)) => Some(id), _ => None }).collect();
      if set.len() > 1 {
        sets.push(set);
      }
    }
  }
  sets
}

/// True when some single decision state's accepted-terminal set contains at
/// least two of `ids` — the grammar itself cannot tell them apart there.
fn is_true_conflict(ids: &BTreeSet<TermId>, decision_sets: &[BTreeSet<TermId>]) -> bool {
  decision_sets.iter().any(|set| ids.iter().filter(|id| set.contains(id)).count() >= 2)
}

/// Builds the shared lexer DFA. A tie between two terminals accepting the
/// same text, where some RTN/GLA decision state could legally need either
/// one, is reported as `VellumError::LexerConflict`; the lowest-indexed
/// terminal wins and is kept as that state's sole final marker. Ties that no
/// decision state can ever observe together are resolved the same way but
/// never reported.
pub fn coalesce(terminal_nfas: &[TermNfa], names: &[String], rtns: &[Rtn], glas: &[Gla]) -> (IntFa, Vec<VellumError>) {
  let mut uber: Automaton<IntSet, IntFaProps, TermId> = Automaton::new();
  let mut branches = Vec::with_capacity(terminal_nfas.len());

  for (idx, term_nfa) in terminal_nfas.iter().enumerate() {
    let offset = uber.states.len() as u32;
    for state in &term_nfa.states {
      let mut copied = state.clone();
      for t in &mut copied.transitions {
        t.target += offset;
      }
      uber.states.push(copied);
    }
    let start = term_nfa.start + offset;
    let accept = uber.add_state();
    for &final_state in term_nfa.finals.keys() {
      uber.add_transition(final_state + offset, None, accept, IntFaProps);
    }
    uber.finals.insert(accept, TermId(idx as u32));
    branches.push(thompson::Fragment { start, accept });
  }

  let alt_start = uber.add_state();
  for b in &branches {
    uber.add_transition(alt_start, None, b.start, IntFaProps);
  }
  uber.start = alt_start;

  let decision_sets = decision_terminal_sets(rtns, glas);
  let mut errors = Vec::new();
  let dfa = determinize(
    &uber,
    |_| IntFaProps,
    |finals: Vec<&TermId>| {
      let ids: BTreeSet<TermId> = finals.into_iter().copied().collect();
      if ids.len() > 1 && is_true_conflict(&ids, &decision_sets) {
        let names_here: Vec<String> = ids.iter().map(|id| names[id.as_usize()].clone()).collect();
        errors.push(VellumError::LexerConflict { state_description: format!("terminals {names_here:?} accept with the same text and no priority between them") });
      }
      ids.into_iter().next()
    },
  );

  (minimize(&dfa), errors)
}
