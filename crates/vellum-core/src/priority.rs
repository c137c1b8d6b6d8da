//! Priority propagation (compile §4.4): prioritized alternatives (`a / b`)
//! attach a `priority_class -> rank` pair to the epsilon edge that enters
//! each alternative. Determinization discards epsilon edges, so before an
//! RTN's NFA is determinized we walk each state's incoming epsilon chain
//! backwards and copy whatever priority entries it carries onto that
//! state's own outgoing non-epsilon transitions and final marker — the
//! only places priority information survives DFA construction.
//!
//! Unlike `nfa_to_dfa`/`minimize`, this is not generic over the FA kernel:
//! it reads and writes the `priorities` field that only `RtnProps` and
//! `RtnFinal` carry, so it is RTN-specific rather than a kernel primitive.

use crate::fa::rtn_edge::{PriorityClass, PriorityRank, RtnEdge, RtnFinal, RtnProps};
use crate::fa::{Automaton, StateIdx};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug)]
pub struct DuplicatePriorityClass {
  pub state: StateIdx,
  pub class: PriorityClass,
}

/// Walks the epsilon edges feeding into `state`, transitively, collecting
/// every `(class, rank)` pair found. Returns an error if the same class
/// appears twice with different ranks — the grammar would then be
/// ambiguous about which alternative of that class came "first".
fn inbound_priorities(
  pred_eps: &BTreeMap<StateIdx, Vec<(StateIdx, RtnProps)>>,
  state: StateIdx,
) -> Result<BTreeMap<PriorityClass, PriorityRank>, DuplicatePriorityClass> {
  let mut merged: BTreeMap<PriorityClass, PriorityRank> = BTreeMap::new();
  let mut visited: BTreeSet<StateIdx> = BTreeSet::new();
  let mut stack: Vec<StateIdx> = vec![state];
  visited.insert(state);

  while let Some(s) = stack.pop() {
    let Some(preds) = pred_eps.get(&s) else { continue };
    for (p, props) in preds {
      for (&class, &rank) in &props.priorities {
        match merged.get(&class) {
          Some(&existing) if existing != rank => {
            return Err(DuplicatePriorityClass { state, class });
          }
          _ => {
            merged.insert(class, rank);
          }
        }
      }
      if visited.insert(*p) {
        stack.push(*p);
      }
    }
  }
  Ok(merged)
}

/// Propagates priority annotations from epsilon edges onto the surviving
/// non-epsilon transitions and final markers of `fa`, in place. Call this
/// on the per-rule NFA before handing it to `nfa_to_dfa::determinize`.
pub fn propagate_priorities<K>(fa: &mut Automaton<K, RtnProps, RtnFinal>) -> Result<(), DuplicatePriorityClass> {
  let mut pred_eps: BTreeMap<StateIdx, Vec<(StateIdx, RtnProps)>> = BTreeMap::new();
  for (idx, s) in fa.states.iter().enumerate() {
    let from = idx as StateIdx;
    for t in &s.transitions {
      if t.edge.is_none() {
        pred_eps.entry(t.target).or_default().push((from, t.props.clone()));
      }
    }
  }

  let n = fa.state_count();
  let mut merged_by_state: Vec<BTreeMap<PriorityClass, PriorityRank>> = Vec::with_capacity(n);
  for s in 0..n as StateIdx {
    merged_by_state.push(inbound_priorities(&pred_eps, s)?);
  }

  for (idx, state) in fa.states.iter_mut().enumerate() {
    let merged = &merged_by_state[idx];
    if merged.is_empty() {
      continue;
    }
    for t in &mut state.transitions {
      if t.edge.is_some() {
        for (&class, &rank) in merged {
          t.props.priorities.entry(class).or_insert(rank);
        }
      }
    }
    if let Some(f) = fa.finals.get_mut(&(idx as StateIdx)) {
      for (&class, &rank) in merged {
        f.priorities.entry(class).or_insert(rank);
      }
    }
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ids::TermId;

  #[test]
  fn propagates_across_single_epsilon_hop() {
    let mut fa: Automaton<RtnEdge, RtnProps, RtnFinal> = Automaton::new();
    let mid = fa.add_state();
    let end = fa.add_state();

    let mut eps_props = RtnProps::default();
    eps_props.priorities.insert(0, 1);
    fa.add_transition(0, None, mid, eps_props);
    fa.add_transition(mid, Some(RtnEdge::Terminal(TermId(0))), end, RtnProps::default());
    fa.finals.insert(end, RtnFinal::default());

    propagate_priorities(&mut fa).expect("no conflicting priorities");

    let t = &fa.states[mid as usize].transitions[0];
    assert_eq!(t.props.priorities.get(&0), Some(&1));
  }

  #[test]
  fn rejects_conflicting_ranks_for_same_class() {
    let mut fa: Automaton<RtnEdge, RtnProps, RtnFinal> = Automaton::new();
    let mid = fa.add_state();

    let mut a = RtnProps::default();
    a.priorities.insert(0, 1);
    let mut b = RtnProps::default();
    b.priorities.insert(0, 2);
    fa.add_transition(0, None, mid, a);
    fa.add_transition(0, None, mid, b);

    let result = propagate_priorities(&mut fa);
    assert!(result.is_err());
  }
}
