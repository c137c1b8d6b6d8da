//! Generic NFA→DFA determinization, shared by IntFA and RTN construction.
//! Works over any discrete-or-interval edge-value type `K` that knows how
//! to partition a collection of its own values into equivalence classes —
//! for `IntSet` that is the real equivalence-class algorithm over byte
//! ranges; for the opaque terminal-name/nonterminal-reference keys used by
//! RTNs it degenerates to "each distinct value is its own class", since
//! those keys are atomic rather than interval-shaped.

use crate::fa::{epsilon_closure, Automaton, State, StateIdx, Transition};
use crate::fa::gla_edge::GlaEdge;
use crate::fa::rtn_edge::RtnEdge;
use crate::intset::{equivalence_classes, IntSet};
use std::collections::{BTreeMap, VecDeque};

/// A key type whose values can be partitioned into equivalence classes,
/// each wholly inside or wholly outside every value being partitioned.
pub trait Partitionable: Clone {
  fn partition(values: &[Self]) -> Vec<Self>;
  fn overlaps(&self, class: &Self) -> bool;
}

impl Partitionable for IntSet {
  fn partition(values: &[Self]) -> Vec<Self> {
    equivalence_classes(values)
  }

  fn overlaps(&self, class: &Self) -> bool {
    class.sample_element().map(|v| self.contains(v)).unwrap_or(false)
  }
}

impl Partitionable for RtnEdge {
  fn partition(values: &[Self]) -> Vec<Self> {
    let mut v: Vec<Self> = values.to_vec();
    v.sort();
    v.dedup();
    v
  }

  fn overlaps(&self, class: &Self) -> bool {
    self == class
  }
}

impl Partitionable for GlaEdge {
  fn partition(values: &[Self]) -> Vec<Self> {
    let mut v: Vec<Self> = values.to_vec();
    v.sort();
    v.dedup();
    v
  }

  fn overlaps(&self, class: &Self) -> bool {
    self == class
  }
}

/// Determinizes `nfa` into a DFA. `merge_props` combines the properties of
/// every NFA transition that collapses into one DFA transition.
/// `merge_finals` combines the final markers of every NFA final state that
/// collapses into one DFA state; returning `None` means the resulting DFA
/// state is not final (not used by any caller here, but kept for
/// generality).
pub fn determinize<K, P, FIn, FOut>(
  nfa: &Automaton<K, P, FIn>,
  merge_props: impl Fn(Vec<&P>) -> P,
  merge_finals: impl Fn(Vec<&FIn>) -> Option<FOut>,
) -> Automaton<K, P, FOut>
where
  K: Partitionable + Ord,
{
  let mut dfa_states: Vec<State<K, P>> = vec![State::default()];
  let mut dfa_finals: BTreeMap<StateIdx, FOut> = BTreeMap::new();
  let mut state_for_closure: BTreeMap<Vec<StateIdx>, StateIdx> = BTreeMap::new();
  let mut queue: VecDeque<Vec<StateIdx>> = VecDeque::new();

  let start_closure = epsilon_closure(nfa, [nfa.start]);
  state_for_closure.insert(start_closure.clone(), 0);
  queue.push_back(start_closure);

  while let Some(closure) = queue.pop_front() {
    let dfa_state = state_for_closure[&closure];

    let finals_here: Vec<&FIn> = closure.iter().filter_map(|s| nfa.finals.get(s)).collect();
    if !finals_here.is_empty() {
      if let Some(f) = merge_finals(finals_here) {
        dfa_finals.insert(dfa_state, f);
      }
    }

    let mut values: Vec<K> = Vec::new();
    for &s in &closure {
      for t in &nfa.states[s as usize].transitions {
        if let Some(k) = &t.edge {
          values.push(k.clone());
        }
      }
    }
    let classes = K::partition(&values);

    for class in classes {
      let mut targets: Vec<StateIdx> = Vec::new();
      let mut props_list: Vec<&P> = Vec::new();
      for &s in &closure {
        for t in &nfa.states[s as usize].transitions {
          if let Some(k) = &t.edge {
            if k.overlaps(&class) {
              targets.push(t.target);
              props_list.push(&t.props);
            }
          }
        }
      }
      if targets.is_empty() {
        continue;
      }
      let next_closure = epsilon_closure(nfa, targets);
      let target_state = match state_for_closure.get(&next_closure) {
        Some(&id) => id,
        None => {
          let id = dfa_states.len() as StateIdx;
          dfa_states.push(State::default());
          state_for_closure.insert(next_closure.clone(), id);
          queue.push_back(next_closure);
          id
        }
      };
      let props = merge_props(props_list);
      dfa_states[dfa_state as usize].transitions.push(Transition { edge: Some(class), target: target_state, props });
    }
  }

  Automaton { states: dfa_states, start: 0, finals: dfa_finals }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fa::intfa_edge::{IntFaFinal, IntFaProps};
  use crate::ids::TermId;

  /// Builds the NFA for `a+` via Thompson concat/kleene by hand and checks
  /// the determinized DFA accepts exactly that language over a small
  /// alphabet.
  #[test]
  fn determinizes_simple_repetition() {
    let mut nfa: Automaton<IntSet, IntFaProps, IntFaFinal> = Automaton::new();
    // state 0 --a--> 1 --eps--> 0 (loop back) and 1 is final.
    let s1 = nfa.add_state();
    nfa.add_transition(0, Some(IntSet::single(b'a' as u32)), s1, IntFaProps);
    nfa.add_transition(s1, None, 0, IntFaProps);
    nfa.finals.insert(s1, TermId(0));

    let dfa = determinize(
      &nfa,
      |_| IntFaProps,
      |finals| finals.into_iter().copied().next(),
    );

    // Walk "aaa" through the dfa and confirm it ends in a final state.
    let mut state = dfa.start;
    for _ in 0..3 {
      let next = dfa.states[state as usize]
        .transitions
        .iter()
        .find(|t| t.edge.as_ref().unwrap().contains(b'a' as u32))
        .map(|t| t.target);
      state = next.expect("dfa should accept another 'a'");
    }
    assert!(dfa.is_final(state));
    // No DFA state should have two transitions on the same input symbol.
    for s in &dfa.states {
      for i in 0..s.transitions.len() {
        for j in (i + 1)..s.transitions.len() {
          let a = s.transitions[i].edge.as_ref().unwrap();
          let b = s.transitions[j].edge.as_ref().unwrap();
          if let Some(sample) = b.sample_element() {
            assert!(!a.contains(sample), "two transitions overlap on the same input");
          }
        }
      }
    }
  }
}
