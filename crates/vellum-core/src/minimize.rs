//! Hopcroft minimization, generic over the DFA's edge-value and
//! final-marker types. Requires `K: Partitionable` so that, for IntFA's
//! interval alphabet, we can first re-slice every state's transitions onto
//! one shared set of equivalence classes — Hopcroft's algorithm assumes a
//! single alphabet shared by every state, which determinization alone does
//! not guarantee for interval edges.

use crate::fa::{Automaton, StateIdx, Transition};
use crate::nfa_to_dfa::Partitionable;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

fn unify_alphabet<K, P, F>(fa: &mut Automaton<K, P, F>)
where
  K: Partitionable + Ord + Clone,
  P: Clone,
{
  let mut all_values: Vec<K> = Vec::new();
  for s in &fa.states {
    for t in &s.transitions {
      if let Some(k) = &t.edge {
        all_values.push(k.clone());
      }
    }
  }
  if all_values.is_empty() {
    return;
  }
  let classes = K::partition(&all_values);

  for state in &mut fa.states {
    let mut new_transitions = Vec::new();
    for t in &state.transitions {
      match &t.edge {
        Some(edge) => {
          for class in &classes {
            if edge.overlaps(class) {
              new_transitions.push(Transition { edge: Some(class.clone()), target: t.target, props: t.props.clone() });
            }
          }
        }
        None => new_transitions.push(t.clone()),
      }
    }
    state.transitions = new_transitions;
  }
}

/// Minimizes `fa`, producing a language-equivalent DFA with the fewest
/// states. States that disagree on finality, or on where some input symbol
/// leads, end up in different output states; everything else is merged.
pub fn minimize<K, P, F>(fa: &Automaton<K, P, F>) -> Automaton<K, P, F>
where
  K: Partitionable + Ord + Clone,
  P: Clone,
  F: Clone + Ord,
{
  let mut fa = fa.clone();
  unify_alphabet(&mut fa);

  let n = fa.state_count();
  let mut blocks: Vec<Vec<StateIdx>> = Vec::new();
  let mut block_of: Vec<usize> = vec![0; n];
  let mut key_to_block: BTreeMap<Option<F>, usize> = BTreeMap::new();

  for s in 0..n as StateIdx {
    let key = fa.finals.get(&s).cloned();
    let b = *key_to_block.entry(key).or_insert_with(|| {
      blocks.push(Vec::new());
      blocks.len() - 1
    });
    blocks[b].push(s);
    block_of[s as usize] = b;
  }

  let mut symbols: Vec<K> = Vec::new();
  for s in &fa.states {
    for t in &s.transitions {
      if let Some(k) = &t.edge {
        symbols.push(k.clone());
      }
    }
  }
  symbols.sort();
  symbols.dedup();

  // pred[symbol][target] = source states reachable via `symbol` into `target`.
  let mut pred: BTreeMap<K, BTreeMap<StateIdx, Vec<StateIdx>>> = BTreeMap::new();
  for (idx, s) in fa.states.iter().enumerate() {
    for t in &s.transitions {
      if let Some(k) = &t.edge {
        pred.entry(k.clone()).or_default().entry(t.target).or_default().push(idx as StateIdx);
      }
    }
  }

  let mut worklist: VecDeque<(usize, K)> = VecDeque::new();
  for b in 0..blocks.len() {
    for sym in &symbols {
      worklist.push_back((b, sym.clone()));
    }
  }

  while let Some((b, sym)) = worklist.pop_front() {
    let Some(pred_map) = pred.get(&sym) else { continue };
    let mut x: BTreeSet<StateIdx> = BTreeSet::new();
    // `b` may have been split since this pair was queued; only states still
    // resident in block `b` count as the splitting target.
    for &target in &blocks[b] {
      if let Some(srcs) = pred_map.get(&target) {
        x.extend(srcs.iter().copied());
      }
    }
    if x.is_empty() {
      continue;
    }

    let touched_blocks: BTreeSet<usize> = x.iter().map(|&s| block_of[s as usize]).collect();
    for y in touched_blocks {
      let y_states = blocks[y].clone();
      let (in_x, not_in_x): (Vec<StateIdx>, Vec<StateIdx>) = y_states.iter().partition(|s| x.contains(s));
      if in_x.is_empty() || not_in_x.is_empty() {
        continue;
      }

      // Keep the larger fragment under the existing block id so that any
      // pending worklist entries referencing `y` remain valid; only the
      // smaller, newly created fragment needs fresh entries queued.
      let (kept, spun_off) = if not_in_x.len() <= in_x.len() { (in_x, not_in_x) } else { (not_in_x, in_x) };

      blocks[y] = kept;
      for &s in &blocks[y] {
        block_of[s as usize] = y;
      }
      let new_id = blocks.len();
      blocks.push(spun_off.clone());
      for &s in &spun_off {
        block_of[s as usize] = new_id;
      }
      for sym2 in &symbols {
        worklist.push_back((new_id, sym2.clone()));
      }
    }
  }

  let mut out: Automaton<K, P, F> = Automaton { states: Vec::with_capacity(blocks.len()), start: 0, finals: BTreeMap::new() };
  for _ in 0..blocks.len() {
    out.states.push(Default::default());
  }
  out.start = block_of[fa.start as usize] as StateIdx;

  for (b, states) in blocks.iter().enumerate() {
    let rep = states[0];
    if let Some(f) = fa.finals.get(&rep) {
      out.finals.insert(b as StateIdx, f.clone());
    }
    for t in &fa.states[rep as usize].transitions {
      out.states[b].transitions.push(Transition {
        edge: t.edge.clone(),
        target: block_of[t.target as usize] as StateIdx,
        props: t.props.clone(),
      });
    }
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fa::intfa_edge::IntFaProps;
  use crate::ids::TermId;
  use crate::intset::IntSet;

  #[test]
  fn merges_equivalent_states() {
    // Two DFA states, 1 and 2, both final on the same terminal and both
    // dead ends: they are indistinguishable and should merge.
    let mut fa: crate::fa::Automaton<IntSet, IntFaProps, TermId> = crate::fa::Automaton::new();
    let s1 = fa.add_state();
    let s2 = fa.add_state();
    fa.add_transition(0, Some(IntSet::single(b'a' as u32)), s1, IntFaProps);
    fa.add_transition(0, Some(IntSet::single(b'b' as u32)), s2, IntFaProps);
    fa.finals.insert(s1, TermId(0));
    fa.finals.insert(s2, TermId(0));

    let min = minimize(&fa);
    assert_eq!(min.state_count(), 2);
  }
}
