//! Thompson construction: builds NFA fragments for concatenation,
//! alternation, and the three repetition operators out of smaller
//! fragments, threading a single designated start and a single
//! designated accept state through each combinator.

use crate::fa::{Automaton, StateIdx};

/// A fragment under construction: every fragment has exactly one start and
/// one accept state while it is being combined; `F`/`K`/`P` only become
/// meaningful once the caller attaches terminals or final markers.
pub struct Fragment {
  pub start: StateIdx,
  pub accept: StateIdx,
}

/// Appends a single edge-bearing transition as its own two-state fragment:
/// start --edge--> accept.
pub fn symbol<K, P: Default>(fa: &mut Automaton<K, P, ()>, edge: K) -> Fragment {
  let start = fa.add_state();
  let accept = fa.add_state();
  fa.add_transition(start, Some(edge), accept, P::default());
  Fragment { start, accept }
}

/// An empty fragment: start --eps--> accept, recognizing the empty string.
pub fn epsilon<K, P: Default>(fa: &mut Automaton<K, P, ()>) -> Fragment {
  let start = fa.add_state();
  let accept = fa.add_state();
  fa.add_transition(start, None, accept, P::default());
  Fragment { start, accept }
}

/// `ab`: `a`'s accept becomes an epsilon predecessor of `b`'s start.
pub fn concat<K, P: Default>(fa: &mut Automaton<K, P, ()>, a: Fragment, b: Fragment) -> Fragment {
  fa.add_transition(a.accept, None, b.start, P::default());
  Fragment { start: a.start, accept: b.accept }
}

/// `a|b`: a fresh start epsilon-branches into both, both accepts
/// epsilon-join into a fresh accept.
pub fn alt<K, P: Default>(fa: &mut Automaton<K, P, ()>, branches: Vec<Fragment>) -> Fragment {
  let start = fa.add_state();
  let accept = fa.add_state();
  for b in branches {
    fa.add_transition(start, None, b.start, P::default());
    fa.add_transition(b.accept, None, accept, P::default());
  }
  Fragment { start, accept }
}

/// `a*`: zero or more repetitions.
pub fn kleene<K, P: Default>(fa: &mut Automaton<K, P, ()>, a: Fragment) -> Fragment {
  let start = fa.add_state();
  let accept = fa.add_state();
  fa.add_transition(start, None, a.start, P::default());
  fa.add_transition(start, None, accept, P::default());
  fa.add_transition(a.accept, None, a.start, P::default());
  fa.add_transition(a.accept, None, accept, P::default());
  Fragment { start, accept }
}

/// `a+`: one or more repetitions.
pub fn plus<K, P: Default>(fa: &mut Automaton<K, P, ()>, a: Fragment) -> Fragment {
  let accept = fa.add_state();
  fa.add_transition(a.accept, None, a.start, P::default());
  fa.add_transition(a.accept, None, accept, P::default());
  Fragment { start: a.start, accept }
}

/// `a?`: zero or one.
pub fn optional<K, P: Default>(fa: &mut Automaton<K, P, ()>, a: Fragment) -> Fragment {
  let start = fa.add_state();
  let accept = fa.add_state();
  fa.add_transition(start, None, a.start, P::default());
  fa.add_transition(start, None, accept, P::default());
  fa.add_transition(a.accept, None, accept, P::default());
  Fragment { start, accept }
}

/// `a+(sep)`: one or more repetitions of `a` separated by `sep`.
pub fn plus_separated<K, P: Default>(fa: &mut Automaton<K, P, ()>, a: Fragment, sep: Fragment) -> Fragment {
  let accept = fa.add_state();
  fa.add_transition(sep.accept, None, a.start, P::default());
  fa.add_transition(a.accept, None, sep.start, P::default());
  fa.add_transition(a.accept, None, accept, P::default());
  Fragment { start: a.start, accept }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fa::epsilon_closure;
  use crate::fa::intfa_edge::IntFaProps;
  use crate::intset::IntSet;

  #[test]
  fn kleene_over_single_symbol_reaches_accept_immediately() {
    let mut fa: Automaton<IntSet, IntFaProps, ()> = Automaton::new();
    let a = symbol(&mut fa, IntSet::single(b'a' as u32));
    let rep = kleene(&mut fa, a);
    // The kleene wrapper's start must reach its own accept via epsilon
    // without consuming any symbol (the zero-repetitions case).
    let closure = epsilon_closure(&fa, [rep.start]);
    assert!(closure.contains(&rep.accept));
  }
}
