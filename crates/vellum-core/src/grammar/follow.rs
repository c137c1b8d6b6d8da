//! Global pre-pass for GLA construction (spec §4.5): follow-state sets,
//! the non-recursive-alternative check, and the left-recursion check.

use crate::error::VellumError;
use crate::fa::rtn_edge::RtnEdge;
use crate::fa::{Automaton, StateIdx};
use crate::fa::rtn_edge::{RtnFinal, RtnProps};
use crate::ids::NonTermId;
use std::collections::{BTreeMap, BTreeSet};

pub type Rtn = Automaton<RtnEdge, RtnProps, RtnFinal>;

/// For every nonterminal, the `(caller, state-after-return)` positions
/// reachable immediately after a call into it returns. A synthetic
/// EOF follow is represented by `eof_followers` instead, since it has no
/// RTN position of its own.
pub struct FollowSets {
  pub followers: BTreeMap<NonTermId, BTreeSet<(NonTermId, StateIdx)>>,
  pub eof_followers: BTreeSet<NonTermId>,
}

pub fn compute_follow_sets(rtns: &[Rtn], start: NonTermId) -> FollowSets {
  let mut followers: BTreeMap<NonTermId, BTreeSet<(NonTermId, StateIdx)>> = BTreeMap::new();
  for (caller_idx, rtn) in rtns.iter().enumerate() {
    let caller = NonTermId(caller_idx as u32);
    for (state_idx, state) in rtn.states.iter().enumerate() {
      for t in &state.transitions {
        if let Some(RtnEdge::NonTerm(callee)) = t.edge {
          followers.entry(callee).or_default().insert((caller, t.target));
        }
      }
    }
  }
  let mut eof_followers = BTreeSet::new();
  eof_followers.insert(start);
  FollowSets { followers, eof_followers }
}

/// Verifies every rule has at least one path from its start state to a
/// final state that never transitively requires re-entering that same
/// rule (a "base case"). Also detects left recursion: a rule reachable
/// from itself without crossing a terminal edge first.
pub fn check_recursion(rtns: &[Rtn], names: &[String], source_name: &str) -> Vec<VellumError> {
  let mut errors = Vec::new();
  for (idx, _) in rtns.iter().enumerate() {
    let id = NonTermId(idx as u32);
    if !has_non_recursive_path(rtns, id, id) {
      errors.push(VellumError::NoBaseCase { nonterminal: names[idx].clone(), token: None });
    }
  }
  for (idx, _) in rtns.iter().enumerate() {
    let id = NonTermId(idx as u32);
    let mut chain = BTreeSet::new();
    if left_recurses(rtns, id, id, &mut chain) {
      errors.push(VellumError::LeftRecursion { nonterminal: names[idx].clone(), token: None });
    }
  }
  let _ = source_name;
  errors
}

/// True if some path from `target`'s start to a final state exists that
/// never enters `forbidden` (directly or transitively through other
/// nonterminal calls), via a depth-first search over the RTN graph that
/// treats a nonterminal edge to `forbidden` as a dead end and otherwise
/// recurses into the callee's own reachability (any call chain not
/// eventually bottoming out at `forbidden` is fine).
fn has_non_recursive_path(rtns: &[Rtn], target: NonTermId, forbidden: NonTermId) -> bool {
  let mut in_progress = BTreeSet::new();
  has_non_recursive_path_rec(rtns, target, forbidden, &mut in_progress)
}

fn has_non_recursive_path_rec(rtns: &[Rtn], target: NonTermId, forbidden: NonTermId, in_progress: &mut BTreeSet<NonTermId>) -> bool {
  fn reaches_final(
    rtns: &[Rtn],
    id: NonTermId,
    forbidden: NonTermId,
    state: StateIdx,
    visited: &mut BTreeSet<(NonTermId, StateIdx)>,
    in_progress: &mut BTreeSet<NonTermId>,
  ) -> bool {
    if !visited.insert((id, state)) {
      return false;
    }
    let rtn = &rtns[id.as_usize()];
    if rtn.is_final(state) {
      return true;
    }
    for t in &rtn.states[state as usize].transitions {
      match t.edge {
        Some(RtnEdge::Terminal(_)) => {
          if reaches_final(rtns, id, forbidden, t.target, visited, in_progress) {
            return true;
          }
        }
        Some(RtnEdge::NonTerm(callee)) => {
          if callee == forbidden {
            continue;
          }
          // Entering callee without consuming a terminal: require that
          // some path through callee returns, then keep going from here.
          // `in_progress` breaks cycles between mutually-recursive callees
          // that never bottom out at `forbidden`, conservatively treating
          // an in-progress callee as not yet proven to have a base case.
          if in_progress.contains(&callee) {
            continue;
          }
          if has_non_recursive_path_rec(rtns, callee, forbidden, in_progress) && reaches_final(rtns, id, forbidden, t.target, visited, in_progress) {
            return true;
          }
        }
        None => {}
      }
    }
    false
  }
  if !in_progress.insert(target) {
    return false;
  }
  let mut visited = BTreeSet::new();
  let result = reaches_final(rtns, target, forbidden, rtns[target.as_usize()].start, &mut visited, in_progress);
  in_progress.remove(&target);
  result
}

fn left_recurses(rtns: &[Rtn], start_rule: NonTermId, current: NonTermId, chain: &mut BTreeSet<NonTermId>) -> bool {
  if !chain.insert(current) {
    return false;
  }
  let rtn = &rtns[current.as_usize()];
  let mut stack = vec![rtn.start];
  let mut seen_states = BTreeSet::new();
  while let Some(state) = stack.pop() {
    if !seen_states.insert(state) {
      continue;
    }
    for t in &rtn.states[state as usize].transitions {
      match t.edge {
        Some(RtnEdge::NonTerm(callee)) if callee == start_rule => return true,
        Some(RtnEdge::NonTerm(callee)) => {
          if left_recurses(rtns, start_rule, callee, chain) {
            return true;
          }
          // A call that can itself match the empty string lets recursion
          // continue past it without consuming input; anything else is
          // safely past the left edge.
          if rtns[callee.as_usize()].is_final(rtns[callee.as_usize()].start) {
            stack.push(t.target);
          }
        }
        Some(RtnEdge::Terminal(_)) | None => {}
      }
    }
  }
  chain.remove(&current);
  false
}
