//! Per-state GLA construction (spec §4.5): builds a lookahead DFA over
//! terminals that predicts which outgoing RTN transition to take, for any
//! RTN state whose own transitions don't already decide that uniquely.
//!
//! The `Path` bookkeeping here is a bounded version of the one the spec
//! describes: each path carries its actual return stack, the terminal
//! sequence it has consumed (used to report ambiguous histories), and the
//! priorities of any prioritized edges it crossed (used to resolve
//! ambiguity). Construction is capped by `max_k` — exceeding it is reported
//! as a non-LL(*) grammar, standing in for the spec's fuller
//! fixed/cyclic/nonregular classification (see `DESIGN.md`).

use super::follow::{FollowSets, Rtn};
use crate::error::VellumError;
use crate::fa::gla_edge::{GlaEdge, GlaPrediction, GlaProps};
use crate::fa::rtn_edge::{PriorityClass, PriorityRank, RtnEdge};
use crate::fa::{Automaton, StateIdx};
use crate::ids::{NonTermId, TermId};
use crate::minimize::minimize;
use std::collections::{BTreeMap, BTreeSet};

pub type Gla = Automaton<GlaEdge, GlaProps, GlaPrediction>;

#[derive(Clone)]
struct Path {
  predicts: GlaPrediction,
  stack: Vec<(NonTermId, StateIdx)>,
  current: (NonTermId, StateIdx),
  priorities: Vec<BTreeMap<PriorityClass, PriorityRank>>,
  history: Vec<TermId>,
}

fn signature(path: &Path) -> (Vec<(NonTermId, StateIdx)>, (NonTermId, StateIdx)) {
  (path.stack.clone(), path.current)
}

/// Pushes a return-to position, applying tail-recursion elimination: a
/// final, transition-less return state contributes nothing once reached,
/// so skipping the push lets lookahead terminate in unbounded right
/// recursion instead of looping forever through trivial pops.
fn push_return(rtns: &[Rtn], stack: &mut Vec<(NonTermId, StateIdx)>, nonterm: NonTermId, dest: StateIdx) {
  let callee_rtn = &rtns[nonterm.as_usize()];
  let is_trivial_return = callee_rtn.is_final(dest) && callee_rtn.states[dest as usize].transitions.is_empty();
  if !is_trivial_return {
    stack.push((nonterm, dest));
  }
}

/// Determines whether `state` in rule `id` is "non-trivial": has more than
/// one outgoing transition, or is final with at least one transition.
pub fn is_nontrivial(rtn: &Rtn, state: StateIdx) -> bool {
  let n = rtn.states[state as usize].transitions.len();
  n >= 2 || (rtn.is_final(state) && n >= 1)
}

/// Expands `path` by exactly one terminal, branching wherever the path
/// reaches a choice point (a nonterminal call, or a pop with more than one
/// possible follow position) before that terminal is consumed. Returns the
/// empty vector if the path can only ever reach EOF from here.
fn step_one_terminal(rtns: &[Rtn], follow: &FollowSets, path: &Path, seen: &mut BTreeSet<(Vec<(NonTermId, StateIdx)>, (NonTermId, StateIdx))>) -> Result<Vec<(GlaEdge, Path)>, ()> {
  if !seen.insert(signature(path)) {
    // Revisited the same (stack, current) configuration without consuming
    // a terminal: the lookahead language here is not finite/fixed.
    return Err(());
  }

  let (id, state) = path.current;
  let rtn = &rtns[id.as_usize()];
  let transitions = &rtn.states[state as usize].transitions;

  let mut out = Vec::new();
  for t in transitions {
    match t.edge {
      Some(RtnEdge::Terminal(term)) => {
        let mut next = path.clone();
        next.current = (id, t.target);
        next.priorities.push(t.props.priorities.clone());
        next.history.push(term);
        out.push((GlaEdge::Terminal(term), next));
      }
      Some(RtnEdge::NonTerm(callee)) => {
        let mut next = path.clone();
        push_return(rtns, &mut next.stack, id, t.target);
        next.current = (callee, rtns[callee.as_usize()].start);
        next.priorities.push(t.props.priorities.clone());
        out.extend(step_one_terminal(rtns, follow, &next, seen)?);
      }
      None => {}
    }
  }

  // A state can be final and still have outgoing transitions (e.g. a rule
  // ending in an optional trailing term): popping back to the caller is
  // then just another branch alongside continuing to match here.
  if rtn.is_final(state) {
    out.extend(pop_and_continue(rtns, follow, path, seen)?);
  }

  Ok(out)
}

fn pop_and_continue(rtns: &[Rtn], follow: &FollowSets, path: &Path, seen: &mut BTreeSet<(Vec<(NonTermId, StateIdx)>, (NonTermId, StateIdx))>) -> Result<Vec<(GlaEdge, Path)>, ()> {
  let (id, _) = path.current;
  if let Some(&(caller, dest)) = path.stack.last() {
    let mut next = path.clone();
    next.stack.pop();
    next.current = (caller, dest);
    return step_one_terminal(rtns, follow, &next, seen);
  }
  // Presumed stack: use global follow information for `id`.
  let mut out = Vec::new();
  if let Some(positions) = follow.followers.get(&id) {
    for &(caller, dest) in positions {
      let mut next = path.clone();
      next.current = (caller, dest);
      out.extend(step_one_terminal(rtns, follow, &next, seen)?);
    }
  }
  if follow.eof_followers.contains(&id) {
    out.push((GlaEdge::Eof, path.clone()));
  }
  Ok(out)
}

/// Builds the GLA for one non-trivial RTN state, or `None` if the state
/// turns out to need no disambiguation after all (every seed path already
/// predicts the same transition).
pub fn construct_gla(rtns: &[Rtn], names: &[String], follow: &FollowSets, rule: NonTermId, state: StateIdx, max_k: u32) -> Result<Option<Gla>, VellumError> {
  let rtn = &rtns[rule.as_usize()];
  let transitions = &rtn.states[state as usize].transitions;

  let mut seeds: Vec<Path> = Vec::new();
  for (i, t) in transitions.iter().enumerate() {
    match t.edge {
      Some(RtnEdge::Terminal(_)) | Some(RtnEdge::NonTerm(_)) => {
        let mut stack = Vec::new();
        let current = match t.edge {
          Some(RtnEdge::NonTerm(callee)) => {
            push_return(rtns, &mut stack, rule, t.target);
            (callee, rtns[callee.as_usize()].start)
          }
          _ => (rule, t.target),
        };
        seeds.push(Path {
          predicts: GlaPrediction::Transition(i as u32),
          stack,
          current,
          priorities: vec![t.props.priorities.clone()],
          history: Vec::new(),
        });
      }
      None => {}
    }
  }
  if rtn.is_final(state) {
    if let Some(positions) = follow.followers.get(&rule) {
      for &(caller, dest) in positions {
        seeds.push(Path { predicts: GlaPrediction::Return, stack: Vec::new(), current: (caller, dest), priorities: Vec::new(), history: Vec::new() });
      }
    }
    if follow.eof_followers.contains(&rule) {
      seeds.push(Path { predicts: GlaPrediction::Return, stack: Vec::new(), current: (rule, state), priorities: Vec::new(), history: Vec::new() });
    }
  }

  if seeds.len() <= 1 {
    return Ok(None);
  }

  let mut gla: Gla = Automaton::new();
  let start = gla.start;
  build_group(rtns, follow, names, rule, &mut gla, start, seeds, 0, max_k)?;
  let minimized = minimize(&gla);
  Ok(Some(remove_excess_states(minimized)))
}

#[allow(clippy::too_many_arguments)]
fn build_group(rtns: &[Rtn], follow: &FollowSets, names: &[String], rule: NonTermId, gla: &mut Gla, gla_state: StateIdx, paths: Vec<Path>, depth: u32, max_k: u32) -> Result<(), VellumError> {
  let predictions: BTreeSet<u32> = paths
    .iter()
    .map(|p| match p.predicts {
      GlaPrediction::Transition(i) => i,
      GlaPrediction::Return => u32::MAX,
    })
    .collect();

  if predictions.len() == 1 {
    let prediction = paths[0].predicts;
    gla.finals.insert(gla_state, prediction);
    return Ok(());
  }

  let paths = resolve_ambiguity(paths);
  if paths.len() == 1 {
    gla.finals.insert(gla_state, paths[0].predicts);
    return Ok(());
  }

  if depth >= max_k {
    let histories = paths.iter().map(|p| format!("{:?}", p.history)).collect();
    return Err(VellumError::AmbiguousGrammar { nonterminal: names[rule.as_usize()].clone(), histories });
  }

  let mut by_edge: BTreeMap<GlaEdge, Vec<Path>> = BTreeMap::new();
  for path in paths {
    let mut seen = BTreeSet::new();
    let Ok(extended) = step_one_terminal(rtns, follow, &path, &mut seen) else {
      return Err(VellumError::AmbiguousGrammar { nonterminal: names[rule.as_usize()].clone(), histories: vec![format!("{:?}", path.history)] });
    };
    for (edge, next) in extended {
      by_edge.entry(edge).or_default().push(next);
    }
  }

  for (edge, group) in by_edge {
    let next_state = gla.add_state();
    gla.add_transition(gla_state, Some(edge), next_state, GlaProps);
    build_group(rtns, follow, names, rule, gla, next_state, group, depth + 1, max_k)?;
  }

  Ok(())
}

fn resolve_ambiguity(paths: Vec<Path>) -> Vec<Path> {
  let mut groups: BTreeMap<(Vec<(NonTermId, StateIdx)>, (NonTermId, StateIdx)), Vec<Path>> = BTreeMap::new();
  for p in paths {
    groups.entry(signature(&p)).or_default().push(p);
  }

  let mut survivors = Vec::new();
  for (_, mut group) in groups {
    if group.len() == 1 {
      survivors.push(group.pop().unwrap());
      continue;
    }
    // Priority resolution: find the first step where histories diverge
    // across a shared priority class, keep only the highest-ranked.
    let max_len = group.iter().map(|p| p.priorities.len()).min().unwrap_or(0);
    'steps: for step in 0..max_len {
      let classes: BTreeSet<PriorityClass> = group.iter().flat_map(|p| p.priorities[step].keys().copied()).collect();
      for class in classes {
        let ranks: Vec<Option<PriorityRank>> = group.iter().map(|p| p.priorities[step].get(&class).copied()).collect();
        if ranks.iter().all(|r| r.is_some()) && ranks.iter().collect::<BTreeSet<_>>().len() > 1 {
          let best = ranks.iter().filter_map(|r| *r).min().unwrap();
          let mut kept = Vec::new();
          for (p, r) in group.into_iter().zip(ranks) {
            if r == Some(best) {
              kept.push(p);
            }
          }
          group = kept;
          if group.len() == 1 {
            break 'steps;
          }
        }
      }
    }
    if group.len() == 1 {
      survivors.push(group.pop().unwrap());
      continue;
    }
    if group.iter().map(|p| &p.history).collect::<BTreeSet<_>>().len() == 1 {
      // Identical consumption so far with no priority to break the tie:
      // keep the first (earliest-declared) as representative.
      survivors.push(group.into_iter().next().unwrap());
      continue;
    }
    survivors.extend(group);
  }

  if survivors.len() > 1 {
    let all_same_prediction = survivors.windows(2).all(|w| w[0].predicts_eq(&w[1]));
    if all_same_prediction {
      return vec![survivors.into_iter().next().unwrap()];
    }
  }

  survivors
}

impl Path {
  fn predicts_eq(&self, other: &Path) -> bool {
    matches!(
      (self.predicts, other.predicts),
      (GlaPrediction::Return, GlaPrediction::Return)
    ) || matches!((self.predicts, other.predicts), (GlaPrediction::Transition(a), GlaPrediction::Transition(b)) if a == b)
  }
}

/// Collapses any GLA state from which every reachable final predicts the
/// same alternative into an immediate final state, shortening lookahead
/// that prioritized-choice removal made decidable earlier.
fn remove_excess_states(gla: Gla) -> Gla {
  let n = gla.state_count();
  let mut unique_prediction: Vec<Option<GlaPrediction>> = vec![None; n];
  let mut computed = vec![false; n];

  fn compute(gla: &Gla, state: StateIdx, unique: &mut Vec<Option<GlaPrediction>>, computed: &mut Vec<bool>, visiting: &mut BTreeSet<StateIdx>) -> Option<GlaPrediction> {
    if computed[state as usize] {
      return unique[state as usize];
    }
    if !visiting.insert(state) {
      return None;
    }
    let result = if let Some(&f) = gla.finals.get(&state) {
      Some(f)
    } else {
      let mut preds: BTreeSet<(bool, u32)> = BTreeSet::new();
      let mut all_known = true;
      for t in &gla.states[state as usize].transitions {
        match compute(gla, t.target, unique, computed, visiting) {
          Some(GlaPrediction::Transition(i)) => {
            preds.insert((false, i));
          }
          Some(GlaPrediction::Return) => {
            preds.insert((true, 0));
          }
          None => all_known = false,
        }
      }
      if all_known && preds.len() == 1 {
        let (is_return, i) = *preds.iter().next().unwrap();
        Some(if is_return { GlaPrediction::Return } else { GlaPrediction::Transition(i) })
      } else {
        None
      }
    };
    visiting.remove(&state);
    computed[state as usize] = true;
    unique[state as usize] = result;
    result
  }

  for s in 0..n as StateIdx {
    let mut visiting = BTreeSet::new();
    compute(&gla, s, &mut unique_prediction, &mut computed, &mut visiting);
  }

  let mut out = gla.clone();
  for s in 0..n as StateIdx {
    if let Some(pred) = unique_prediction[s as usize] {
      out.finals.insert(s, pred);
      out.states[s as usize].transitions.clear();
    }
  }
  out
}
