//! The streaming interpreter (spec §4.9): drives IntFA, GLA, and RTN frames
//! over an input byte stream, one byte at a time, firing callbacks as rules
//! are entered/exited and terminals are matched.

use crate::callbacks::{BoundGrammar, ControlFlow, ParseCallbacks};
use crate::error::ParseError;
use crate::frame::{GlaFrame, IntFaFrame, ParseFrame, RtnFrame};
use crate::types::{GlaEdge, GlaPrediction, IntFa, RtnEdge, RtnStateKind};
use std::collections::VecDeque;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseStatus {
  Ok,
  Cancelled,
  Eof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishStatus {
  Complete,
  Incomplete,
}

#[derive(Clone, Copy, Debug)]
struct BufferedTerminal {
  terminal: u32,
  offset: usize,
  len: usize,
}

/// A live parse (spec §3 "Parse state"): an input offset, a frame stack, a
/// buffer of terminals lexed for GLA lookahead but not yet committed to an
/// RTN, and the grammar/callbacks it runs against.
pub struct ParseState<C: ParseCallbacks> {
  offset: usize,
  frames: Vec<ParseFrame>,
  token_buffer: VecDeque<BufferedTerminal>,
  grammar: Arc<crate::types::LoadedGrammar>,
  callbacks: C,
}

pub fn alloc_parse_state<C: ParseCallbacks>(bound: BoundGrammar<C>) -> ParseState<C> {
  let BoundGrammar { grammar, callbacks } = bound;
  let start = grammar.start_rule;
  let start_state = grammar.rtns[start as usize].start;
  let mut ps = ParseState { offset: 0, frames: Vec::new(), token_buffer: VecDeque::new(), grammar, callbacks };
  ps.callbacks.start_rule(start);
  ps.frames.push(ParseFrame::Rtn(RtnFrame { rtn: start, state: start_state, resume_state: None, offset_at_entry: 0 }));
  descend(&mut ps);
  ps
}

pub fn dup_parse_state<C: ParseCallbacks + Clone>(ps: &ParseState<C>) -> ParseState<C> {
  ParseState {
    offset: ps.offset,
    frames: ps.frames.clone(),
    token_buffer: ps.token_buffer.clone(),
    grammar: Arc::clone(&ps.grammar),
    callbacks: ps.callbacks.clone(),
  }
}

/// The sole entry point for feeding input (spec §5). Suspends when `buf` is
/// exhausted or the grammar's start rule has fully returned.
pub fn parse<C: ParseCallbacks>(ps: &mut ParseState<C>, buf: &[u8]) -> Result<(ParseStatus, usize), ParseError> {
  let mut consumed = 0;
  while consumed < buf.len() {
    if ps.frames.is_empty() {
      return Ok((ParseStatus::Eof, consumed));
    }
    match feed_byte(ps, buf[consumed])? {
      FeedOutcome::Consumed => {
        consumed += 1;
        ps.offset += 1;
      }
      FeedOutcome::Cancelled => return Ok((ParseStatus::Cancelled, consumed)),
    }
  }
  if ps.frames.is_empty() {
    Ok((ParseStatus::Eof, consumed))
  } else {
    Ok((ParseStatus::Ok, consumed))
  }
}

/// Finalization (spec §4.9 "End-of-input"): pops every frame that is
/// acceptable at end of stream, erroring as `Incomplete` the moment one
/// isn't.
pub fn finish_parse<C: ParseCallbacks>(ps: &mut ParseState<C>) -> Result<FinishStatus, ParseError> {
  loop {
    match ps.frames.last() {
      None => return Ok(FinishStatus::Complete),
      Some(ParseFrame::IntFa(f)) => {
        let f = f.clone();
        let intfa = &ps.grammar.intfa;
        match intfa.states[f.state as usize].final_terminal {
          Some(term) => {
            let len = ps.offset - f.offset_at_entry;
            ps.frames.pop();
            if deliver_terminal(ps, term, f.offset_at_entry, len)? == ControlFlow::Cancel {
              return Err(ParseError::Cancelled);
            }
            descend(ps);
          }
          None => return Ok(FinishStatus::Incomplete),
        }
      }
      Some(ParseFrame::Gla(f)) => {
        let f = f.clone();
        let gla = &ps.grammar.glas[f.gla as usize];
        let eof_target = gla.states[f.state as usize].transitions.iter().find(|t| matches!(t.edge, GlaEdge::Eof)).map(|t| t.target);
        match eof_target {
          Some(target) => {
            let prediction = gla.states[target as usize].prediction;
            match prediction {
              Some(pred) => {
                ps.frames.pop();
                if commit_gla(ps, pred)? == ControlFlow::Cancel {
                  return Err(ParseError::Cancelled);
                }
                descend(ps);
              }
              None => return Ok(FinishStatus::Incomplete),
            }
          }
          None if f.state == gla.start => {
            ps.frames.pop();
            descend(ps);
          }
          None => return Ok(FinishStatus::Incomplete),
        }
      }
      Some(ParseFrame::Rtn(f)) => {
        let rtn = &ps.grammar.rtns[f.rtn as usize];
        if rtn.states[f.state as usize].is_final {
          pop_rtn_frame(ps);
        } else {
          return Ok(FinishStatus::Incomplete);
        }
      }
    }
  }
}

enum FeedOutcome {
  Consumed,
  Cancelled,
}

fn feed_byte<C: ParseCallbacks>(ps: &mut ParseState<C>, byte: u8) -> Result<FeedOutcome, ParseError> {
  loop {
    let top = match ps.frames.last() {
      Some(ParseFrame::IntFa(f)) => f.clone(),
      _ => unreachable!("feed_byte is only called with an IntFA frame on top"),
    };
    let intfa = &ps.grammar.intfa;

    match lookup_intfa_transition(intfa, top.state, byte) {
      Some(target) => {
        let target_state = &intfa.states[target as usize];
        if let Some(term) = target_state.final_terminal {
          if target_state.transitions.is_empty() {
            let len = ps.offset + 1 - top.offset_at_entry;
            ps.frames.pop();
            let cf = deliver_terminal(ps, term, top.offset_at_entry, len)?;
            descend(ps);
            return Ok(if cf == ControlFlow::Cancel { FeedOutcome::Cancelled } else { FeedOutcome::Consumed });
          }
        }
        if let Some(ParseFrame::IntFa(f)) = ps.frames.last_mut() {
          f.state = target;
        }
        return Ok(FeedOutcome::Consumed);
      }
      None => {
        let Some(term) = intfa.states[top.state as usize].final_terminal else {
          return Err(ParseError::NoIntFaTransition { offset: ps.offset, byte });
        };
        let len = ps.offset - top.offset_at_entry;
        ps.frames.pop();
        let cf = deliver_terminal(ps, term, top.offset_at_entry, len)?;
        if cf == ControlFlow::Cancel {
          return Ok(FeedOutcome::Cancelled);
        }
        descend(ps);
      }
    }
  }
}

fn lookup_intfa_transition(intfa: &IntFa, state: u32, byte: u8) -> Option<u32> {
  let byte = byte as u32;
  intfa.states[state as usize].transitions.iter().find(|t| t.lo <= byte && byte <= t.hi).map(|t| t.target)
}

/// Routes a just-lexed terminal to whichever frame is exposed once the
/// IntFA frame that produced it is gone: a GLA still collecting lookahead,
/// or an RTN ready to act on it directly.
fn deliver_terminal<C: ParseCallbacks>(ps: &mut ParseState<C>, term: u32, offset: usize, len: usize) -> Result<ControlFlow, ParseError> {
  match ps.frames.last() {
    Some(ParseFrame::Gla(_)) => deliver_to_gla(ps, term, offset, len),
    Some(ParseFrame::Rtn(_)) => deliver_to_rtn(ps, term, offset, len),
    other => unreachable!("an IntFA frame always sits on a GLA or RTN frame, found {other:?}"),
  }
}

fn deliver_to_rtn<C: ParseCallbacks>(ps: &mut ParseState<C>, term: u32, offset: usize, len: usize) -> Result<ControlFlow, ParseError> {
  let depth = ps.frames.len() - 1;
  let (rtn_idx, state) = match &ps.frames[depth] {
    ParseFrame::Rtn(f) => (f.rtn, f.state),
    _ => unreachable!(),
  };
  let rtn = &ps.grammar.rtns[rtn_idx as usize];
  let found = rtn.states[state as usize].transitions.iter().find(|t| matches!(t.edge, RtnEdge::Terminal(edge_term) if edge_term == term)).map(|t| t.target);

  match found {
    Some(target) => {
      let cf = ps.callbacks.terminal(term, offset, len);
      if let ParseFrame::Rtn(f) = &mut ps.frames[depth] {
        f.state = target;
      }
      Ok(cf)
    }
    None if ps.grammar.is_allowed_subparser(rtn_idx, term) => Ok(ControlFlow::Continue),
    None => Err(ParseError::NoRtnTransition { offset, terminal: term }),
  }
}

fn deliver_to_gla<C: ParseCallbacks>(ps: &mut ParseState<C>, term: u32, offset: usize, len: usize) -> Result<ControlFlow, ParseError> {
  let depth = ps.frames.len() - 1;
  let (gla_idx, state) = match &ps.frames[depth] {
    ParseFrame::Gla(f) => (f.gla, f.state),
    _ => unreachable!(),
  };
  let gla = &ps.grammar.glas[gla_idx as usize];
  let found = gla.states[state as usize].transitions.iter().find(|t| matches!(t.edge, GlaEdge::Terminal(edge_term) if edge_term == term)).map(|t| t.target);

  match found {
    Some(target) => {
      ps.token_buffer.push_back(BufferedTerminal { terminal: term, offset, len });
      if let ParseFrame::Gla(f) = &mut ps.frames[depth] {
        f.state = target;
      }
      if let Some(pred) = gla.states[target as usize].prediction {
        ps.frames.pop();
        commit_gla(ps, pred)
      } else {
        ps.frames.push(ParseFrame::IntFa(IntFaFrame { intfa: 0, state: ps.grammar.intfa.start, offset_at_entry: ps.offset }));
        Ok(ControlFlow::Continue)
      }
    }
    None => {
      let enclosing_rule = match ps.frames.get(depth.wrapping_sub(1)) {
        Some(ParseFrame::Rtn(f)) => Some(f.rtn),
        _ => None,
      };
      if enclosing_rule.is_some_and(|rule| ps.grammar.is_allowed_subparser(rule, term)) {
        Ok(ControlFlow::Continue)
      } else {
        Err(ParseError::NoGlaTransition { offset, terminal: term })
      }
    }
  }
}

/// Resolves a finalized GLA's prediction against the RTN state it was
/// disambiguating, then replays whatever lookahead terminals are still
/// buffered (spec §4.9 "buffered terminals are replayed to the RTN in
/// order, followed by any nonterminal transitions implied by the
/// prediction"). The GLA frame itself must already be popped.
fn commit_gla<C: ParseCallbacks>(ps: &mut ParseState<C>, prediction: GlaPrediction) -> Result<ControlFlow, ParseError> {
  let mut buffered: VecDeque<BufferedTerminal> = std::mem::take(&mut ps.token_buffer);

  match prediction {
    GlaPrediction::Return => pop_rtn_frame(ps),
    GlaPrediction::Transition(idx) => {
      let depth = ps.frames.len() - 1;
      let (rtn_idx, state) = match &ps.frames[depth] {
        ParseFrame::Rtn(f) => (f.rtn, f.state),
        _ => unreachable!("a GLA frame always sits directly on the RTN state it disambiguates"),
      };
      let transition = ps.grammar.rtns[rtn_idx as usize].states[state as usize].transitions[idx as usize].clone();
      match transition.edge {
        RtnEdge::Terminal(term) => {
          let bt = buffered.pop_front().expect("GLA predicted a terminal transition with no buffered terminal to match it");
          debug_assert_eq!(bt.terminal, term);
          let cf = ps.callbacks.terminal(term, bt.offset, bt.len);
          if let ParseFrame::Rtn(f) = &mut ps.frames[depth] {
            f.state = transition.target;
          }
          if cf == ControlFlow::Cancel {
            return Ok(ControlFlow::Cancel);
          }
        }
        RtnEdge::NonTerm(callee) => {
          if let ParseFrame::Rtn(f) = &mut ps.frames[depth] {
            f.resume_state = Some(transition.target);
          }
          ps.callbacks.start_rule(callee);
          let callee_start = ps.grammar.rtns[callee as usize].start;
          ps.frames.push(ParseFrame::Rtn(RtnFrame { rtn: callee, state: callee_start, resume_state: None, offset_at_entry: ps.offset }));
        }
      }
    }
  }

  descend(ps);

  for bt in buffered {
    let cf = deliver_terminal(ps, bt.terminal, bt.offset, bt.len)?;
    if cf == ControlFlow::Cancel {
      return Ok(ControlFlow::Cancel);
    }
    descend(ps);
  }

  Ok(ControlFlow::Continue)
}

fn pop_rtn_frame<C: ParseCallbacks>(ps: &mut ParseState<C>) {
  let rtn_idx = match ps.frames.last() {
    Some(ParseFrame::Rtn(f)) => f.rtn,
    _ => unreachable!("pop_rtn_frame called with no RTN frame on top"),
  };
  ps.callbacks.end_rule(rtn_idx);
  ps.frames.pop();
  if let Some(ParseFrame::Rtn(caller)) = ps.frames.last_mut() {
    if let Some(resume) = caller.resume_state.take() {
      caller.state = resume;
    }
  }
}

/// After any RTN-state mutation, walks down through states that need no
/// terminal of their own (spec §4.9 "Descent"): final-no-transitions pops,
/// single-nonterminal-no-lookahead pushes the callee, anything else pushes
/// whatever frame (GLA then IntFA, or directly an IntFA) is needed to read
/// the next terminal, and stops there.
fn descend<C: ParseCallbacks>(ps: &mut ParseState<C>) {
  loop {
    let Some(ParseFrame::Rtn(f)) = ps.frames.last() else { return };
    let rtn = &ps.grammar.rtns[f.rtn as usize];
    let state = &rtn.states[f.state as usize];

    match state.kind {
      RtnStateKind::Trivial if state.is_final && state.transitions.is_empty() => {
        pop_rtn_frame(ps);
      }
      RtnStateKind::Trivial => {
        let transition = state.transitions[0].clone();
        let RtnEdge::NonTerm(callee) = transition.edge else {
          unreachable!("a non-final trivial state always has exactly one nonterminal transition")
        };
        if let Some(ParseFrame::Rtn(f)) = ps.frames.last_mut() {
          f.resume_state = Some(transition.target);
        }
        ps.callbacks.start_rule(callee);
        let callee_start = ps.grammar.rtns[callee as usize].start;
        ps.frames.push(ParseFrame::Rtn(RtnFrame { rtn: callee, state: callee_start, resume_state: None, offset_at_entry: ps.offset }));
      }
      RtnStateKind::WithIntFa => {
        ps.frames.push(ParseFrame::IntFa(IntFaFrame { intfa: 0, state: ps.grammar.intfa.start, offset_at_entry: ps.offset }));
        return;
      }
      RtnStateKind::WithGla(gla_id) => {
        let gla_start = ps.grammar.glas[gla_id as usize].start;
        ps.frames.push(ParseFrame::Gla(GlaFrame { gla: gla_id, state: gla_start, offset_at_entry: ps.offset }));
        ps.frames.push(ParseFrame::IntFa(IntFaFrame { intfa: 0, state: ps.grammar.intfa.start, offset_at_entry: ps.offset }));
        return;
      }
    }
  }
}
