//! Deterministic linearization (spec §4.7): walks the compiled RTN/GLA/IntFA
//! automata in a fixed order and emits them as a single bitcode artifact via
//! `vellum_bitcode::BitcodeWriter`, using the block/record layout the
//! loader in `vellum_runtime` agrees on through `vellum_bitcode::blocks`.
//!
//! Priority-class information never reaches the wire: it only exists to
//! disambiguate during GLA construction, and every disambiguation it would
//! drive is already baked into the GLA's transitions and final predictions
//! by the time this runs. Likewise `RtnProps::slot_name` stays compile-side
//! — the runtime keys callbacks by slot index, not name.

use super::coalesce::IntFa;
use super::follow::Rtn;
use super::gla::Gla;
use crate::fa::gla_edge::GlaEdge;
use crate::fa::gla_edge::GlaPrediction;
use crate::fa::rtn_edge::RtnEdge;
use crate::ids::NonTermId;
use std::collections::BTreeMap;
use vellum_bitcode::blocks::{allow_record, block_id, gla_record, intfa_record, rtn_record, strings_record, APP_MAGIC};
use vellum_bitcode::BitcodeWriter;

pub struct CompiledGrammar<'a> {
  pub nonterm_names: &'a [String],
  pub terminal_names: &'a [String],
  pub rtns: &'a [Rtn],
  pub glas: &'a [Gla],
  /// Maps `(rule index, rtn state)` to an index into `glas`, for every
  /// state that needed a GLA to disambiguate its outgoing transitions.
  pub gla_for_state: &'a BTreeMap<(u32, u32), u32>,
  pub intfa: &'a IntFa,
  pub start: NonTermId,
  /// `(subparser terminal, rule)` pairs naming every `@allow` closure
  /// entry, resolved ahead of time by `compute_allow_closures`.
  pub allows: &'a [(u32, u32)],
}

pub fn linearize(g: &CompiledGrammar) -> Vec<u8> {
  let mut w = BitcodeWriter::new(APP_MAGIC);

  let strings = w.enter_block(block_id::STRINGS);
  for s in g.nonterm_names.iter().chain(g.terminal_names.iter()) {
    w.emit_blob(strings_record::STRING, s.as_bytes());
  }
  w.end_block(strings);

  emit_intfa(&mut w, g);
  emit_glas(&mut w, g);
  emit_rtns(&mut w, g);
  emit_allows(&mut w, g);

  w.into_bytes()
}

fn emit_allows(w: &mut BitcodeWriter, g: &CompiledGrammar) {
  let block = w.enter_block(block_id::ALLOWS);
  for &(terminal, rule) in g.allows {
    w.emit_record(allow_record::ALLOW_ENTRY, &[terminal as u64, rule as u64]);
  }
  w.end_block(block);
}

fn emit_rtns(w: &mut BitcodeWriter, g: &CompiledGrammar) {
  let rtns_block = w.enter_block(block_id::RTNS);
  w.emit_record(rtn_record::RTN_INFO, &[g.start.0 as u64, g.nonterm_names.len() as u64, g.terminal_names.len() as u64, g.glas.len() as u64]);

  for (rule_idx, rtn) in g.rtns.iter().enumerate() {
    let rule_idx = rule_idx as u32;
    let sub = w.enter_block(block_id::RTN);

    for state in 0..rtn.state_count() as u32 {
      let is_final = rtn.is_final(state) as u64;
      let transitions = &rtn.states[state as usize].transitions;

      let is_trivial_nonterm = matches!(transitions.as_slice(), [t] if matches!(t.edge, Some(RtnEdge::NonTerm(_))));

      if let Some(&gla_id) = g.gla_for_state.get(&(rule_idx, state)) {
        w.emit_record(rtn_record::RTN_STATE_WITH_GLA, &[state as u64, is_final, gla_id as u64]);
      } else if transitions.is_empty() || is_trivial_nonterm {
        w.emit_record(rtn_record::RTN_TRIVIAL_STATE, &[state as u64, is_final]);
      } else {
        w.emit_record(rtn_record::RTN_STATE_WITH_INTFA, &[state as u64, is_final]);
      }

      for t in transitions {
        let slot = t.props.slot_index.map(|s| s as u64).unwrap_or(u64::MAX);
        match t.edge {
          Some(RtnEdge::Terminal(term)) => {
            w.emit_record(rtn_record::RTN_TRANSITION_TERMINAL, &[state as u64, t.target as u64, term.0 as u64, slot]);
          }
          Some(RtnEdge::NonTerm(nonterm)) => {
            w.emit_record(rtn_record::RTN_TRANSITION_NONTERM, &[state as u64, t.target as u64, nonterm.0 as u64, slot]);
          }
          None => {}
        }
      }
    }

    w.end_block(sub);
  }

  w.end_block(rtns_block);
}

fn emit_glas(w: &mut BitcodeWriter, g: &CompiledGrammar) {
  let glas_block = w.enter_block(block_id::GLAS);

  for gla in g.glas {
    let sub = w.enter_block(block_id::GLA);

    for state in 0..gla.state_count() as u32 {
      match gla.finals.get(&state) {
        Some(GlaPrediction::Transition(i)) => {
          w.emit_record(gla_record::GLA_FINAL_STATE, &[state as u64, 0, *i as u64]);
        }
        Some(GlaPrediction::Return) => {
          w.emit_record(gla_record::GLA_FINAL_STATE, &[state as u64, 1, 0]);
        }
        None => {
          w.emit_record(gla_record::GLA_STATE, &[state as u64]);
        }
      }

      for t in &gla.states[state as usize].transitions {
        let (kind, value) = match t.edge {
          Some(GlaEdge::Terminal(term)) => (0u64, term.0 as u64),
          Some(GlaEdge::Eof) => (1u64, 0u64),
          None => continue,
        };
        w.emit_record(gla_record::GLA_TRANSITION, &[state as u64, t.target as u64, kind, value]);
      }
    }

    w.end_block(sub);
  }

  w.end_block(glas_block);
}

fn emit_intfa(w: &mut BitcodeWriter, g: &CompiledGrammar) {
  let intfas_block = w.enter_block(block_id::INTFAS);
  let intfa_block = w.enter_block(block_id::INTFA);

  for state in 0..g.intfa.state_count() as u32 {
    match g.intfa.finals.get(&state) {
      Some(term) => w.emit_record(intfa_record::INTFA_FINAL_STATE, &[state as u64, term.0 as u64]),
      None => w.emit_record(intfa_record::INTFA_STATE, &[state as u64]),
    }

    for t in &g.intfa.states[state as usize].transitions {
      let Some(set) = &t.edge else { continue };
      let ranges = set.materialize();
      if ranges.len() == 1 && ranges[0].0 == ranges[0].1 {
        w.emit_record(intfa_record::INTFA_TRANSITION, &[state as u64, t.target as u64, ranges[0].0 as u64]);
      } else {
        for &(lo, hi) in &ranges {
          w.emit_record(intfa_record::INTFA_TRANSITION_RANGE, &[state as u64, t.target as u64, lo as u64, hi as u64]);
        }
      }
    }
  }

  w.end_block(intfa_block);
  w.end_block(intfas_block);
}
