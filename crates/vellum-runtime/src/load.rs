//! Byte-artifact loader (spec §4.8): the dual of
//! `vellum_core::grammar::linearize`. Walks the block-structured container
//! and rebuilds the tables in `types`, in one pass — since every record a
//! state needs (its own marker, then its transitions) is emitted
//! contiguously and in index order by the linearizer, states can simply be
//! appended as their marker records are seen rather than pre-sized by a
//! separate counting pass.

use crate::error::LoadError;
use crate::types::{Gla, GlaEdge, GlaPrediction, GlaState, GlaTransition, IntFa, IntFaState, IntFaTransition, LoadedGrammar, Rtn, RtnEdge, RtnState, RtnStateKind, RtnTransition};
use std::collections::BTreeMap;
use vellum_bitcode::blocks::{allow_record, block_id, gla_record, intfa_record, rtn_record, strings_record, APP_MAGIC};
use vellum_bitcode::{BitcodeReader, Entry};

pub fn load_grammar(bytes: &[u8]) -> Result<LoadedGrammar, LoadError> {
  let mut r = BitcodeReader::new(bytes, APP_MAGIC)?;

  let mut strings: Option<Vec<String>> = None;
  let mut intfa: Option<IntFa> = None;
  let mut glas: Option<Vec<Gla>> = None;
  let mut rtns_info: Option<(u32, u32, u32)> = None;
  let mut rtns: Option<Vec<Rtn>> = None;
  let mut allowed_subparsers: BTreeMap<u32, Vec<u32>> = BTreeMap::new();

  while let Some(entry) = r.next()? {
    match entry {
      Entry::EnterSubblock { block_id: bid, len_bytes } => match bid {
        block_id::STRINGS => strings = Some(read_strings(&mut r)?),
        block_id::INTFAS => intfa = Some(read_intfas(&mut r)?),
        block_id::GLAS => glas = Some(read_glas(&mut r)?),
        block_id::RTNS => {
          let (info, parsed) = read_rtns(&mut r)?;
          rtns_info = Some(info);
          rtns = Some(parsed);
        }
        block_id::ALLOWS => allowed_subparsers = read_allows(&mut r)?,
        _ => r.skip_block(len_bytes)?,
      },
      Entry::EndBlock => {}
      _ => {}
    }
  }

  let strings = strings.ok_or(LoadError::MissingBlock { name: "STRINGS" })?;
  let intfa = intfa.ok_or(LoadError::MissingBlock { name: "INTFAS" })?;
  let glas = glas.ok_or(LoadError::MissingBlock { name: "GLAS" })?;
  let rtns = rtns.ok_or(LoadError::MissingBlock { name: "RTNS" })?;
  let (start_rule, nonterm_count, terminal_count) = rtns_info.ok_or(LoadError::MissingBlock { name: "RTNS" })?;

  if strings.len() != (nonterm_count + terminal_count) as usize {
    return Err(LoadError::MalformedRecord { detail: format!("strings table has {} entries, expected {} nonterminal + {} terminal names", strings.len(), nonterm_count, terminal_count) });
  }

  Ok(LoadedGrammar { strings, terminal_names_offset: nonterm_count as usize, rtns, glas, intfa, start_rule, allowed_subparsers })
}

fn read_allows(r: &mut BitcodeReader) -> Result<BTreeMap<u32, Vec<u32>>, LoadError> {
  let mut out: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
  loop {
    match next_or_truncated(r)? {
      Entry::Record { code, fields } if code == allow_record::ALLOW_ENTRY => {
        let terminal = *fields.first().ok_or_else(|| short_record("ALLOW_ENTRY"))? as u32;
        let rule = *fields.get(1).ok_or_else(|| short_record("ALLOW_ENTRY"))? as u32;
        out.entry(rule).or_default().push(terminal);
      }
      Entry::EndBlock => return Ok(out),
      other => return Err(unexpected(&other, "an ALLOW_ENTRY record")),
    }
  }
}

fn read_strings(r: &mut BitcodeReader) -> Result<Vec<String>, LoadError> {
  let mut out = Vec::new();
  loop {
    match next_or_truncated(r)? {
      Entry::Blob { code, bytes } if code == strings_record::STRING => {
        out.push(String::from_utf8(bytes).map_err(|e| LoadError::MalformedRecord { detail: format!("string table entry is not valid UTF-8: {e}") })?);
      }
      Entry::EndBlock => return Ok(out),
      other => return Err(unexpected(&other, "a STRING blob")),
    }
  }
}

fn read_intfas(r: &mut BitcodeReader) -> Result<IntFa, LoadError> {
  match next_or_truncated(r)? {
    Entry::EnterSubblock { block_id: bid, .. } if bid == block_id::INTFA => {}
    other => return Err(unexpected(&other, "an INTFA subblock")),
  }
  let intfa = read_intfa_body(r)?;
  match next_or_truncated(r)? {
    Entry::EndBlock => Ok(intfa),
    other => return Err(unexpected(&other, "end of INTFAS block")),
  }
}

fn read_intfa_body(r: &mut BitcodeReader) -> Result<IntFa, LoadError> {
  let mut states: Vec<IntFaState> = Vec::new();
  loop {
    match next_or_truncated(r)? {
      Entry::Record { code, fields } if code == intfa_record::INTFA_STATE => {
        let _ = fields;
        states.push(IntFaState::default());
      }
      Entry::Record { code, fields } if code == intfa_record::INTFA_FINAL_STATE => {
        let term = *fields.get(1).ok_or_else(|| short_record("INTFA_FINAL_STATE"))? as u32;
        states.push(IntFaState { transitions: Vec::new(), final_terminal: Some(term) });
      }
      Entry::Record { code, fields } if code == intfa_record::INTFA_TRANSITION => {
        let target = *fields.get(1).ok_or_else(|| short_record("INTFA_TRANSITION"))? as u32;
        let value = *fields.get(2).ok_or_else(|| short_record("INTFA_TRANSITION"))? as u32;
        last_state(&mut states, "INTFA_TRANSITION")?.transitions.push(IntFaTransition { lo: value, hi: value, target });
      }
      Entry::Record { code, fields } if code == intfa_record::INTFA_TRANSITION_RANGE => {
        let target = *fields.get(1).ok_or_else(|| short_record("INTFA_TRANSITION_RANGE"))? as u32;
        let lo = *fields.get(2).ok_or_else(|| short_record("INTFA_TRANSITION_RANGE"))? as u32;
        let hi = *fields.get(3).ok_or_else(|| short_record("INTFA_TRANSITION_RANGE"))? as u32;
        last_state(&mut states, "INTFA_TRANSITION_RANGE")?.transitions.push(IntFaTransition { lo, hi, target });
      }
      Entry::EndBlock => return Ok(IntFa { states, start: 0 }),
      other => return Err(unexpected(&other, "an INTFA record")),
    }
  }
}

fn read_glas(r: &mut BitcodeReader) -> Result<Vec<Gla>, LoadError> {
  let mut out = Vec::new();
  loop {
    match next_or_truncated(r)? {
      Entry::EnterSubblock { block_id: bid, .. } if bid == block_id::GLA => out.push(read_gla_body(r)?),
      Entry::EndBlock => return Ok(out),
      other => return Err(unexpected(&other, "a GLA subblock")),
    }
  }
}

fn read_gla_body(r: &mut BitcodeReader) -> Result<Gla, LoadError> {
  let mut states: Vec<GlaState> = Vec::new();
  loop {
    match next_or_truncated(r)? {
      Entry::Record { code, fields } if code == gla_record::GLA_STATE => {
        let _ = fields;
        states.push(GlaState::default());
      }
      Entry::Record { code, fields } if code == gla_record::GLA_FINAL_STATE => {
        let kind = *fields.get(1).ok_or_else(|| short_record("GLA_FINAL_STATE"))?;
        let value = *fields.get(2).ok_or_else(|| short_record("GLA_FINAL_STATE"))? as u32;
        let prediction = if kind == 0 { GlaPrediction::Transition(value) } else { GlaPrediction::Return };
        states.push(GlaState { transitions: Vec::new(), prediction: Some(prediction) });
      }
      Entry::Record { code, fields } if code == gla_record::GLA_TRANSITION => {
        let target = *fields.get(1).ok_or_else(|| short_record("GLA_TRANSITION"))? as u32;
        let kind = *fields.get(2).ok_or_else(|| short_record("GLA_TRANSITION"))?;
        let value = *fields.get(3).ok_or_else(|| short_record("GLA_TRANSITION"))? as u32;
        let edge = if kind == 0 { GlaEdge::Terminal(value) } else { GlaEdge::Eof };
        last_state(&mut states, "GLA_TRANSITION")?.transitions.push(GlaTransition { edge, target });
      }
      Entry::EndBlock => return Ok(Gla { states, start: 0 }),
      other => return Err(unexpected(&other, "a GLA record")),
    }
  }
}

fn read_rtns(r: &mut BitcodeReader) -> Result<((u32, u32, u32), Vec<Rtn>), LoadError> {
  let info = match next_or_truncated(r)? {
    Entry::Record { code, fields } if code == rtn_record::RTN_INFO => {
      let start = *fields.first().ok_or_else(|| short_record("RTN_INFO"))? as u32;
      let nonterm_count = *fields.get(1).ok_or_else(|| short_record("RTN_INFO"))? as u32;
      let terminal_count = *fields.get(2).ok_or_else(|| short_record("RTN_INFO"))? as u32;
      (start, nonterm_count, terminal_count)
    }
    other => return Err(unexpected(&other, "an RTN_INFO record")),
  };

  let mut out = Vec::new();
  loop {
    match next_or_truncated(r)? {
      Entry::EnterSubblock { block_id: bid, .. } if bid == block_id::RTN => out.push(read_rtn_body(r)?),
      Entry::EndBlock => return Ok((info, out)),
      other => return Err(unexpected(&other, "an RTN subblock")),
    }
  }
}

fn read_rtn_body(r: &mut BitcodeReader) -> Result<Rtn, LoadError> {
  let mut states: Vec<RtnState> = Vec::new();
  loop {
    match next_or_truncated(r)? {
      Entry::Record { code, fields } if code == rtn_record::RTN_STATE_WITH_INTFA => {
        let is_final = *fields.get(1).ok_or_else(|| short_record("RTN_STATE_WITH_INTFA"))? != 0;
        states.push(RtnState { kind: RtnStateKind::WithIntFa, is_final, transitions: Vec::new() });
      }
      Entry::Record { code, fields } if code == rtn_record::RTN_STATE_WITH_GLA => {
        let is_final = *fields.get(1).ok_or_else(|| short_record("RTN_STATE_WITH_GLA"))? != 0;
        let gla_id = *fields.get(2).ok_or_else(|| short_record("RTN_STATE_WITH_GLA"))? as u32;
        states.push(RtnState { kind: RtnStateKind::WithGla(gla_id), is_final, transitions: Vec::new() });
      }
      Entry::Record { code, fields } if code == rtn_record::RTN_TRIVIAL_STATE => {
        let is_final = *fields.get(1).ok_or_else(|| short_record("RTN_TRIVIAL_STATE"))? != 0;
        states.push(RtnState { kind: RtnStateKind::Trivial, is_final, transitions: Vec::new() });
      }
      Entry::Record { code, fields } if code == rtn_record::RTN_TRANSITION_TERMINAL => {
        let target = *fields.get(1).ok_or_else(|| short_record("RTN_TRANSITION_TERMINAL"))? as u32;
        let term = *fields.get(2).ok_or_else(|| short_record("RTN_TRANSITION_TERMINAL"))? as u32;
        let slot = decode_slot(*fields.get(3).ok_or_else(|| short_record("RTN_TRANSITION_TERMINAL"))?);
        last_state(&mut states, "RTN_TRANSITION_TERMINAL")?.transitions.push(RtnTransition { edge: RtnEdge::Terminal(term), target, slot });
      }
      Entry::Record { code, fields } if code == rtn_record::RTN_TRANSITION_NONTERM => {
        let target = *fields.get(1).ok_or_else(|| short_record("RTN_TRANSITION_NONTERM"))? as u32;
        let nonterm = *fields.get(2).ok_or_else(|| short_record("RTN_TRANSITION_NONTERM"))? as u32;
        let slot = decode_slot(*fields.get(3).ok_or_else(|| short_record("RTN_TRANSITION_NONTERM"))?);
        last_state(&mut states, "RTN_TRANSITION_NONTERM")?.transitions.push(RtnTransition { edge: RtnEdge::NonTerm(nonterm), target, slot });
      }
      Entry::EndBlock => return Ok(Rtn { states, start: 0 }),
      other => return Err(unexpected(&other, "an RTN record")),
    }
  }
}

fn decode_slot(raw: u64) -> Option<u32> {
  if raw == u64::MAX {
    None
  } else {
    Some(raw as u32)
  }
}

fn last_state<S>(states: &mut [S], record_name: &'static str) -> Result<&mut S, LoadError> {
  states.last_mut().ok_or_else(|| LoadError::MalformedRecord { detail: format!("{record_name} transition record appeared before any state record") })
}

fn short_record(name: &'static str) -> LoadError {
  LoadError::MalformedRecord { detail: format!("{name} record is missing a field") }
}

fn next_or_truncated(r: &mut BitcodeReader) -> Result<Entry, LoadError> {
  r.next()?.ok_or(LoadError::Bitcode(vellum_bitcode::BitcodeError::TruncatedStream))
}

fn unexpected(entry: &Entry, wanted: &str) -> LoadError {
  LoadError::MalformedRecord { detail: format!("expected {wanted}, found {entry:?}") }
}
