//! Ties the grammar pipeline together: source text in, a byte-serialized
//! artifact out. Each phase gets its own named report on the journal so a
//! caller that wants to see exactly where a compile went wrong can ask for
//! it by `ReportType`.

pub mod ast;
pub mod coalesce;
pub mod follow;
pub mod gla;
pub mod lexer;
pub mod linearize;
pub mod lower;
pub mod parser;
pub mod regex;

use crate::error::VellumError;
use crate::journal::{Journal, ReportType};
use crate::minimize::minimize;
use crate::nfa_to_dfa::determinize;
use crate::priority::propagate_priorities;
use follow::{compute_follow_sets, Rtn};
use lower::RtnNfa;
use parser::Parser;

/// Compiles `source` end to end, recording errors and timings on `journal`
/// as it goes. Returns the emitted bytes, or `Err(())` once any phase
/// leaves a critical error behind — the caller reads `journal.all_errors()`
/// for the details, the same way `lib::compile` does.
pub fn compile_source(journal: &mut Journal, source: &str, source_name: &str) -> Result<Vec<u8>, ()> {
  journal.set_active_report("grammar parse", ReportType::GrammarParse);
  let ast = match Parser::new(source).and_then(|mut p| p.parse_grammar()) {
    Ok(ast) => ast,
    Err((message, token)) => {
      journal.report_mut().add_error(VellumError::GrammarError { message, source_name: source_name.to_string(), token: Some(token) });
      return Err(());
    }
  };

  let lowered = match lower::lower(&ast, source_name) {
    Ok(l) => l,
    Err(errs) => {
      for e in errs {
        journal.report_mut().add_error(e);
      }
      return Err(());
    }
  };
  journal.flush_active();

  journal.set_active_report("recursion check", ReportType::GrammarParse);
  let recursion_errors = follow::check_recursion(&lowered.rtns, &lowered.nonterm_names, source_name);
  if !recursion_errors.is_empty() {
    for e in recursion_errors {
      journal.report_mut().add_error(e);
    }
    return Err(());
  }
  journal.flush_active();

  journal.set_active_report("priority propagation", ReportType::PriorityPropagation);
  let mut nfas = lowered.rtns;
  for nfa in nfas.iter_mut() {
    if let Err(dup) = propagate_priorities(nfa) {
      journal.report_mut().add_error(VellumError::GrammarError {
        message: format!("priority class {} is assigned conflicting ranks reaching state {}", dup.class, dup.state),
        source_name: source_name.to_string(),
        token: None,
      });
    }
  }
  if !journal.report().errors().is_empty() {
    return Err(());
  }
  journal.flush_active();

  journal.set_active_report("determinize + minimize", ReportType::NfaToDfa);
  let rtns: Vec<Rtn> = nfas.iter().map(determinize_rtn).map(|dfa| minimize(&dfa)).collect();
  journal.flush_active();

  journal.set_active_report("gla construction", ReportType::GlaConstruction);
  let max_k = journal.config().max_k;
  let follow_sets = compute_follow_sets(&rtns, lowered.start);
  let mut glas: Vec<gla::Gla> = Vec::new();
  let mut gla_for_state: std::collections::BTreeMap<(u32, u32), u32> = std::collections::BTreeMap::new();
  for (rule_idx, rtn) in rtns.iter().enumerate() {
    let rule_id = crate::ids::NonTermId(rule_idx as u32);
    for state in 0..rtn.state_count() as u32 {
      if !gla::is_nontrivial(rtn, state) {
        continue;
      }
      match gla::construct_gla(&rtns, &lowered.nonterm_names, &follow_sets, rule_id, state, max_k) {
        Ok(Some(built)) => {
          gla_for_state.insert((rule_idx as u32, state), glas.len() as u32);
          glas.push(built);
        }
        Ok(None) => {}
        Err(e) => journal.report_mut().add_error(e),
      }
    }
  }
  if !journal.report().errors().is_empty() {
    return Err(());
  }
  journal.flush_active();

  journal.set_active_report("coalescing", ReportType::Coalescing);
  let terminal_nfas: Vec<_> = lowered.terminals.iter().map(|t| t.nfa.clone()).collect();
  let terminal_names: Vec<String> = lowered.terminals.iter().map(|t| t.name.clone()).collect();
  let (intfa, coalesce_errors) = coalesce::coalesce(&terminal_nfas, &terminal_names, &rtns, &glas);
  for e in coalesce_errors {
    journal.report_mut().add_error(e);
  }
  if !journal.report().errors().is_empty() {
    return Err(());
  }
  journal.flush_active();

  let allows = if journal.config().allow_subparser_injection {
    compute_allow_closures(&rtns, &lowered.allows)
  } else {
    Vec::new()
  };

  journal.set_active_report("linearization", ReportType::Linearization);
  let bytes = linearize::linearize(&linearize::CompiledGrammar {
    nonterm_names: &lowered.nonterm_names,
    terminal_names: &terminal_names,
    rtns: &rtns,
    glas: &glas,
    gla_for_state: &gla_for_state,
    intfa: &intfa,
    start: lowered.start,
    allows: &allows,
  });
  journal.flush_active();

  Ok(bytes)
}

/// Resolves each `@allow` directive to the flat set of `(subparser
/// terminal, rule)` pairs naming every rule whose states should
/// transparently accept that terminal: the directive's start rule and
/// every rule transitively called from it, without crossing into one of
/// its end rules.
fn compute_allow_closures(rtns: &[Rtn], allows: &[lower::LoweredAllow]) -> Vec<(u32, u32)> {
  use crate::fa::rtn_edge::RtnEdge;
  use std::collections::BTreeSet;

  let mut out = BTreeSet::new();
  for allow in allows {
    let mut visited: BTreeSet<u32> = BTreeSet::new();
    let mut queue = vec![allow.start_rule.0];
    visited.insert(allow.start_rule.0);
    while let Some(rule) = queue.pop() {
      out.insert((allow.subparser.0, rule));
      if allow.end_rules.iter().any(|e| e.0 == rule) {
        continue;
      }
      let Some(rtn) = rtns.get(rule as usize) else { continue };
      for state in &rtn.states {
        for t in &state.transitions {
          if let Some(RtnEdge::NonTerm(callee)) = t.edge {
            if visited.insert(callee.0) {
              queue.push(callee.0);
            }
          }
        }
      }
    }
  }
  out.into_iter().collect()
}

fn determinize_rtn(nfa: &RtnNfa) -> Rtn {
  determinize(
    nfa,
    |props_list| {
      let mut out = crate::fa::rtn_edge::RtnProps::default();
      for p in props_list {
        if out.slot_index.is_none() {
          out.slot_index = p.slot_index;
        }
        if out.slot_name.is_none() {
          out.slot_name = p.slot_name.clone();
        }
        for (&class, &rank) in &p.priorities {
          out.priorities.entry(class).or_insert(rank);
        }
      }
      out
    },
    |finals| {
      let mut out = crate::fa::rtn_edge::RtnFinal::default();
      for f in finals {
        for (&class, &rank) in &f.priorities {
          out.priorities.entry(class).or_insert(rank);
        }
      }
      Some(out)
    },
  )
}
