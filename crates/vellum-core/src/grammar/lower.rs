//! Lowers a `GrammarAst` into per-rule NFAs (via Thompson construction) and
//! per-terminal NFAs (via the regex sub-parser or literal-string
//! concatenation), resolving every name reference to a `TermId`/`NonTermId`
//! along the way.

use super::ast::*;
use super::regex::RegexParser;
use crate::error::VellumError;
use crate::fa::rtn_edge::{RtnEdge, RtnFinal, RtnProps};
use crate::fa::thompson;
use crate::fa::{intfa_edge::IntFaProps, Automaton};
use crate::ids::{NonTermId, TermId};
use crate::intset::IntSet;
use std::collections::BTreeMap;

pub type RtnNfa = Automaton<RtnEdge, RtnProps, RtnFinal>;
pub type TermNfa = Automaton<IntSet, IntFaProps, ()>;

#[derive(Clone, Debug)]
pub enum TerminalOrigin {
  Regex,
  Literal(String),
}

pub struct LoweredTerminal {
  pub name: String,
  pub origin: TerminalOrigin,
  pub nfa: TermNfa,
}

pub struct LoweredAllow {
  pub subparser: TermId,
  pub start_rule: NonTermId,
  pub end_rules: Vec<NonTermId>,
}

pub struct Lowered {
  pub nonterm_names: Vec<String>,
  pub rtns: Vec<RtnNfa>,
  pub terminals: Vec<LoweredTerminal>,
  pub start: NonTermId,
  pub allows: Vec<LoweredAllow>,
}

#[derive(Clone, Copy)]
enum Sym {
  NonTerm(NonTermId),
  Term(TermId),
}

struct SymbolTable {
  by_name: BTreeMap<String, Sym>,
}

pub fn lower(ast: &GrammarAst, source_name: &str) -> Result<Lowered, Vec<VellumError>> {
  let mut errors = Vec::new();
  let mut table = SymbolTable { by_name: BTreeMap::new() };
  let mut nonterm_names = Vec::new();
  let mut terminal_defs: Vec<&TerminalDef> = Vec::new();

  for (i, r) in ast.rules.iter().enumerate() {
    if let Some(prior) = table.by_name.get(&r.name) {
      let kind = match prior {
        Sym::NonTerm(_) => "rule",
        Sym::Term(_) => "terminal",
      };
      errors.push(VellumError::GrammarError {
        message: format!("redefinition of `{}` (already defined as a {kind})", r.name),
        source_name: source_name.to_string(),
        token: Some(r.name_token),
      });
      continue;
    }
    table.by_name.insert(r.name.clone(), Sym::NonTerm(NonTermId(i as u32)));
    nonterm_names.push(r.name.clone());
  }

  for t in &ast.terminals {
    if let Some(prior) = table.by_name.get(&t.name) {
      let kind = match prior {
        Sym::NonTerm(_) => "rule",
        Sym::Term(_) => "terminal",
      };
      errors.push(VellumError::GrammarError {
        message: format!("redefinition of `{}` (already defined as a {kind})", t.name),
        source_name: source_name.to_string(),
        token: Some(t.name_token),
      });
      continue;
    }
    let id = TermId(terminal_defs.len() as u32);
    table.by_name.insert(t.name.clone(), Sym::Term(id));
    terminal_defs.push(t);
  }

  let mut terminals: Vec<LoweredTerminal> = Vec::with_capacity(terminal_defs.len());
  for t in &terminal_defs {
    match build_regex_terminal(&t.regex_source, t.regex_token) {
      Ok(nfa) => terminals.push(LoweredTerminal { name: t.name.clone(), origin: TerminalOrigin::Regex, nfa }),
      Err((msg, tok)) => errors.push(VellumError::GrammarError { message: msg, source_name: source_name.to_string(), token: Some(tok) }),
    }
  }

  let mut literal_ids: BTreeMap<String, TermId> = BTreeMap::new();
  let mut priority_class_counter: u32 = 0;

  let mut rtns = Vec::with_capacity(ast.rules.len());
  for rule in &ast.rules {
    match build_rule(rule, &table, &mut literal_ids, &mut terminals, &mut priority_class_counter, source_name) {
      Ok(nfa) => rtns.push(nfa),
      Err(mut errs) => errors.append(&mut errs),
    }
  }

  let start = match &ast.start {
    Some((name, tok)) => match table.by_name.get(name) {
      Some(Sym::NonTerm(id)) => Some(*id),
      Some(Sym::Term(_)) => {
        errors.push(VellumError::GrammarError { message: format!("`@start {name}` names a terminal, not a rule"), source_name: source_name.to_string(), token: Some(*tok) });
        None
      }
      None => {
        errors.push(VellumError::GrammarError { message: format!("`@start` names undefined symbol `{name}`"), source_name: source_name.to_string(), token: Some(*tok) });
        None
      }
    },
    None => ast.rules.first().map(|_| NonTermId(0)),
  };

  let mut allows = Vec::new();
  for allow in &ast.allows {
    let subparser = match table.by_name.get(&allow.subparser) {
      Some(Sym::Term(id)) => Some(*id),
      _ => {
        errors.push(VellumError::GrammarError { message: format!("`@allow` names undefined terminal `{}`", allow.subparser), source_name: source_name.to_string(), token: Some(allow.token) });
        None
      }
    };
    let start_rule = match table.by_name.get(&allow.start_rule) {
      Some(Sym::NonTerm(id)) => Some(*id),
      _ => {
        errors.push(VellumError::GrammarError { message: format!("`@allow` names undefined rule `{}`", allow.start_rule), source_name: source_name.to_string(), token: Some(allow.token) });
        None
      }
    };
    let mut end_rules = Vec::new();
    for e in &allow.end_rules {
      match table.by_name.get(e) {
        Some(Sym::NonTerm(id)) => end_rules.push(*id),
        _ => errors.push(VellumError::GrammarError { message: format!("`@allow` names undefined rule `{e}`"), source_name: source_name.to_string(), token: Some(allow.token) }),
      }
    }
    if let (Some(subparser), Some(start_rule)) = (subparser, start_rule) {
      allows.push(LoweredAllow { subparser, start_rule, end_rules });
    }
  }

  if !errors.is_empty() {
    return Err(errors);
  }

  Ok(Lowered { nonterm_names, rtns, terminals, start: start.unwrap_or(NonTermId(0)), allows })
}

fn build_regex_terminal(source: &str, token: crate::token::Token) -> Result<TermNfa, (String, crate::token::Token)> {
  let mut nfa: TermNfa = Automaton::new();
  let mut parser = RegexParser::new(source);
  let frag = parser.parse(&mut nfa, token)?;
  nfa.start = frag.start;
  nfa.finals.insert(frag.accept, ());
  Ok(nfa)
}

fn build_literal_terminal(text: &str) -> TermNfa {
  let mut nfa: TermNfa = Automaton::new();
  let mut frag: Option<thompson::Fragment> = None;
  for b in text.bytes() {
    let next = thompson::symbol(&mut nfa, IntSet::single(b as u32));
    frag = Some(match frag {
      None => next,
      Some(prev) => thompson::concat(&mut nfa, prev, next),
    });
  }
  let frag = frag.unwrap_or_else(|| thompson::epsilon(&mut nfa));
  nfa.start = frag.start;
  nfa.finals.insert(frag.accept, ());
  nfa
}

fn intern_literal(text: &str, literal_ids: &mut BTreeMap<String, TermId>, terminals: &mut Vec<LoweredTerminal>) -> TermId {
  if let Some(id) = literal_ids.get(text) {
    return *id;
  }
  let id = TermId(terminals.len() as u32);
  terminals.push(LoweredTerminal { name: format!("{text:?}"), origin: TerminalOrigin::Literal(text.to_string()), nfa: build_literal_terminal(text) });
  literal_ids.insert(text.to_string(), id);
  id
}

/// A textual fingerprint of a derivation, used only to spot two prioritized
/// alternatives that can never be told apart because they match exactly the
/// same sequence of symbols — a later such alternative can never win since
/// an earlier, higher-priority one already claims everything it would.
fn derivation_signature(derivation: &Derivation) -> Vec<String> {
  derivation.iter().map(term_signature).collect()
}

fn term_signature(term: &Term) -> String {
  match term {
    Term::Literal(text, _) => format!("lit:{text:?}"),
    Term::Ref(name, _) => format!("ref:{name}"),
    Term::Group(alt) => {
      let groups: Vec<String> = alt
        .groups
        .iter()
        .map(|g| g.derivations.iter().map(|d| derivation_signature(d).join(" ")).collect::<Vec<_>>().join("|"))
        .collect();
      format!("({})", groups.join(","))
    }
    Term::Named { inner, .. } => term_signature(inner),
    Term::Repeat { inner, op, separator, .. } => {
      let sep = separator.as_ref().map(|s| term_signature(s)).unwrap_or_default();
      format!("{}{:?}({sep})", term_signature(inner), op)
    }
  }
}

fn term_token(term: &Term) -> Option<crate::token::Token> {
  match term {
    Term::Literal(_, t) | Term::Ref(_, t) => Some(*t),
    Term::Named { inner, .. } => term_token(inner),
    Term::Repeat { inner, .. } => term_token(inner),
    Term::Group(_) => None,
  }
}

fn build_rule(
  rule: &RuleDef,
  table: &SymbolTable,
  literal_ids: &mut BTreeMap<String, TermId>,
  terminals: &mut Vec<LoweredTerminal>,
  priority_counter: &mut u32,
  source_name: &str,
) -> Result<RtnNfa, Vec<VellumError>> {
  let mut nfa: RtnNfa = Automaton::new();
  let mut errors = Vec::new();
  let mut slot_counter: u32 = 0;

  let frag = build_alternation(&rule.rhs, &mut nfa, table, literal_ids, terminals, priority_counter, &mut slot_counter, &mut errors, source_name);

  for err in &mut errors {
    if let VellumError::UnreachableAlternative { nonterminal, .. } = err {
      *nonterminal = rule.name.clone();
    }
  }

  if !errors.is_empty() {
    return Err(errors);
  }

  let frag = frag.expect("build_alternation only returns None alongside collected errors");
  nfa.start = frag.start;
  nfa.finals.insert(frag.accept, RtnFinal::default());
  Ok(nfa)
}

#[allow(clippy::too_many_arguments)]
fn build_alternation(
  alt: &Alternation,
  nfa: &mut RtnNfa,
  table: &SymbolTable,
  literal_ids: &mut BTreeMap<String, TermId>,
  terminals: &mut Vec<LoweredTerminal>,
  priority_counter: &mut u32,
  slot_counter: &mut u32,
  errors: &mut Vec<VellumError>,
  source_name: &str,
) -> Option<thompson::Fragment> {
  let mut branches = Vec::new();
  for group in &alt.groups {
    if let Some(f) = build_prioritized_group(group, nfa, table, literal_ids, terminals, priority_counter, slot_counter, errors, source_name) {
      branches.push(f);
    }
  }
  if !errors.is_empty() {
    return None;
  }
  Some(if branches.len() == 1 { branches.pop().unwrap() } else { thompson::alt(nfa, branches) })
}

#[allow(clippy::too_many_arguments)]
fn build_prioritized_group(
  group: &PrioritizedGroup,
  nfa: &mut RtnNfa,
  table: &SymbolTable,
  literal_ids: &mut BTreeMap<String, TermId>,
  terminals: &mut Vec<LoweredTerminal>,
  priority_counter: &mut u32,
  slot_counter: &mut u32,
  errors: &mut Vec<VellumError>,
  source_name: &str,
) -> Option<thompson::Fragment> {
  if group.derivations.len() == 1 {
    return build_derivation(&group.derivations[0], nfa, table, literal_ids, terminals, priority_counter, slot_counter, errors, source_name);
  }
  let class = *priority_counter;
  *priority_counter += 1;

  let mut seen_signatures: Vec<Vec<String>> = Vec::new();
  for (rank, derivation) in group.derivations.iter().enumerate() {
    let sig = derivation_signature(derivation);
    if seen_signatures.contains(&sig) {
      errors.push(VellumError::UnreachableAlternative {
        nonterminal: format!("alternative #{rank} of a prioritized group"),
        token: derivation.first().and_then(term_token),
      });
    } else {
      seen_signatures.push(sig);
    }
  }

  let start = nfa.add_state();
  let accept = nfa.add_state();
  for (rank, derivation) in group.derivations.iter().enumerate() {
    let mut props = RtnProps::default();
    props.priorities.insert(class, rank as u32);
    let Some(inner) = build_derivation(derivation, nfa, table, literal_ids, terminals, priority_counter, slot_counter, errors, source_name) else { continue };
    nfa.add_transition(start, None, inner.start, props);
    nfa.add_transition(inner.accept, None, accept, RtnProps::default());
  }
  if !errors.is_empty() {
    return None;
  }
  Some(thompson::Fragment { start, accept })
}

#[allow(clippy::too_many_arguments)]
fn build_derivation(
  derivation: &Derivation,
  nfa: &mut RtnNfa,
  table: &SymbolTable,
  literal_ids: &mut BTreeMap<String, TermId>,
  terminals: &mut Vec<LoweredTerminal>,
  priority_counter: &mut u32,
  slot_counter: &mut u32,
  errors: &mut Vec<VellumError>,
  source_name: &str,
) -> Option<thompson::Fragment> {
  let mut frag: Option<thompson::Fragment> = None;
  for term in derivation {
    let next = build_term(term, nfa, table, literal_ids, terminals, priority_counter, slot_counter, errors, source_name, None)?;
    frag = Some(match frag {
      None => next,
      Some(prev) => thompson::concat(nfa, prev, next),
    });
  }
  Some(frag.unwrap_or_else(|| thompson::epsilon(nfa)))
}

#[allow(clippy::too_many_arguments)]
fn build_term(
  term: &Term,
  nfa: &mut RtnNfa,
  table: &SymbolTable,
  literal_ids: &mut BTreeMap<String, TermId>,
  terminals: &mut Vec<LoweredTerminal>,
  priority_counter: &mut u32,
  slot_counter: &mut u32,
  errors: &mut Vec<VellumError>,
  source_name: &str,
  pending_name: Option<&str>,
) -> Option<thompson::Fragment> {
  match term {
    Term::Literal(text, _) => {
      let id = intern_literal(text, literal_ids, terminals);
      let slot = *slot_counter;
      *slot_counter += 1;
      let mut props = RtnProps::default();
      props.slot_index = Some(slot);
      props.slot_name = pending_name.map(|s| s.to_string());
      Some(thompson::symbol(nfa, RtnEdge::Terminal(id)).tag(nfa, props))
    }
    Term::Ref(name, tok) => match table.by_name.get(name) {
      Some(Sym::Term(id)) => {
        let slot = *slot_counter;
        *slot_counter += 1;
        let mut props = RtnProps::default();
        props.slot_index = Some(slot);
        props.slot_name = pending_name.map(|s| s.to_string());
        Some(thompson::symbol(nfa, RtnEdge::Terminal(*id)).tag(nfa, props))
      }
      Some(Sym::NonTerm(id)) => {
        let slot = *slot_counter;
        *slot_counter += 1;
        let mut props = RtnProps::default();
        props.slot_index = Some(slot);
        props.slot_name = pending_name.map(|s| s.to_string());
        Some(thompson::symbol(nfa, RtnEdge::NonTerm(*id)).tag(nfa, props))
      }
      None => {
        errors.push(VellumError::GrammarError { message: format!("reference to undefined symbol `{name}`"), source_name: source_name.to_string(), token: Some(*tok) });
        None
      }
    },
    Term::Group(inner) => build_alternation(inner, nfa, table, literal_ids, terminals, priority_counter, slot_counter, errors, source_name),
    Term::Named { name, inner } => build_term(inner, nfa, table, literal_ids, terminals, priority_counter, slot_counter, errors, source_name, Some(name)),
    Term::Repeat { inner, op, separator, prefer_more } => {
      let base = build_term(inner, nfa, table, literal_ids, terminals, priority_counter, slot_counter, errors, source_name, pending_name)?;
      let sep_frag = match separator {
        Some(sep) => Some(build_term(sep, nfa, table, literal_ids, terminals, priority_counter, slot_counter, errors, source_name, None)?),
        None => None,
      };
      Some(match (op, sep_frag) {
        (RepeatOp::Question, _) => thompson::optional(nfa, base),
        (RepeatOp::Star, None) => repeat_with_priority(nfa, base, true, *prefer_more, priority_counter),
        (RepeatOp::Plus, None) => repeat_with_priority(nfa, base, false, *prefer_more, priority_counter),
        (RepeatOp::Star, Some(sep)) => thompson::optional(nfa, thompson::plus_separated(nfa, base, sep)),
        (RepeatOp::Plus, Some(sep)) => thompson::plus_separated(nfa, base, sep),
      })
    }
  }
}

/// Builds `a*`/`a+` directly (rather than via `fa::thompson::kleene`/`plus`)
/// so that, when the grammar annotates the repeat with a `+`/`-`
/// prefer-more marker, the two competing epsilon edges (continue vs. stop)
/// can carry a priority class distinguishing them.
fn repeat_with_priority(nfa: &mut RtnNfa, a: thompson::Fragment, allow_zero: bool, prefer_more: Option<bool>, priority_counter: &mut u32) -> thompson::Fragment {
  let start = nfa.add_state();
  let accept = nfa.add_state();

  let (continue_props, stop_props) = match prefer_more {
    Some(prefer) => {
      let class = *priority_counter;
      *priority_counter += 1;
      let mut cont = RtnProps::default();
      let mut stop = RtnProps::default();
      if prefer {
        cont.priorities.insert(class, 0);
        stop.priorities.insert(class, 1);
      } else {
        stop.priorities.insert(class, 0);
        cont.priorities.insert(class, 1);
      }
      (cont, stop)
    }
    None => (RtnProps::default(), RtnProps::default()),
  };

  if allow_zero {
    nfa.add_transition(start, None, a.start, RtnProps::default());
    nfa.add_transition(start, None, accept, stop_props.clone());
  } else {
    nfa.add_transition(start, None, a.start, RtnProps::default());
  }
  nfa.add_transition(a.accept, None, a.start, continue_props);
  nfa.add_transition(a.accept, None, accept, stop_props);
  thompson::Fragment { start, accept }
}

trait TagFragment {
  fn tag(self, nfa: &mut RtnNfa, props: RtnProps) -> thompson::Fragment;
}

impl TagFragment for thompson::Fragment {
  /// `thompson::symbol` always attaches `P::default()`; overwrite it with
  /// the real per-term properties (slot index/name) computed by the
  /// caller, since Thompson's combinators don't know about RTN slots.
  fn tag(self, nfa: &mut RtnNfa, props: RtnProps) -> thompson::Fragment {
    if let Some(t) = nfa.states[self.start as usize].transitions.iter_mut().find(|t| t.target == self.accept) {
      t.props = props;
    }
    self
  }
}
