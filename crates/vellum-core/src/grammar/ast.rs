//! Abstract syntax for the grammar source language, produced by `parser.rs`
//! and consumed by `lower.rs`.

use crate::token::Token;

#[derive(Clone, Debug)]
pub enum Term {
  Literal(String, Token),
  Ref(String, Token),
  Group(Box<Alternation>),
  Named { name: String, inner: Box<Term> },
  Repeat { inner: Box<Term>, op: RepeatOp, separator: Option<Box<Term>>, prefer_more: Option<bool> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RepeatOp {
  Question,
  Star,
  Plus,
}

pub type Derivation = Vec<Term>;

/// `d1 / d2 / d3`: derivations ranked highest-priority first within one
/// priority class.
#[derive(Clone, Debug)]
pub struct PrioritizedGroup {
  pub derivations: Vec<Derivation>,
}

/// `g1 | g2 | g3`: a plain, unranked choice between prioritized groups.
#[derive(Clone, Debug)]
pub struct Alternation {
  pub groups: Vec<PrioritizedGroup>,
}

#[derive(Clone, Debug)]
pub struct RuleDef {
  pub name: String,
  pub name_token: Token,
  pub rhs: Alternation,
}

#[derive(Clone, Debug)]
pub struct TerminalDef {
  pub name: String,
  pub name_token: Token,
  pub regex_source: String,
  pub regex_token: Token,
}

#[derive(Clone, Debug)]
pub struct AllowDirective {
  pub subparser: String,
  pub start_rule: String,
  pub end_rules: Vec<String>,
  pub token: Token,
}

#[derive(Clone, Debug, Default)]
pub struct GrammarAst {
  pub rules: Vec<RuleDef>,
  pub terminals: Vec<TerminalDef>,
  pub start: Option<(String, Token)>,
  pub allows: Vec<AllowDirective>,
}
