//! In-memory runtime tables populated by `load::load_grammar`, indexed by
//! raw `u32`s rather than `vellum_core`'s newtypes — the runtime has no
//! dependency on `vellum_core` and owns no compile-time symbol table, only
//! the strings carried over in the artifact.

/// A single `[lo, hi]` byte/codepoint range on an IntFA transition.
#[derive(Clone, Copy, Debug)]
pub struct IntFaTransition {
  pub lo: u32,
  pub hi: u32,
  pub target: u32,
}

#[derive(Clone, Debug, Default)]
pub struct IntFaState {
  pub transitions: Vec<IntFaTransition>,
  /// Index into `LoadedGrammar::strings` naming the terminal this state
  /// accepts, if it is final.
  pub final_terminal: Option<u32>,
}

#[derive(Clone, Debug, Default)]
pub struct IntFa {
  pub states: Vec<IntFaState>,
  pub start: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlaEdge {
  Terminal(u32),
  Eof,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GlaPrediction {
  /// Predicts the RTN transition at this index in the subject state's
  /// transition list.
  Transition(u32),
  Return,
}

#[derive(Clone, Copy, Debug)]
pub struct GlaTransition {
  pub edge: GlaEdge,
  pub target: u32,
}

#[derive(Clone, Debug, Default)]
pub struct GlaState {
  pub transitions: Vec<GlaTransition>,
  pub prediction: Option<GlaPrediction>,
}

#[derive(Clone, Debug, Default)]
pub struct Gla {
  pub states: Vec<GlaState>,
  pub start: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RtnEdge {
  Terminal(u32),
  NonTerm(u32),
}

#[derive(Clone, Copy, Debug)]
pub struct RtnTransition {
  pub edge: RtnEdge,
  pub target: u32,
  /// The named-slot index a tree-building callback would key on; absent
  /// for transitions synthesized without a `.name =` annotation.
  pub slot: Option<u32>,
}

/// What an RTN state needs to decide its next move, set by the linearizer
/// from whether the state was "trivial", needed only a single-terminal
/// lookahead through the shared IntFA, or needed a full GLA.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RtnStateKind {
  WithIntFa,
  WithGla(u32),
  Trivial,
}

#[derive(Clone, Debug)]
pub struct RtnState {
  pub kind: RtnStateKind,
  pub is_final: bool,
  pub transitions: Vec<RtnTransition>,
}

#[derive(Clone, Debug, Default)]
pub struct Rtn {
  pub states: Vec<RtnState>,
  pub start: u32,
}

/// An immutable, loaded grammar (spec §4.8's "immutable in-memory
/// grammar"). Shared (via `Arc`, see `callbacks::BoundGrammar`) across
/// every parse-state driven against it.
#[derive(Clone, Debug, Default)]
pub struct LoadedGrammar {
  /// Nonterminal names, then terminal names, in that order — the split
  /// point is `terminal_names_offset`.
  pub strings: Vec<String>,
  pub terminal_names_offset: usize,
  pub rtns: Vec<Rtn>,
  pub glas: Vec<Gla>,
  pub intfa: IntFa,
  pub start_rule: u32,
  /// For each rule, the subparser terminals an `@allow` directive lets it
  /// (and any rule it calls, transitively) accept at every state without
  /// the grammar's own transitions saying so.
  pub allowed_subparsers: std::collections::BTreeMap<u32, Vec<u32>>,
}

impl LoadedGrammar {
  pub fn nonterm_name(&self, id: u32) -> &str {
    &self.strings[id as usize]
  }

  pub fn terminal_name(&self, id: u32) -> &str {
    &self.strings[self.terminal_names_offset + id as usize]
  }

  /// Whether `terminal` is a subparser this `rule` transparently accepts
  /// via some `@allow` directive, independent of its own transitions.
  pub fn is_allowed_subparser(&self, rule: u32, terminal: u32) -> bool {
    self.allowed_subparsers.get(&rule).is_some_and(|terms| terms.contains(&terminal))
  }
}
