//! Runtime parse frames (spec §3 "Runtime parse frame"): the three
//! mutually-recursive machines the interpreter drives, captured as a single
//! tagged stack element so `ParseState`'s stack can hold any mix of them.

#[derive(Clone, Debug)]
pub struct RtnFrame {
  pub rtn: u32,
  pub state: u32,
  /// Set when this frame has taken a nonterminal transition and pushed a
  /// callee frame above it: the state to resume at once that callee
  /// returns. `None` means this frame's current state is itself the
  /// resting point (either awaiting a terminal, or final-no-continuation).
  pub resume_state: Option<u32>,
  pub offset_at_entry: usize,
}

#[derive(Clone, Debug)]
pub struct GlaFrame {
  pub gla: u32,
  pub state: u32,
  pub offset_at_entry: usize,
}

#[derive(Clone, Debug)]
pub struct IntFaFrame {
  /// Always 0: coalescing here produces a single shared IntFA for the
  /// whole grammar rather than a per-state pool, so there is only one
  /// table to index.
  pub intfa: u32,
  pub state: u32,
  pub offset_at_entry: usize,
}

#[derive(Clone, Debug)]
pub enum ParseFrame {
  Rtn(RtnFrame),
  Gla(GlaFrame),
  IntFa(IntFaFrame),
}
