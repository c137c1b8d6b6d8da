//! Block and record identifiers shared between the emitter (`vellum_core`)
//! and the loader (`vellum_runtime`). Keeping these in the leaf crate
//! means both sides agree on layout without either depending on the other.

/// Two-byte magic identifying this as a Vellum grammar artifact, following
/// the "BC" + 2-byte application magic header.
pub const APP_MAGIC: [u8; 2] = *b"VL";

pub mod block_id {
  pub const BLOCKINFO: u32 = 0;
  pub const STRINGS: u32 = 1;
  pub const INTFAS: u32 = 2;
  pub const INTFA: u32 = 3;
  pub const GLAS: u32 = 4;
  pub const GLA: u32 = 5;
  pub const RTNS: u32 = 6;
  pub const RTN: u32 = 7;
  /// Flat table of `(subparser terminal, rule)` pairs naming every state's
  /// owning rule that should transparently accept the subparser terminal
  /// (the `@allow` closure, computed at compile time rather than
  /// materialized as self-loop transitions on every RTN/GLA state).
  pub const ALLOWS: u32 = 8;
}

/// Record codes within the `STRINGS` block.
pub mod strings_record {
  pub const STRING: u32 = 1;
}

/// Record codes within an `INTFA` sub-block.
pub mod intfa_record {
  pub const INTFA_STATE: u32 = 1;
  pub const INTFA_FINAL_STATE: u32 = 2;
  pub const INTFA_TRANSITION: u32 = 3;
  pub const INTFA_TRANSITION_RANGE: u32 = 4;
}

/// Record codes within a `GLA` sub-block.
pub mod gla_record {
  pub const GLA_STATE: u32 = 1;
  pub const GLA_FINAL_STATE: u32 = 2;
  pub const GLA_TRANSITION: u32 = 3;
}

/// Record codes within the `RTNS` block (the `RTN_INFO` record) and within
/// an `RTN` sub-block (state and transition records).
pub mod rtn_record {
  pub const RTN_INFO: u32 = 1;
  pub const RTN_STATE_WITH_INTFA: u32 = 2;
  pub const RTN_STATE_WITH_GLA: u32 = 3;
  pub const RTN_TRIVIAL_STATE: u32 = 4;
  pub const RTN_TRANSITION_TERMINAL: u32 = 5;
  pub const RTN_TRANSITION_NONTERM: u32 = 6;
}

/// Record codes within the `ALLOWS` block.
pub mod allow_record {
  pub const ALLOW_ENTRY: u32 = 1;
}
