//! Compiles a grammar source text into byte-serialized IntFA/RTN/GLA
//! automata. The pipeline, leaves first: `IntSet` → the `fa` kernel →
//! Thompson construction → the grammar parser → `nfa_to_dfa` →
//! `minimize` → `priority` propagation → GLA construction → IntFA
//! coalescing → linearization into `vellum_bitcode`.

pub mod error;
pub mod fa;
pub mod grammar;
pub mod ids;
pub mod intset;
pub mod journal;
pub mod minimize;
pub mod nfa_to_dfa;
pub mod priority;
pub mod token;

pub use error::VellumError;
pub use journal::{GrammarConfig, Journal};

/// Compiles grammar source text into a byte-serialized artifact loadable by
/// `vellum_runtime::load_grammar`. Runs the full compile pipeline and
/// returns either the emitted bytes or every error collected along the way.
pub fn compile(source: &str, source_name: &str, config: GrammarConfig) -> Result<Vec<u8>, Vec<VellumError>> {
  let mut journal = Journal::new(config);
  let result = grammar::compile_source(&mut journal, source, source_name);
  match result {
    Ok(bytes) => Ok(bytes),
    Err(()) => Err(journal.all_errors()),
  }
}
