//! Loads a compiled Vellum grammar artifact and drives a streaming
//! interpreter over it (spec §6.4's runtime API). Has no dependency on the
//! compiler crate: only `vellum_bitcode`'s container format is shared
//! between them, so a deployed parser's dependency footprint stops here.

pub mod callbacks;
pub mod error;
pub mod frame;
pub mod interpreter;
pub mod load;
pub mod types;

pub use callbacks::{bind_grammar, BoundGrammar, ControlFlow, ParseCallbacks};
pub use error::{LoadError, ParseError};
pub use interpreter::{alloc_parse_state, dup_parse_state, finish_parse, parse, FinishStatus, ParseState, ParseStatus};
pub use load::load_grammar;
pub use types::{Gla, GlaEdge, GlaPrediction, IntFa, LoadedGrammar, Rtn, RtnEdge, RtnStateKind};
