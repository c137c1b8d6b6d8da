//! The self-describing, block-structured binary container used to store a
//! compiled grammar artifact. Shared by the compiler's emitter
//! (`vellum_core::linearize`) and the runtime's loader
//! (`vellum_runtime::load`), so that both sides agree on layout without a
//! path dependency between them.
//!
//! The container is a simplification of a bit-granular bitstream down to a
//! byte-granular one: entries are `enter-subblock` / `end-block` /
//! `record` / `blob`, VBR-encoded integers use LEB128-style continuation
//! bits per byte rather than per 32-bit chunk, and `BLOCKINFO`-driven
//! abbreviations are not implemented (every record is "unabbreviated").
//! This preserves the properties the rest of the system depends on —
//! self-describing records, length-prefixed blocks that can be skipped
//! without being parsed, 32-bit alignment at block boundaries — while
//! staying within the engineering budget of this crate. See `DESIGN.md` at
//! the workspace root for the full rationale.

pub mod blocks;
pub mod error;
pub mod reader;
pub mod varint;
pub mod writer;

pub use blocks::APP_MAGIC;
pub use error::BitcodeError;
pub use reader::{BitcodeReader, Entry};
pub use writer::{BitcodeWriter, BlockHandle};
