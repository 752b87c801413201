//! Stylesheet splitting for legacy selector limits.
//!
//! A stylesheet with too many selectors is cut into fragments by a
//! [`Chunker`]. The first fragment keeps the original path and `@import`s
//! the others (`<name>-blessed<i>.css`), each fragment gets its own source
//! map, and the fragments are emitted in index order.

pub mod chunker;
pub mod document;
pub mod imports;
pub mod plan;
pub mod plugin;
pub mod sourcemap;


// Re-export commonly used types
pub use blessed_core::SplitOptions;
pub use chunker::{Chunk, ChunkMapping, ChunkOutput, Chunker, RuleChunker, ScriptedChunker};
pub use document::{Contents, Document};
pub use imports::CacheBuster;
pub use plan::{Fragment, SplitPlan, FRAGMENT_MARKER, PRIMARY_FRAGMENT};
pub use plugin::{emit, Bless, Logger};
pub use sourcemap::SourceMap;
