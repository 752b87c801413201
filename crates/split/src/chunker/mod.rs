//! The chunking capability the splitter consumes.
//!
//! Deciding where a stylesheet must be cut is not the splitter's job: it
//! asks a [`Chunker`] and trusts the answer. Two implementations ship here:
//! - [`RuleChunker`]: greedy top-level rule packing, used by the CLI
//! - [`ScriptedChunker`]: replays canned chunk lists, for tests and embedding

mod rules;
mod scripted;

pub use rules::RuleChunker;
pub use scripted::{ChunkCall, ScriptedChunker};

use blessed_core::AppResult;
use std::path::Path;

/// Mapping data for one chunk: the `mappings` field of a v3 source map
/// describing the chunk text against the original source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMapping {
    pub mappings: String,
}

/// A contiguous piece of the original stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Raw CSS text of the chunk
    pub text: String,

    /// Mapping data, present when source maps were requested
    pub mapping: Option<ChunkMapping>,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mapping: None,
        }
    }

    pub fn with_mappings(mut self, mappings: impl Into<String>) -> Self {
        self.mapping = Some(ChunkMapping {
            mappings: mappings.into(),
        });
        self
    }
}

/// Result of chunking one stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutput {
    /// Chunks in source order
    pub chunks: Vec<Chunk>,

    /// Selectors found across the whole input (advisory)
    pub total_selector_count: usize,
}

/// Trait for selector-limit chunkers.
pub trait Chunker: Send + Sync + std::fmt::Debug {
    /// Short identifier used in diagnostics.
    fn name(&self) -> &str;

    /// Split `text` into chunks that each stay under the selector limit.
    ///
    /// `source` identifies the input in diagnostics and maps. Failures must
    /// be reported as `AppError::Chunking`.
    fn chunk(&self, text: &str, source: &Path, source_maps: bool) -> AppResult<ChunkOutput>;
}
