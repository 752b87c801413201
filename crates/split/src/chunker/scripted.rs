//! Chunker that replays a fixed answer.

use super::{Chunk, ChunkOutput, Chunker};
use blessed_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded `chunk` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkCall {
    pub text: String,
    pub source: PathBuf,
    pub source_maps: bool,
}

/// Scripted chunker for testing and for hosts that chunk elsewhere.
///
/// Returns the same chunk list for every input (or fails with a fixed
/// diagnostic) and records each call.
#[derive(Debug)]
pub struct ScriptedChunker {
    chunks: Vec<Chunk>,
    total_selector_count: usize,
    failure: Option<String>,
    calls: Mutex<Vec<ChunkCall>>,
}

impl ScriptedChunker {
    /// Replay `texts` as chunks without mapping data.
    pub fn new<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_chunks(texts.into_iter().map(Chunk::new).collect())
    }

    /// Replay prepared chunks.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self {
            chunks,
            total_selector_count: 0,
            failure: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        let mut chunker = Self::from_chunks(Vec::new());
        chunker.failure = Some(message.into());
        chunker
    }

    /// Report `count` as the total selector count.
    pub fn with_selector_count(mut self, count: usize) -> Self {
        self.total_selector_count = count;
        self
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<ChunkCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl Chunker for ScriptedChunker {
    fn name(&self) -> &str {
        "scripted"
    }

    fn chunk(&self, text: &str, source: &Path, source_maps: bool) -> AppResult<ChunkOutput> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ChunkCall {
                text: text.to_string(),
                source: source.to_path_buf(),
                source_maps,
            });
        }

        if let Some(ref message) = self.failure {
            return Err(AppError::chunking(message.clone()));
        }

        let chunks = self
            .chunks
            .iter()
            .map(|chunk| Chunk {
                text: chunk.text.clone(),
                mapping: if source_maps { chunk.mapping.clone() } else { None },
            })
            .collect();

        Ok(ChunkOutput {
            chunks,
            total_selector_count: self.total_selector_count,
        })
    }
}
