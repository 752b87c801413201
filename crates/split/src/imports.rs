//! `@import` preamble for the primary fragment.

use crate::plan::fragment_name;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;

/// Largest cache-busting token (inclusive).
pub const MAX_TOKEN: u32 = 999;

/// Source of cache-busting tokens.
///
/// Seedable so that tests can predict the exact preamble.
pub struct CacheBuster {
    rng: Box<dyn RngCore + Send>,
}

impl CacheBuster {
    /// Tokens from an entropy-seeded generator.
    pub fn from_entropy() -> Self {
        Self::from_rng(ChaCha8Rng::from_entropy())
    }

    /// Tokens from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self { rng: Box::new(rng) }
    }

    /// Draw a token uniformly from `0..=MAX_TOKEN`.
    pub fn next_token(&mut self) -> u32 {
        self.rng.gen_range(0..=MAX_TOKEN)
    }
}

impl std::fmt::Debug for CacheBuster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheBuster").finish_non_exhaustive()
    }
}

/// Build the import lines for fragments `1..chunk_count`.
///
/// Each line is `@import url('<name>[?z=<token>]');` followed by a blank
/// line. The same token is used on every line.
pub fn build_preamble(output_base: &Path, chunk_count: usize, token: Option<u32>) -> String {
    let query = token.map(|t| format!("?z={}", t)).unwrap_or_default();

    (1..chunk_count)
        .map(|index| format!("@import url('{}{}');\n\n", fragment_name(output_base, index), query))
        .collect()
}
