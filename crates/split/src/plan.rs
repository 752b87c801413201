//! Fragment naming and the split plan.
//!
//! The primary fragment (index 0) always keeps the original output path:
//! pages and other stylesheets keep linking to the unsplit file name, and
//! that file pulls in the rest through `@import`. Only fragments 1..N are
//! renamed, to `<stem>-blessed<i><ext>` in the same directory.

use crate::sourcemap::SourceMap;
use std::path::{Path, PathBuf};

/// Index of the fragment that stays at the original output path.
pub const PRIMARY_FRAGMENT: usize = 0;

/// Marker inserted between the stem and the fragment index.
pub const FRAGMENT_MARKER: &str = "-blessed";

/// File name of fragment `index` for the output `output_base`.
///
/// The primary fragment keeps the original file name.
pub fn fragment_name(output_base: &Path, index: usize) -> String {
    let file_name = output_base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if index == PRIMARY_FRAGMENT {
        return file_name;
    }

    let stem = output_base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    match output_base.extension() {
        Some(ext) => format!("{}{}{}.{}", stem, FRAGMENT_MARKER, index, ext.to_string_lossy()),
        None => format!("{}{}{}", stem, FRAGMENT_MARKER, index),
    }
}

/// Full output path of fragment `index`.
pub fn fragment_path(output_base: &Path, index: usize) -> PathBuf {
    if index == PRIMARY_FRAGMENT {
        return output_base.to_path_buf();
    }
    output_base.with_file_name(fragment_name(output_base, index))
}

/// Whether `path` already names a secondary fragment (`*-blessed<i>.*`).
pub fn is_fragment_file(path: &Path) -> bool {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    match stem.rsplit_once(FRAGMENT_MARKER) {
        Some((name, index)) => {
            !name.is_empty() && !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// Output paths for `chunk_count` fragments, in index order.
///
/// A single chunk maps to `output_base` untouched. The result is fully
/// determined by the arguments.
pub fn plan(output_base: &Path, chunk_count: usize) -> Vec<(usize, PathBuf)> {
    (0..chunk_count.max(1))
        .map(|index| (index, fragment_path(output_base, index)))
        .collect()
}

/// One output stylesheet of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    index: usize,
    output_path: PathBuf,
    text: String,
    source_map: Option<SourceMap>,
}

impl Fragment {
    pub(crate) fn new(
        index: usize,
        output_path: PathBuf,
        text: String,
        source_map: Option<SourceMap>,
    ) -> Self {
        Self {
            index,
            output_path,
            text,
            source_map,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_map(&self) -> Option<&SourceMap> {
        self.source_map.as_ref()
    }

    pub(crate) fn into_parts(self) -> (PathBuf, String, Option<SourceMap>) {
        (self.output_path, self.text, self.source_map)
    }
}

/// All fragments derived from one input, ascending by index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    output_path: PathBuf,
    total_selector_count: usize,
    fragments: Vec<Fragment>,
}

impl SplitPlan {
    pub(crate) fn new(
        output_path: PathBuf,
        total_selector_count: usize,
        fragments: Vec<Fragment>,
    ) -> Self {
        debug_assert!(!fragments.is_empty());
        debug_assert!(fragments.iter().enumerate().all(|(i, f)| f.index == i));
        Self {
            output_path,
            total_selector_count,
            fragments,
        }
    }

    /// Resolved path of the unsplit output.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Selector count reported by the chunker.
    pub fn total_selector_count(&self) -> usize {
        self.total_selector_count
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn is_split(&self) -> bool {
        self.fragments.len() > 1
    }

    /// The human-readable line logged before emission.
    pub fn summary(&self) -> String {
        if self.is_split() {
            format!(
                "Found {} selectors in {}, splitting into {} blessedFiles.",
                self.total_selector_count,
                self.output_path.display(),
                self.fragments.len()
            )
        } else {
            format!(
                "Found {} selector in {}, not splitting.",
                self.total_selector_count,
                self.output_path.display()
            )
        }
    }

    pub(crate) fn into_fragments(self) -> Vec<Fragment> {
        self.fragments
    }
}
