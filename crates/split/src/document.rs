//! Pipeline documents: the unit flowing in and out of the splitter.

use crate::sourcemap::SourceMap;
use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

/// Payload carried by a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    /// No payload at all (directories, placeholders)
    Null,
    /// Fully buffered bytes
    Buffer(Vec<u8>),
    /// A streaming payload; the splitter refuses these
    Stream,
}

/// A file travelling through the build pipeline.
///
/// Used both for the input stylesheet and for every emitted fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Working directory relative paths resolve against
    pub cwd: PathBuf,

    /// Base directory `relative()` is computed from
    pub base: PathBuf,

    /// File path (absolute, or relative to `cwd`)
    pub path: PathBuf,

    /// File payload
    pub contents: Contents,

    /// Source map attached by an earlier pipeline stage
    pub source_map: Option<SourceMap>,
}

impl Document {
    /// Create a buffered document.
    pub fn new(
        cwd: impl Into<PathBuf>,
        base: impl Into<PathBuf>,
        path: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            cwd: cwd.into(),
            base: base.into(),
            path: path.into(),
            contents: Contents::Buffer(contents.into()),
            source_map: None,
        }
    }

    /// Attach a source map.
    pub fn with_source_map(mut self, source_map: SourceMap) -> Self {
        self.source_map = Some(source_map);
        self
    }

    /// Replace the payload.
    pub fn with_contents(mut self, contents: Contents) -> Self {
        self.contents = contents;
        self
    }

    pub fn is_null(&self) -> bool {
        matches!(self.contents, Contents::Null)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.contents, Contents::Stream)
    }

    /// Buffered payload decoded as UTF-8 (invalid sequences replaced).
    ///
    /// Returns `None` for null, streaming, or zero-length payloads.
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match &self.contents {
            Contents::Buffer(bytes) if !bytes.is_empty() => Some(String::from_utf8_lossy(bytes)),
            _ => None,
        }
    }

    /// Absolute, lexically normalized path of this document.
    pub fn resolved_path(&self) -> PathBuf {
        resolve(&self.cwd, &self.path)
    }

    /// Absolute, lexically normalized base directory.
    pub fn resolved_base(&self) -> PathBuf {
        resolve(&self.cwd, &self.base)
    }

    /// Path relative to `base`, with forward slashes.
    pub fn relative(&self) -> String {
        relative_to(&self.resolved_base(), &self.resolved_path())
    }
}

/// Resolve `path` against `cwd` and drop `.`/`..` components.
pub fn resolve(cwd: &Path, path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    normalize(&joined)
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// `path` relative to `base` as a slash-separated string.
///
/// Falls back to the full path when `base` is not an ancestor.
pub fn relative_to(base: &Path, path: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) => rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().replace('\\', "/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_path() {
        let resolved = resolve(Path::new("/work"), Path::new("./css/../dist/site.css"));
        assert_eq!(resolved, PathBuf::from("/work/dist/site.css"));
    }

    #[test]
    fn test_resolve_absolute_path_ignores_cwd() {
        let resolved = resolve(Path::new("/work"), Path::new("/srv/site.css"));
        assert_eq!(resolved, PathBuf::from("/srv/site.css"));
    }

    #[test]
    fn test_relative_to_base() {
        let doc = Document::new("/work", "/work/src", "/work/src/styles/site.css", "a{}");
        assert_eq!(doc.relative(), "styles/site.css");
    }

    #[test]
    fn test_relative_outside_base_falls_back() {
        let doc = Document::new("/work", "/elsewhere", "/work/site.css", "a{}");
        assert_eq!(doc.relative(), "/work/site.css");
    }

    #[test]
    fn test_text_only_for_non_empty_buffers() {
        let doc = Document::new("/w", "/w", "a.css", "a{}");
        assert_eq!(doc.text().as_deref(), Some("a{}"));

        let empty = Document::new("/w", "/w", "a.css", "");
        assert!(empty.text().is_none());

        let stream = empty.clone().with_contents(Contents::Stream);
        assert!(stream.is_stream());
        assert!(stream.text().is_none());

        let null = empty.with_contents(Contents::Null);
        assert!(null.is_null());
        assert!(null.text().is_none());
    }
}
