//! Reading stylesheets into documents and writing fragments back out.

use anyhow::{bail, Context, Result};
use blessed_split::plan::is_fragment_file;
use blessed_split::{Contents, Document, SourceMap};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A stylesheet to process and the directory its outputs are relative to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stylesheet {
    pub path: PathBuf,
    /// The walked input directory, or the file's own directory for
    /// explicit file arguments.
    pub base: PathBuf,
}

impl Stylesheet {
    fn beside(path: PathBuf) -> Self {
        let base = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { path, base }
    }
}

/// Expand `inputs` (relative to `workspace`) into the stylesheets to process.
///
/// Directories are walked for `*.css`, skipping fragments written by an
/// earlier run. Explicit file arguments are taken as given.
pub fn collect_stylesheets(workspace: &Path, inputs: &[PathBuf]) -> Result<Vec<Stylesheet>> {
    let mut files = Vec::new();

    for input in inputs {
        let input = workspace.join(input);
        if input.is_file() {
            files.push(Stylesheet::beside(input));
        } else if input.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(&input)
                .follow_links(false)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_stylesheet(p) && !is_fragment_file(p))
                .collect();
            found.sort();
            tracing::debug!("Found {} stylesheet(s) under {:?}", found.len(), input);
            files.extend(found.into_iter().map(|path| Stylesheet {
                path,
                base: input.clone(),
            }));
        } else {
            bail!("Input not found: {}", input.display());
        }
    }

    Ok(files)
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("css"))
        .unwrap_or(false)
}

/// Path of the external map conventionally stored next to `path`.
pub fn map_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".map");
    PathBuf::from(name)
}

/// Load `stylesheet` as a pipeline document rooted at `cwd`.
///
/// With `source_maps`, a sibling `<file>.map` is attached when present.
pub async fn load_document(
    cwd: &Path,
    stylesheet: &Stylesheet,
    source_maps: bool,
) -> Result<Document> {
    let path = stylesheet.path.as_path();
    let contents = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut document = Document::new(cwd, &stylesheet.base, path, contents);

    if source_maps {
        let map_file = map_path(path);
        if tokio::fs::try_exists(&map_file).await.unwrap_or(false) {
            let json = tokio::fs::read_to_string(&map_file)
                .await
                .with_context(|| format!("Failed to read {}", map_file.display()))?;
            let map = SourceMap::from_json(&json)
                .with_context(|| format!("Invalid source map {}", map_file.display()))?;
            document = document.with_source_map(map);
        } else {
            tracing::debug!("No source map at {:?}", map_file);
        }
    }

    Ok(document)
}

/// Move an output under `out_dir`, keeping its path relative to its base.
pub fn rebase(mut document: Document, out_dir: &Path) -> Document {
    let relative = document.relative();
    document.path = out_dir.join(relative);
    document.base = out_dir.to_path_buf();
    document
}

/// Write every buffered output, plus `<file>.map` for outputs carrying a map.
///
/// Returns the stylesheet paths written, in order.
pub async fn write_outputs(outputs: &[Document]) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(outputs.len());

    for output in outputs {
        let Contents::Buffer(ref bytes) = output.contents else {
            continue;
        };
        let path = output.resolved_path();

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let mut body = bytes.clone();
        if let Some(ref map) = output.source_map {
            let map_file = map_path(&path);
            let json = map.to_json()?;
            tokio::fs::write(&map_file, json)
                .await
                .with_context(|| format!("Failed to write {}", map_file.display()))?;

            let map_name = map_file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            body.extend_from_slice(format!("\n/*# sourceMappingURL={} */\n", map_name).as_bytes());
        }

        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::debug!("Wrote {:?}", path);
        written.push(path);
    }

    Ok(written)
}
