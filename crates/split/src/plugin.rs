//! The splitting plugin: chunk, plan, decorate and emit one document.

use crate::chunker::{Chunker, RuleChunker};
use crate::document::{relative_to, Contents, Document};
use crate::imports::{build_preamble, CacheBuster};
use crate::plan::{self, Fragment, SplitPlan, PRIMARY_FRAGMENT};
use crate::sourcemap::reattach;
use blessed_core::{AppError, AppResult, SplitOptions};

/// Custom sink for the summary line.
pub type Logger = Box<dyn Fn(&str) + Send + Sync>;

/// Splits stylesheets that exceed the selector limit.
///
/// One instance processes documents strictly one after another; `&mut self`
/// on every entry point keeps it that way.
///
/// # Example
/// ```
/// use blessed_split::{Bless, Document, ScriptedChunker, SplitOptions};
///
/// let mut bless = Bless::new(SplitOptions::default())
///     .with_chunker(ScriptedChunker::new(["a{}", "b{}"]))
///     .with_cache_buster_seed(1);
///
/// let input = Document::new("/site", "/site", "css/main.css", "a{}b{}");
/// let outputs = bless.run(input).unwrap();
///
/// assert_eq!(outputs.len(), 2);
/// assert!(outputs[1].path.ends_with("css/main-blessed1.css"));
/// ```
pub struct Bless {
    options: SplitOptions,
    chunker: Box<dyn Chunker>,
    cache_buster: CacheBuster,
    logger: Option<Logger>,
}

impl Bless {
    /// Plugin using the rule chunker at `options.max_selectors`.
    pub fn new(options: SplitOptions) -> Self {
        let chunker = RuleChunker::new(options.max_selectors);
        Self {
            options,
            chunker: Box::new(chunker),
            cache_buster: CacheBuster::from_entropy(),
            logger: None,
        }
    }

    /// Replace the chunking capability.
    pub fn with_chunker(mut self, chunker: impl Chunker + 'static) -> Self {
        self.chunker = Box::new(chunker);
        self
    }

    /// Replace the cache-busting token source.
    pub fn with_cache_buster(mut self, cache_buster: CacheBuster) -> Self {
        self.cache_buster = cache_buster;
        self
    }

    /// Draw cache-busting tokens from a fixed seed.
    pub fn with_cache_buster_seed(self, seed: u64) -> Self {
        self.with_cache_buster(CacheBuster::seeded(seed))
    }

    /// Route the summary line to `logger`, whatever `options.log` says.
    pub fn with_logger(mut self, logger: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }

    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    pub fn chunker(&self) -> &dyn Chunker {
        self.chunker.as_ref()
    }

    /// Compute the split plan for `document`.
    ///
    /// Returns `Ok(None)` when the document has nothing to split (null or
    /// empty contents) and must be passed through untouched.
    pub fn plan(&mut self, document: &Document) -> AppResult<Option<SplitPlan>> {
        if document.is_stream() {
            return Err(AppError::unsupported_input());
        }

        let Some(text) = document.text() else {
            tracing::debug!("Passing through empty document {:?}", document.path);
            return Ok(None);
        };

        let output_path = document.resolved_path();
        let want_maps = self.options.source_maps && document.source_map.is_some();

        let output = self.chunker.chunk(&text, &output_path, want_maps)?;
        if output.chunks.is_empty() {
            return Err(AppError::chunking(format!(
                "{} chunker returned no chunks for {}",
                self.chunker.name(),
                output_path.display()
            )));
        }

        let chunk_count = output.chunks.len();
        let paths = plan::plan(&output_path, chunk_count);

        let preamble = if chunk_count > 1 && self.options.imports {
            let token = self
                .options
                .cache_buster
                .then(|| self.cache_buster.next_token());
            Some(build_preamble(&output_path, chunk_count, token))
        } else {
            None
        };

        let base = document.resolved_base();
        let original_relative = document.relative();
        let original_map = document.source_map.as_ref().filter(|_| want_maps);

        let fragments = paths
            .into_iter()
            .zip(output.chunks)
            .map(|((index, path), chunk)| {
                let text = match preamble {
                    Some(ref preamble) if index == PRIMARY_FRAGMENT => {
                        format!("{}{}", preamble, chunk.text)
                    }
                    _ => chunk.text,
                };

                let source_map = original_map.map(|original| {
                    reattach(
                        &relative_to(&base, &path),
                        &original_relative,
                        chunk.mapping.as_ref(),
                        original,
                    )
                });

                Fragment::new(index, path, text, source_map)
            })
            .collect();

        tracing::debug!(
            "Planned {} fragment(s) for {:?} via {} chunker",
            chunk_count,
            output_path,
            self.chunker.name()
        );

        Ok(Some(SplitPlan::new(
            output_path,
            output.total_selector_count,
            fragments,
        )))
    }

    /// Process one document, pushing every output to `sink` in fragment order.
    ///
    /// Nothing reaches `sink` unless the whole plan was built.
    pub fn process<F>(&mut self, document: Document, mut sink: F) -> AppResult<()>
    where
        F: FnMut(Document),
    {
        match self.plan(&document)? {
            None => {
                sink(document);
                Ok(())
            }
            Some(split_plan) => {
                self.emit_plan(split_plan, &document, sink);
                Ok(())
            }
        }
    }

    /// Process one document and collect its outputs.
    pub fn run(&mut self, document: Document) -> AppResult<Vec<Document>> {
        let mut outputs = Vec::new();
        self.process(document, |output| outputs.push(output))?;
        Ok(outputs)
    }

    /// Log the summary line for `split_plan`, then emit its fragments.
    pub fn emit_plan<F>(&self, split_plan: SplitPlan, input: &Document, sink: F)
    where
        F: FnMut(Document),
    {
        self.log(&split_plan.summary());
        emit(split_plan, input, sink);
    }

    fn log(&self, line: &str) {
        if let Some(ref logger) = self.logger {
            logger(line);
        } else if self.options.log {
            tracing::info!("{}", line);
        }
    }
}

impl std::fmt::Debug for Bless {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bless")
            .field("options", &self.options)
            .field("chunker", &self.chunker)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// Push one document per fragment to `sink`, ascending by index.
///
/// Outputs share `cwd` and `base` with `input`.
pub fn emit<F>(split_plan: SplitPlan, input: &Document, mut sink: F)
where
    F: FnMut(Document),
{
    for fragment in split_plan.into_fragments() {
        let (path, text, source_map) = fragment.into_parts();
        sink(Document {
            cwd: input.cwd.clone(),
            base: input.base.clone(),
            path,
            contents: Contents::Buffer(text.into_bytes()),
            source_map,
        });
    }
}
