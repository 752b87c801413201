//! Greedy chunker packing top-level rules up to a selector ceiling.

use super::{Chunk, ChunkOutput, Chunker};
use crate::sourcemap::encode_vlq;
use blessed_core::{config::DEFAULT_MAX_SELECTORS, AppError, AppResult};
use std::path::Path;

/// At-rules whose nested style rules count toward the limit.
const GROUP_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "document",
    "-moz-document",
    "layer",
    "container",
    "scope",
];

/// Chunker that cuts only between top-level blocks.
///
/// Selectors of a style rule are its comma-separated prelude entries;
/// grouping at-rules (`@media`, `@supports`, ...) count their nested rules,
/// other at-rules count nothing. A block whose own count exceeds the limit
/// is kept whole in a chunk of its own.
#[derive(Debug, Clone)]
pub struct RuleChunker {
    max_selectors: usize,
}

impl RuleChunker {
    pub fn new(max_selectors: usize) -> Self {
        Self {
            max_selectors: max_selectors.max(1),
        }
    }

    pub fn max_selectors(&self) -> usize {
        self.max_selectors
    }
}

impl Default for RuleChunker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SELECTORS)
    }
}

impl Chunker for RuleChunker {
    fn name(&self) -> &str {
        "rules"
    }

    fn chunk(&self, text: &str, source: &Path, source_maps: bool) -> AppResult<ChunkOutput> {
        let diagnostic = |e: String| AppError::chunking(format!("{}: {}", source.display(), e));

        let blocks = scan_blocks(text).map_err(diagnostic)?;

        let mut ranges = Vec::new();
        let mut chunk_start = 0;
        let mut chunk_selectors = 0;
        let mut total = 0;

        for block in &blocks {
            let count = count_block(text, block).map_err(diagnostic)?;
            if chunk_selectors > 0 && chunk_selectors + count > self.max_selectors {
                ranges.push((chunk_start, block.start));
                chunk_start = block.start;
                chunk_selectors = 0;
            }
            chunk_selectors += count;
            total += count;
        }
        ranges.push((chunk_start, text.len()));

        tracing::debug!(
            "Rule chunker found {} selectors in {} blocks, {} chunks (limit {})",
            total,
            blocks.len(),
            ranges.len(),
            self.max_selectors
        );

        let chunks = ranges
            .into_iter()
            .map(|(start, end)| {
                let chunk = Chunk::new(&text[start..end]);
                if source_maps {
                    chunk.with_mappings(line_mappings(text, start, end))
                } else {
                    chunk
                }
            })
            .collect();

        Ok(ChunkOutput {
            chunks,
            total_selector_count: total,
        })
    }
}

/// A top-level block: a rule with a `{}` body or a `;`-terminated statement.
///
/// `start` includes any whitespace and comments preceding the block.
#[derive(Debug, Clone, Copy)]
struct Block {
    start: usize,
    prelude_end: usize,
    body: Option<(usize, usize)>,
}

/// Split `text` into its top-level blocks.
///
/// Only ASCII delimiters are inspected, so byte offsets always fall on
/// char boundaries.
fn scan_blocks(text: &str) -> Result<Vec<Block>, String> {
    let bytes = text.as_bytes();
    let mut blocks = Vec::new();
    let mut depth = 0usize;
    let mut block_start = 0;
    let mut open_at = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'/' if bytes.get(i + 1) == Some(&b'*') => match text[i + 2..].find("*/") {
                Some(end) => {
                    i += end + 4;
                    continue;
                }
                None => return Err(format!("Unclosed comment at {}", position(text, i))),
            },
            quote @ (b'"' | b'\'') => {
                i = skip_string(text, i, quote)?;
                continue;
            }
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => {
                if depth == 0 {
                    open_at = i;
                }
                depth += 1;
            }
            b'}' => {
                if depth == 0 {
                    return Err(format!("Unexpected '}}' at {}", position(text, i)));
                }
                depth -= 1;
                if depth == 0 {
                    blocks.push(Block {
                        start: block_start,
                        prelude_end: open_at,
                        body: Some((open_at + 1, i)),
                    });
                    block_start = i + 1;
                }
            }
            b';' if depth == 0 => {
                blocks.push(Block {
                    start: block_start,
                    prelude_end: i,
                    body: None,
                });
                block_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    if depth > 0 {
        return Err(format!("Unclosed block at {}", position(text, open_at)));
    }

    Ok(blocks)
}

/// Index just past the string literal opening at `start`.
fn skip_string(text: &str, start: usize, quote: u8) -> Result<usize, String> {
    let bytes = text.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return Ok(i + 1),
            _ => i += 1,
        }
    }
    Err(format!("Unclosed string at {}", position(text, start)))
}

fn count_block(text: &str, block: &Block) -> Result<usize, String> {
    let Some((body_start, body_end)) = block.body else {
        return Ok(0);
    };

    let prelude = strip_comments(&text[block.start..block.prelude_end]);
    let prelude = prelude.trim();

    if let Some(at_rule) = prelude.strip_prefix('@') {
        let name = at_rule
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        if !GROUP_AT_RULES.contains(&name.as_str()) {
            return Ok(0);
        }

        let body = &text[body_start..body_end];
        return scan_blocks(body)?
            .iter()
            .map(|inner| count_block(body, inner))
            .sum();
    }

    if prelude.is_empty() {
        return Ok(0);
    }

    Ok(count_top_level_commas(prelude) + 1)
}

/// Commas outside parentheses, brackets and strings.
fn count_top_level_commas(selector: &str) -> usize {
    let mut commas = 0;
    let mut nesting = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in selector.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(' | '[') => nesting += 1,
            (None, ')' | ']') => nesting = nesting.saturating_sub(1),
            (None, ',') if nesting == 0 => commas += 1,
            _ => {}
        }
    }

    commas
}

fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find("/*") {
        out.push_str(&rest[..open]);
        rest = match rest[open + 2..].find("*/") {
            Some(close) => &rest[open + close + 4..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// Zero-based line and UTF-16 column of a byte offset.
fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let before = &text[..offset];
    let line = before.matches('\n').count();
    let line_start = before.rfind('\n').map(|p| p + 1).unwrap_or(0);
    let column = before[line_start..].chars().map(char::len_utf16).sum();
    (line, column)
}

/// One-based `line:column` for diagnostics.
fn position(text: &str, offset: usize) -> String {
    let (line, column) = line_col(text, offset);
    format!("{}:{}", line + 1, column + 1)
}

/// Mappings for `text[start..end]`: one segment per non-empty generated
/// line, pointing at the original position that line starts from.
fn line_mappings(text: &str, start: usize, end: usize) -> String {
    let (first_line, first_column) = line_col(text, start);
    let mut out = String::new();
    let mut prev_line = 0i64;
    let mut prev_column = 0i64;

    for (k, line) in text[start..end].split('\n').enumerate() {
        if k > 0 {
            out.push(';');
        }
        if line.is_empty() {
            continue;
        }

        let (source_line, source_column) = if k == 0 {
            (first_line, first_column)
        } else {
            (first_line + k, 0)
        };
        let (source_line, source_column) = (source_line as i64, source_column as i64);

        encode_vlq(0, &mut out);
        encode_vlq(0, &mut out);
        encode_vlq(source_line - prev_line, &mut out);
        encode_vlq(source_column - prev_column, &mut out);

        prev_line = source_line;
        prev_column = source_column;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(max: usize, text: &str) -> ChunkOutput {
        RuleChunker::new(max)
            .chunk(text, Path::new("/css/site.css"), false)
            .unwrap()
    }

    fn texts(output: &ChunkOutput) -> Vec<&str> {
        output.chunks.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_under_limit_single_chunk() {
        let output = chunk(10, "a{color:red}\nb, c{margin:0}\n");
        assert_eq!(output.chunks.len(), 1);
        assert_eq!(output.total_selector_count, 3);
        assert_eq!(output.chunks[0].text, "a{color:red}\nb, c{margin:0}\n");
    }

    #[test]
    fn test_splits_between_blocks() {
        let text = "a{}\nb{}\nc{}\n";
        let output = chunk(2, text);

        assert_eq!(texts(&output), vec!["a{}\nb{}", "\nc{}\n"]);
        assert_eq!(output.total_selector_count, 3);
        assert_eq!(texts(&output).concat(), text);
    }

    #[test]
    fn test_oversized_block_kept_whole() {
        let output = chunk(2, "a,b,c{}d{}");
        assert_eq!(texts(&output), vec!["a,b,c{}", "d{}"]);
    }

    #[test]
    fn test_group_at_rules_count_nested_rules() {
        let output = chunk(100, "@media screen and (min-width: 10px){a,b{}c{}}");
        assert_eq!(output.total_selector_count, 3);

        let output = chunk(100, "@supports (display:grid){@media print{a{}}}");
        assert_eq!(output.total_selector_count, 1);
    }

    #[test]
    fn test_other_at_rules_count_nothing() {
        let text = "@charset \"utf-8\";\n@import url(base.css);\n@font-face{font-family:x}\n@keyframes spin{from{top:0}to{top:1px}}";
        let output = chunk(1, text);
        assert_eq!(output.total_selector_count, 0);
        assert_eq!(output.chunks.len(), 1);
    }

    #[test]
    fn test_commas_inside_functions_and_strings() {
        let output = chunk(100, "a:is(b, c), d[title=\"x,y\"]{}");
        assert_eq!(output.total_selector_count, 2);
    }

    #[test]
    fn test_braces_in_strings_and_comments() {
        let output = chunk(100, "/* } { */a{content:\"}\"}b{content:'{'}");
        assert_eq!(output.total_selector_count, 2);
        assert_eq!(output.chunks.len(), 1);
    }

    #[test]
    fn test_unbalanced_input_is_chunking_error() {
        let err = RuleChunker::new(10)
            .chunk("a{}\n}", Path::new("/css/site.css"), false)
            .unwrap_err();
        assert!(matches!(err, AppError::Chunking { .. }));
        assert!(err.to_string().contains("Unexpected '}' at 2:1"));

        let err = RuleChunker::new(10)
            .chunk("a{color:red", Path::new("/css/site.css"), false)
            .unwrap_err();
        assert!(err.to_string().contains("Unclosed block at 1:2"));

        let err = RuleChunker::new(10)
            .chunk("a{content:\"x}", Path::new("/css/site.css"), false)
            .unwrap_err();
        assert!(err.to_string().contains("Unclosed string"));

        let err = RuleChunker::new(10)
            .chunk("a{} /* trailing", Path::new("/css/site.css"), false)
            .unwrap_err();
        assert!(err.to_string().contains("Unclosed comment"));
    }

    #[test]
    fn test_line_mappings_per_chunk() {
        let output = RuleChunker::new(2)
            .chunk("a{}\nb{}\nc{}\n", Path::new("/css/site.css"), true)
            .unwrap();

        let maps: Vec<&str> = output
            .chunks
            .iter()
            .map(|c| c.mapping.as_ref().unwrap().mappings.as_str())
            .collect();
        // chunk 1 opens with the newline that ends line 1
        assert_eq!(maps, vec!["AAAA;AACA", ";AAEA;"]);
    }

    #[test]
    fn test_no_mappings_unless_requested() {
        let output = chunk(10, "a{}");
        assert!(output.chunks[0].mapping.is_none());
    }

    #[test]
    fn test_max_selectors_floor() {
        assert_eq!(RuleChunker::new(0).max_selectors(), 1);
        assert_eq!(RuleChunker::default().max_selectors(), DEFAULT_MAX_SELECTORS);
    }
}
