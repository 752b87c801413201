//! Version-3 source maps and per-fragment reattachment.

use crate::chunker::ChunkMapping;
use blessed_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// A version-3 source map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_root: Option<String>,

    #[serde(default)]
    pub sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<Option<String>>>,

    #[serde(default)]
    pub names: Vec<String>,

    #[serde(default)]
    pub mappings: String,
}

impl SourceMap {
    /// An empty map for `file`, as attached by upstream stages that have not
    /// transformed the file yet.
    pub fn identity(file: impl Into<String>) -> Self {
        let file = file.into();
        Self {
            version: 3,
            file: Some(file.clone()),
            source_root: None,
            sources: vec![file],
            sources_content: None,
            names: Vec::new(),
            mappings: String::new(),
        }
    }

    pub fn from_json(json: &str) -> AppResult<Self> {
        let map: SourceMap = serde_json::from_str(json)?;
        if map.version != 3 {
            return Err(AppError::Serialization(format!(
                "Unsupported source map version {}",
                map.version
            )));
        }
        Ok(map)
    }

    pub fn to_json(&self) -> AppResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Trace this map through `upstream`, the map of the file this map's
    /// single source was generated from.
    ///
    /// The result points at upstream's sources. Segments whose original
    /// position upstream does not cover keep only their generated column.
    /// An `upstream` without mappings leaves this map as it is.
    pub fn apply_upstream(&self, upstream: &SourceMap) -> AppResult<SourceMap> {
        if upstream.mappings.is_empty() {
            return Ok(self.clone());
        }

        let upstream_lines = decode_mappings(&upstream.mappings)?;
        let lines: Vec<Vec<Segment>> = decode_mappings(&self.mappings)?
            .into_iter()
            .map(|segments| {
                segments
                    .into_iter()
                    .map(|segment| Segment {
                        generated_column: segment.generated_column,
                        original: segment.original.and_then(|original| {
                            original_position_for(&upstream_lines, original.line, original.column)
                        }),
                    })
                    .collect()
            })
            .collect();

        Ok(SourceMap {
            version: 3,
            file: self.file.clone(),
            source_root: upstream.source_root.clone(),
            sources: upstream.sources.clone(),
            sources_content: upstream.sources_content.clone(),
            names: upstream.names.clone(),
            mappings: encode_mappings(&lines),
        })
    }
}

/// One decoded mapping segment. Columns and lines are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub generated_column: i64,
    pub original: Option<OriginalPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: i64,
    pub line: i64,
    pub column: i64,
    pub name: Option<i64>,
}

/// Decode a `mappings` string into absolute segments, one list per
/// generated line.
pub fn decode_mappings(mappings: &str) -> AppResult<Vec<Vec<Segment>>> {
    let (mut source, mut line, mut column, mut name) = (0i64, 0i64, 0i64, 0i64);
    let mut lines = Vec::new();

    for encoded_line in mappings.split(';') {
        let mut generated_column = 0i64;
        let mut segments = Vec::new();

        for encoded in encoded_line.split(',').filter(|s| !s.is_empty()) {
            let fields = decode_segment(encoded)?;
            if !matches!(fields.len(), 1 | 4 | 5) {
                return Err(AppError::Serialization(format!(
                    "Invalid mapping segment {:?} with {} fields",
                    encoded,
                    fields.len()
                )));
            }

            generated_column += fields[0];
            let original = if fields.len() >= 4 {
                source += fields[1];
                line += fields[2];
                column += fields[3];
                let segment_name = fields.get(4).map(|delta| {
                    name += delta;
                    name
                });
                Some(OriginalPosition {
                    source,
                    line,
                    column,
                    name: segment_name,
                })
            } else {
                None
            };

            segments.push(Segment {
                generated_column,
                original,
            });
        }

        lines.push(segments);
    }

    Ok(lines)
}

/// Encode absolute segments back into a `mappings` string.
pub fn encode_mappings(lines: &[Vec<Segment>]) -> String {
    let (mut source, mut line, mut column, mut name) = (0i64, 0i64, 0i64, 0i64);
    let mut out = String::new();

    for (index, segments) in lines.iter().enumerate() {
        if index > 0 {
            out.push(';');
        }

        let mut generated_column = 0i64;
        for (k, segment) in segments.iter().enumerate() {
            if k > 0 {
                out.push(',');
            }
            encode_vlq(segment.generated_column - generated_column, &mut out);
            generated_column = segment.generated_column;

            if let Some(original) = segment.original {
                encode_vlq(original.source - source, &mut out);
                encode_vlq(original.line - line, &mut out);
                encode_vlq(original.column - column, &mut out);
                source = original.source;
                line = original.line;
                column = original.column;
                if let Some(segment_name) = original.name {
                    encode_vlq(segment_name - name, &mut out);
                    name = segment_name;
                }
            }
        }
    }

    out
}

/// The mapped position covering `column` on generated `line`, if any.
fn original_position_for(
    lines: &[Vec<Segment>],
    line: i64,
    column: i64,
) -> Option<OriginalPosition> {
    let segments = lines.get(usize::try_from(line).ok()?)?;
    segments
        .iter()
        .take_while(|segment| segment.generated_column <= column)
        .last()?
        .original
}

fn decode_segment(encoded: &str) -> AppResult<Vec<i64>> {
    let mut fields = Vec::with_capacity(5);
    let mut value = 0i64;
    let mut shift = 0u32;

    for byte in encoded.bytes() {
        let digit = BASE64
            .iter()
            .position(|&b| b == byte)
            .ok_or_else(|| {
                AppError::Serialization(format!(
                    "Invalid base64 digit {:?} in mappings",
                    byte as char
                ))
            })? as i64;

        if shift > 55 {
            return Err(AppError::Serialization(format!(
                "VLQ value too large in segment {:?}",
                encoded
            )));
        }
        value |= (digit & 0b11111) << shift;

        if digit & 0b100000 != 0 {
            shift += 5;
        } else {
            let magnitude = value >> 1;
            fields.push(if value & 1 == 1 { -magnitude } else { magnitude });
            value = 0;
            shift = 0;
        }
    }

    if shift != 0 {
        return Err(AppError::Serialization(format!(
            "Truncated VLQ value in segment {:?}",
            encoded
        )));
    }

    Ok(fields)
}

/// Build the source map of one fragment.
///
/// `file` is the fragment's own relative path and `sources` holds only the
/// original input's relative path. Mappings come verbatim from the chunker;
/// `sourceRoot` and a single embedded source content carry over from the
/// input's map.
pub fn reattach(
    fragment_relative: &str,
    original_relative: &str,
    mapping: Option<&ChunkMapping>,
    original: &SourceMap,
) -> SourceMap {
    let sources_content = match original.sources_content.as_deref() {
        Some([content]) => Some(vec![content.clone()]),
        _ => None,
    };

    SourceMap {
        version: 3,
        file: Some(fragment_relative.to_string()),
        source_root: original.source_root.clone(),
        sources: vec![original_relative.to_string()],
        sources_content,
        names: Vec::new(),
        mappings: mapping.map(|m| m.mappings.clone()).unwrap_or_default(),
    }
}

/// Append the base64 VLQ encoding of `value` to `out`.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}
