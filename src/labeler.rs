//! Labeling raw per-device captures and merging the labeled files.
//!
//! Rows are not validated here: each line is copied through with the
//! category token appended. Validation happens when the aggregator loads the
//! merged file.

use crate::config::LabelSource;
use crate::dataset::Category;
use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of labeling one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelStats {
    pub category: Category,
    pub output: PathBuf,
    pub rows: usize,
}

/// Split `input` into lines without decoding it.
///
/// Lines end at `\n`; one trailing `\r` is dropped. A final line without a
/// terminator is kept, and empty input has no lines.
pub(crate) fn split_lines(input: &[u8]) -> Vec<&[u8]> {
    if input.is_empty() {
        return Vec::new();
    }
    let body = input.strip_suffix(b"\n").unwrap_or(input);
    body.split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .collect()
}

/// Append `,<category>` to every line of `input`.
///
/// Only the line terminator is removed before appending, so the line bytes
/// are preserved exactly, UTF-8 or not. Each output line ends with `\n`.
pub fn label_lines(input: &[u8], category: Category) -> Vec<u8> {
    let token = category.as_str().as_bytes();
    let mut out = Vec::with_capacity(input.len() + input.len() / 8);
    for line in split_lines(input) {
        out.extend_from_slice(line);
        out.push(b',');
        out.extend_from_slice(token);
        out.push(b'\n');
    }
    out
}

/// Label every configured source.
///
/// All inputs are read before any output is written, so a missing input
/// leaves every output untouched.
pub fn label_sources(sources: &[LabelSource]) -> Result<Vec<LabelStats>> {
    let mut labeled = Vec::with_capacity(sources.len());
    for source in sources {
        let raw = std::fs::read(&source.input).map_err(|e| PipelineError::io(&source.input, e))?;
        if raw.is_empty() {
            warn!(path = %source.input.display(), "Capture file is empty");
        }
        let rows = split_lines(&raw).len();
        labeled.push((source, rows, label_lines(&raw, source.category)));
    }

    let mut stats = Vec::with_capacity(labeled.len());
    for (source, rows, content) in labeled {
        write_file(&source.output, &content)?;
        info!(
            category = %source.category,
            rows,
            output = %source.output.display(),
            "Labeled capture"
        );
        stats.push(LabelStats {
            category: source.category,
            output: source.output.clone(),
            rows,
        });
    }
    Ok(stats)
}

/// Concatenate `inputs` in order into `output`.
///
/// A missing final newline in one input is added so rows of consecutive
/// files never fuse. Bytes are copied as they are. Returns the number of
/// lines written.
pub fn merge_files(inputs: &[PathBuf], output: &Path) -> Result<usize> {
    let mut merged = Vec::new();
    for input in inputs {
        let raw = std::fs::read(input).map_err(|e| PipelineError::io(input, e))?;
        merged.extend_from_slice(&raw);
        if !raw.is_empty() && !raw.ends_with(b"\n") {
            merged.push(b'\n');
        }
    }

    write_file(output, &merged)?;
    let lines = split_lines(&merged).len();
    info!(files = inputs.len(), lines, output = %output.display(), "Merged labeled files");
    Ok(lines)
}

/// Create parent directories and write `content` to `path`.
pub(crate) fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }
    std::fs::write(path, content).map_err(|e| PipelineError::io(path, e))
}
