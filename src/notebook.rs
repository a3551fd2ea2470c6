//! Jupyter notebook (nbformat v4) parsing and rendering.
//!
//! Parsing is all-or-nothing at the document level: a malformed document is
//! a [`NotebookError`] and produces no cells. Individual outputs are decoded
//! one at a time, so a single unreadable output is dropped without affecting
//! its neighbours.

use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{CellKind, CellOutput, NotebookCell};

const MIME_PLAIN: &str = "text/plain";
const MIME_PNG: &str = "image/png";

#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("invalid notebook JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported notebook version: {0}")]
    UnsupportedVersion(u32),
}

/// Text fields may be stored as one string or as a list of lines.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MultilineText {
    Single(String),
    Lines(Vec<String>),
}

impl Default for MultilineText {
    fn default() -> Self {
        MultilineText::Single(String::new())
    }
}

impl MultilineText {
    fn into_string(self) -> String {
        match self {
            MultilineText::Single(s) => s,
            MultilineText::Lines(lines) => lines.concat(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNotebook {
    #[serde(default)]
    nbformat: Option<u32>,
    cells: Vec<RawCell>,
}

#[derive(Debug, Deserialize)]
struct RawCell {
    cell_type: String,
    #[serde(default)]
    source: MultilineText,
    #[serde(default)]
    outputs: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
enum RawOutput {
    Stream {
        #[serde(default)]
        text: MultilineText,
    },
    ExecuteResult {
        #[serde(default)]
        data: BTreeMap<String, serde_json::Value>,
    },
    DisplayData {
        #[serde(default)]
        data: BTreeMap<String, serde_json::Value>,
    },
    Error {
        #[serde(default)]
        evalue: String,
    },
}

/// Parse a notebook document into its cells, in stored order.
pub fn parse_notebook(content: &str) -> Result<Vec<NotebookCell>, NotebookError> {
    let raw: RawNotebook = serde_json::from_str(content)?;
    if let Some(version) = raw.nbformat {
        if version < 4 {
            return Err(NotebookError::UnsupportedVersion(version));
        }
    }

    let cells = raw
        .cells
        .into_iter()
        .filter_map(|cell| {
            let kind = match cell.cell_type.as_str() {
                "markdown" => CellKind::Markdown,
                "code" => CellKind::Code,
                "raw" => CellKind::Raw,
                other => {
                    tracing::debug!(cell_type = other, "Skipping unknown notebook cell type");
                    return None;
                }
            };
            let outputs = if kind == CellKind::Code {
                cell.outputs.into_iter().filter_map(decode_output).collect()
            } else {
                Vec::new()
            };
            Some(NotebookCell {
                kind,
                source: cell.source.into_string(),
                outputs,
            })
        })
        .collect();

    Ok(cells)
}

fn decode_output(value: serde_json::Value) -> Option<CellOutput> {
    let raw: RawOutput = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "Skipping undecodable notebook output");
            return None;
        }
    };

    Some(match raw {
        RawOutput::Stream { text } => CellOutput::Stream {
            text: text.into_string(),
        },
        RawOutput::ExecuteResult { mut data } => CellOutput::ExecuteResult {
            text: take_text(&mut data, MIME_PLAIN),
            png: take_text(&mut data, MIME_PNG),
        },
        RawOutput::DisplayData { mut data } => CellOutput::DisplayData {
            text: take_text(&mut data, MIME_PLAIN),
            png: take_text(&mut data, MIME_PNG),
        },
        RawOutput::Error { evalue } => CellOutput::Error { evalue },
    })
}

fn take_text(data: &mut BTreeMap<String, serde_json::Value>, mime: &str) -> Option<String> {
    let value = data.remove(mime)?;
    serde_json::from_value::<MultilineText>(value)
        .ok()
        .map(MultilineText::into_string)
}

/// Tagged text segments for a notebook, one per cell and per textual output.
///
/// Error outputs are always rendered with their short message.
pub fn segments(cells: &[NotebookCell]) -> Vec<String> {
    let mut out = Vec::new();
    for cell in cells {
        match cell.kind {
            CellKind::Markdown => out.push(format!("[MARKDOWN]: {}", cell.source)),
            CellKind::Raw => out.push(format!("[RAW]: {}", cell.source)),
            CellKind::Code => {
                out.push(format!("[CODE]:\n{}", cell.source));
                for output in &cell.outputs {
                    match output {
                        CellOutput::Stream { text } => out.push(format!("[OUTPUT]: {}", text)),
                        CellOutput::ExecuteResult {
                            text: Some(text), ..
                        } => out.push(format!("[RESULT]: {}", text)),
                        CellOutput::Error { evalue } => out.push(format!("[ERROR]: {}", evalue)),
                        CellOutput::ExecuteResult { text: None, .. }
                        | CellOutput::DisplayData { .. } => {}
                    }
                }
            }
        }
    }
    out
}

/// Base64 `image/png` payloads in cell/output order.
pub fn png_payloads(cells: &[NotebookCell]) -> impl Iterator<Item = &str> {
    cells
        .iter()
        .flat_map(|cell| cell.outputs.iter())
        .filter_map(CellOutput::png)
}
