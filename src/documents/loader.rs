//! Source file loading.
//!
//! Turns a file on disk into the conversion-input shape the chunker consumes.
//! Plain text and Markdown are read directly; `.json` files carry a payload
//! already produced by an external converter. Binary office formats need that
//! converter and are rejected here.

use super::types::ConvertedContent;
use crate::utils::document_id_for;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading a source document.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file type '{extension}' for '{path}'")]
    Unsupported { path: PathBuf, extension: String },

    #[error(
        "'{path}' is a {extension} file; convert it to text or a converter JSON payload first"
    )]
    ConversionRequired { path: PathBuf, extension: String },

    #[error("'{path}' is {size} bytes, above the {limit} byte limit")]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("'{path}' is empty")]
    Empty { path: PathBuf },

    #[error("'{path}' is not valid UTF-8 text")]
    InvalidEncoding { path: PathBuf },

    #[error("Invalid converter payload in '{path}': {source}")]
    InvalidPayload {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Source formats recognised by the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Text,
    Markdown,
    Converted,
    Pdf,
    Docx,
    Doc,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "txt" => Some(SourceKind::Text),
            "md" | "markdown" => Some(SourceKind::Markdown),
            "json" => Some(SourceKind::Converted),
            "pdf" => Some(SourceKind::Pdf),
            "docx" => Some(SourceKind::Docx),
            "doc" => Some(SourceKind::Doc),
            _ => None,
        }
    }

    /// Short file type label stored on the document record.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Text => "txt",
            SourceKind::Markdown => "md",
            SourceKind::Converted => "json",
            SourceKind::Pdf => "pdf",
            SourceKind::Docx => "docx",
            SourceKind::Doc => "doc",
        }
    }

    fn needs_conversion(&self) -> bool {
        matches!(self, SourceKind::Pdf | SourceKind::Docx | SourceKind::Doc)
    }
}

/// A loaded source file ready for chunking.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document_id: String,
    pub filename: String,
    pub kind: SourceKind,
    pub file_size: u64,
    pub content: ConvertedContent,
}

/// Load a file, enforcing `max_file_size` in bytes.
pub fn load_file(path: &Path, max_file_size: u64) -> LoadResult<LoadedDocument> {
    let kind = SourceKind::from_path(path).ok_or_else(|| LoadError::Unsupported {
        path: path.to_path_buf(),
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_string(),
    })?;

    if kind.needs_conversion() {
        return Err(LoadError::ConversionRequired {
            path: path.to_path_buf(),
            extension: kind.label().to_string(),
        });
    }

    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };

    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > max_file_size {
        return Err(LoadError::TooLarge {
            path: path.to_path_buf(),
            size,
            limit: max_file_size,
        });
    }

    let bytes = std::fs::read(path).map_err(io_err)?;
    if bytes.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }

    let content = match kind {
        SourceKind::Converted => serde_json::from_slice::<ConvertedContent>(&bytes).map_err(
            |source| LoadError::InvalidPayload {
                path: path.to_path_buf(),
                source,
            },
        )?,
        _ => {
            let text = String::from_utf8(bytes.clone()).map_err(|_| LoadError::InvalidEncoding {
                path: path.to_path_buf(),
            })?;
            ConvertedContent::from_text(text)
        }
    };

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    tracing::debug!(
        target: "pipeline",
        "loaded {filename} ({size} bytes, {})",
        kind.label()
    );

    Ok(LoadedDocument {
        document_id: document_id_for(&bytes),
        filename,
        kind,
        file_size: size,
        content,
    })
}
