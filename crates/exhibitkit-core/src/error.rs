// SPDX-License-Identifier: MIT
//
// Unified error types for exhibitkit.

use thiserror::Error;

/// Top-level error type for all exhibitkit operations.
#[derive(Debug, Error)]
pub enum ExhibitError {
    // -- Document errors --
    #[error("PDF operation failed: {0}")]
    Pdf(String),

    // -- Compression --
    #[error("compression failed: {0}")]
    Compression(String),

    // -- Ingestion --
    #[error("source ingestion failed: {0}")]
    Ingest(String),

    #[error("no documents could be ingested")]
    NoDocuments,

    // -- Output / scratch storage --
    #[error("artifact storage failed: {0}")]
    Storage(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ExhibitError>;
