// SPDX-License-Identifier: MIT
//
// Tiered compression engine.
//
// Strategies are tried in a fixed order: external Ghostscript optimizer,
// in-process lopdf rewrite, then the remote paid service when a credential
// was supplied, until one produces a valid, smaller output. Every failure
// mode (missing executable, processing error, unreadable or oversized
// output) is treated identically: log a warning and fall through. When all
// strategies fail the original document passes through unmodified; a
// document must never be lost because compression failed.

pub mod ghostscript;
pub mod remote;
pub mod rewrite;

use std::fs;
use std::path::Path;

use exhibitkit_core::error::{ExhibitError, Result};
use exhibitkit_core::types::{CompressionMethod, CompressionResult, QualityPreset, format_bytes};
use tracing::{info, instrument, warn};

use ghostscript::GhostscriptStrategy;
use remote::RemoteStrategy;
use rewrite::RewriteStrategy;

/// One concrete technique for shrinking a document's byte size.
///
/// A strategy writes its output to `output` and reports plain success or
/// failure; size accounting and output validation belong to the engine.
pub trait CompressionStrategy {
    fn method(&self) -> CompressionMethod;
    fn compress(&self, input: &Path, output: &Path) -> Result<()>;
}

/// Compression engine with an ordered strategy list.
pub struct CompressionEngine {
    preset: QualityPreset,
    strategies: Vec<Box<dyn CompressionStrategy>>,
}

impl CompressionEngine {
    /// Build the engine for one pipeline run.
    ///
    /// Ghostscript availability is probed once here and cached for the
    /// whole run, so a missing executable is accounted as a normal fallback
    /// rather than rediscovered per document. The remote tier exists only
    /// when a credential was supplied.
    pub fn new(preset: QualityPreset, remote_api_key: Option<String>) -> Self {
        let mut strategies: Vec<Box<dyn CompressionStrategy>> = vec![
            Box::new(GhostscriptStrategy::new(preset)),
            Box::new(RewriteStrategy::new(preset)),
        ];
        if let Some(api_key) = remote_api_key {
            strategies.push(Box::new(RemoteStrategy::new(api_key)));
        }
        Self { preset, strategies }
    }

    /// Compress one document, never failing the batch: if every strategy
    /// fails the result points back at the untouched input with
    /// `method == None`.
    ///
    /// Byte sizes are read from the serialized files, never estimated.
    #[instrument(skip(self), fields(preset = self.preset.display_name()))]
    pub fn compress(&self, input: &Path, output: &Path) -> CompressionResult {
        let original_size = match fs::metadata(input) {
            Ok(meta) => meta.len(),
            Err(err) => {
                warn!(input = %input.display(), %err, "cannot stat compression input");
                return CompressionResult::passthrough(
                    input.to_path_buf(),
                    0,
                    Some(err.to_string()),
                );
            }
        };

        let mut last_error = None;
        for strategy in &self.strategies {
            let method = strategy.method();
            let attempt = strategy
                .compress(input, output)
                .and_then(|()| validate_output(output, original_size));

            match attempt {
                Ok(compressed_size) => {
                    let reduction = CompressionResult::reduction(original_size, compressed_size);
                    info!(
                        %method,
                        original = %format_bytes(original_size),
                        compressed = %format_bytes(compressed_size),
                        reduction = format!("{reduction:.1}%"),
                        "compression succeeded"
                    );
                    return CompressionResult {
                        succeeded: true,
                        method,
                        original_size,
                        compressed_size,
                        reduction_percent: reduction,
                        output_path: output.to_path_buf(),
                        error_detail: None,
                    };
                }
                Err(err) => {
                    warn!(%method, %err, "compression strategy failed");
                    last_error = Some(err.to_string());
                }
            }
        }

        warn!(input = %input.display(), "all compression strategies failed, using original");
        CompressionResult::passthrough(input.to_path_buf(), original_size, last_error)
    }
}

/// A strategy only counts as succeeded when its output exists, parses as a
/// PDF, and is no larger than the input. Anything else triggers fallback.
fn validate_output(output: &Path, original_size: u64) -> Result<u64> {
    let compressed_size = fs::metadata(output)
        .map_err(|err| ExhibitError::Compression(format!("output missing: {err}")))?
        .len();
    if compressed_size == 0 {
        return Err(ExhibitError::Compression("output is zero-length".into()));
    }
    if compressed_size > original_size {
        return Err(ExhibitError::Compression(format!(
            "output grew from {} to {}",
            format_bytes(original_size),
            format_bytes(compressed_size)
        )));
    }
    lopdf::Document::load(output)
        .map_err(|err| ExhibitError::Compression(format!("output unreadable: {err}")))?;
    Ok(compressed_size)
}
