// SPDX-License-Identifier: MIT
//
// The exhibit pipeline orchestrator.
//
// Synchronous, single-threaded, stage-at-a-time:
// Ingesting → Compressing (optional) → Numbering → GeneratingToc (optional)
// → Merging (optional) → Complete. No stage begins before the prior one is
// fully drained, and no per-document exception crosses a stage boundary;
// each becomes a recorded failure annotation on that item. Stage-fatal
// conditions are an empty ingest result and an unwritable final artifact.

use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use exhibitkit_core::config::PipelineConfig;
use exhibitkit_core::error::{ExhibitError, Result};
use exhibitkit_core::types::{
    CompressionResult, ExhibitManifest, ExhibitRecord, PipelineStage, ProgressEvent,
    SourceDocument,
};
use exhibitkit_document::compress::CompressionEngine;
use exhibitkit_document::pdf::annotate::annotate_exhibit;
use exhibitkit_document::pdf::merge::merge_documents;
use exhibitkit_document::pdf::reader::page_count;
use exhibitkit_document::pdf::toc::generate_toc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::ingest::{ExhibitSource, ingest_source};
use crate::scratch::Scratch;

/// One synchronous pipeline invocation. Owns its scratch storage for the
/// run's lifetime; the scratch area is released on every exit path.
pub struct ExhibitPipeline {
    config: PipelineConfig,
}

impl ExhibitPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline over the given sources.
    ///
    /// Progress events fire after each per-document operation. On success
    /// the manifest's stage is `Complete` and its artifacts live under
    /// `config.output_dir`, outliving the scratch area. A stage-fatal error
    /// emits a terminal `Failed` event before the error propagates.
    #[instrument(skip_all, fields(sources = sources.len()))]
    pub fn run(
        &self,
        sources: &[ExhibitSource],
        mut on_progress: impl FnMut(&ProgressEvent),
    ) -> Result<ExhibitManifest> {
        match self.run_stages(sources, &mut on_progress) {
            Ok(manifest) => Ok(manifest),
            Err(err) => {
                warn!(%err, "pipeline run failed");
                on_progress(&ProgressEvent {
                    stage: PipelineStage::Failed,
                    current: 0,
                    total: 0,
                    detail: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn run_stages(
        &self,
        sources: &[ExhibitSource],
        on_progress: &mut impl FnMut(&ProgressEvent),
    ) -> Result<ExhibitManifest> {
        let scratch = Scratch::new()?;

        // -- Ingesting ------------------------------------------------------
        let documents = self.ingest_stage(sources, &scratch, on_progress)?;

        // -- Compressing (optional) ----------------------------------------
        let (compression, total_original, total_compressed) =
            self.compress_stage(&documents, &scratch, on_progress)?;

        // -- Numbering + annotation ----------------------------------------
        let (records, exhibit_paths) =
            self.numbering_stage(&documents, &compression, &scratch, on_progress)?;

        // -- GeneratingToc (optional) ---------------------------------------
        let generated_at = Utc::now();
        let toc_scratch = if self.config.generate_toc {
            let toc = match generate_toc(&records, &self.config.case, generated_at) {
                Ok(bytes) => {
                    let path = scratch.unique_path("toc", "pdf");
                    fs::write(&path, &bytes)?;
                    Some(path)
                }
                Err(err) => {
                    warn!(%err, "TOC generation failed, continuing without a TOC");
                    None
                }
            };
            on_progress(&ProgressEvent {
                stage: PipelineStage::GeneratingToc,
                current: 1,
                total: 1,
                detail: "table of contents".into(),
            });
            toc
        } else {
            None
        };

        // -- Merging (optional) ----------------------------------------------
        fs::create_dir_all(&self.config.output_dir).map_err(|err| {
            ExhibitError::Storage(format!(
                "cannot create output dir {}: {err}",
                self.config.output_dir.display()
            ))
        })?;
        let run_id = Uuid::new_v4().simple().to_string();

        let mut artifact = None;
        let mut artifacts = Vec::new();
        if self.config.merge {
            let mut merge_inputs = Vec::with_capacity(exhibit_paths.len() + 1);
            if let Some(toc) = &toc_scratch {
                merge_inputs.push(toc.clone());
            }
            merge_inputs.extend(exhibit_paths.iter().flatten().cloned());

            let merged = merge_documents(&merge_inputs)?;
            let path = self
                .config
                .output_dir
                .join(format!("exhibit_package_{run_id}.pdf"));
            fs::write(&path, &merged).map_err(|err| {
                ExhibitError::Storage(format!("cannot write {}: {err}", path.display()))
            })?;
            info!(path = %path.display(), bytes = merged.len(), "package written");
            artifact = Some(path);
            on_progress(&ProgressEvent {
                stage: PipelineStage::Merging,
                current: 1,
                total: 1,
                detail: "merged package".into(),
            });
        } else {
            // The terminal artifact is the set of individually annotated
            // documents; copy them out before the scratch area is released.
            for (record, source_path) in records
                .iter()
                .zip(&exhibit_paths)
                .filter_map(|(record, path)| path.as_ref().map(|p| (record, p)))
            {
                let path = self
                    .config
                    .output_dir
                    .join(format!("exhibit_{}_{run_id}.pdf", record.label));
                fs::copy(source_path, &path).map_err(|err| {
                    ExhibitError::Storage(format!("cannot write {}: {err}", path.display()))
                })?;
                artifacts.push(path);
            }
            info!(count = artifacts.len(), "per-exhibit artifacts written");
        }

        // The standalone TOC also outlives the scratch area when requested.
        let toc = match &toc_scratch {
            Some(scratch_path) => {
                let path = self.config.output_dir.join(format!("toc_{run_id}.pdf"));
                fs::copy(scratch_path, &path).map_err(|err| {
                    ExhibitError::Storage(format!("cannot write {}: {err}", path.display()))
                })?;
                Some(path)
            }
            None => None,
        };

        // -- Complete ---------------------------------------------------------
        let successful = records.iter().filter(|r| r.error.is_none()).count();
        let failed = records.len() - successful;
        let avg_reduction = CompressionResult::reduction(total_original, total_compressed);

        Ok(ExhibitManifest {
            total_exhibits: records.len(),
            successful_exhibits: successful,
            failed_exhibits: failed,
            records,
            total_original_size: total_original,
            total_compressed_size: total_compressed,
            avg_reduction,
            quality_preset: self.config.quality,
            generated_at,
            stage: PipelineStage::Complete,
            artifact,
            artifacts,
            toc,
        })
    }

    /// Normalise all sources into scratch-resident documents. Failed
    /// sources are dropped with a warning; an empty result is stage-fatal.
    fn ingest_stage(
        &self,
        sources: &[ExhibitSource],
        scratch: &Scratch,
        on_progress: &mut impl FnMut(&ProgressEvent),
    ) -> Result<Vec<SourceDocument>> {
        let mut documents = Vec::new();
        for (index, source) in sources.iter().enumerate() {
            match ingest_source(source, scratch) {
                Ok(ingested) => documents.extend(ingested),
                Err(err) => warn!(index, %err, "dropping source that failed to materialise"),
            }
            on_progress(&ProgressEvent {
                stage: PipelineStage::Ingesting,
                current: index + 1,
                total: sources.len(),
                detail: format!("source {}", index + 1),
            });
        }

        if documents.is_empty() {
            return Err(ExhibitError::NoDocuments);
        }
        info!(count = documents.len(), "ingestion complete");
        Ok(documents)
    }

    /// Apply the compression engine per document when enabled. Per-document
    /// failure never aborts the stage; the engine already degrades to
    /// pass-through. Aggregates sizes for the manifest either way.
    fn compress_stage(
        &self,
        documents: &[SourceDocument],
        scratch: &Scratch,
        on_progress: &mut impl FnMut(&ProgressEvent),
    ) -> Result<(Vec<Option<CompressionResult>>, u64, u64)> {
        let mut results = Vec::with_capacity(documents.len());
        let mut total_original = 0u64;
        let mut total_compressed = 0u64;

        if self.config.compress {
            let engine =
                CompressionEngine::new(self.config.quality, self.config.remote_api_key.clone());
            for (index, document) in documents.iter().enumerate() {
                let output = scratch.unique_path("compressed", "pdf");
                let result = engine.compress(&document.path, &output);
                total_original += result.original_size;
                total_compressed += result.compressed_size;
                on_progress(&ProgressEvent {
                    stage: PipelineStage::Compressing,
                    current: index + 1,
                    total: documents.len(),
                    detail: document.title.clone(),
                });
                results.push(Some(result));
            }
        } else {
            for document in documents {
                let size = fs::metadata(&document.path).map(|m| m.len()).unwrap_or(0);
                total_original += size;
                total_compressed += size;
                results.push(None);
            }
        }

        Ok((results, total_original, total_compressed))
    }

    /// Assign position-derived labels and apply the exhibit overlay. An
    /// annotation failure keeps the unannotated document; an exhibit with
    /// no label is preferable to a missing exhibit.
    fn numbering_stage(
        &self,
        documents: &[SourceDocument],
        compression: &[Option<CompressionResult>],
        scratch: &Scratch,
        on_progress: &mut impl FnMut(&ProgressEvent),
    ) -> Result<(Vec<ExhibitRecord>, Vec<Option<PathBuf>>)> {
        let mut records = Vec::with_capacity(documents.len());
        // Positionally aligned with `records`; None when the document could
        // not be read back at all.
        let mut exhibit_paths: Vec<Option<PathBuf>> = Vec::with_capacity(documents.len());

        for (index, document) in documents.iter().enumerate() {
            let label = self.config.numbering.label(index);
            let working = compression
                .get(index)
                .and_then(|r| r.as_ref())
                .map(|r| r.output_path.clone())
                .unwrap_or_else(|| document.path.clone());

            let mut annotated = false;
            let mut error = None;

            let bytes = match fs::read(&working) {
                Ok(bytes) => match annotate_exhibit(&bytes, &label) {
                    Ok(overlaid) => {
                        annotated = true;
                        overlaid
                    }
                    Err(err) => {
                        warn!(%label, %err, "annotation failed, using unannotated document");
                        error = Some(err.to_string());
                        bytes
                    }
                },
                Err(err) => {
                    warn!(%label, %err, "exhibit went missing before numbering");
                    error = Some(err.to_string());
                    Vec::new()
                }
            };

            let pages = if bytes.is_empty() {
                0
            } else {
                page_count(&bytes).unwrap_or(0)
            };

            if bytes.is_empty() {
                exhibit_paths.push(None);
            } else {
                let path = scratch.unique_path(&format!("exhibit_{label}"), "pdf");
                fs::write(&path, &bytes)?;
                exhibit_paths.push(Some(path));
            }

            records.push(ExhibitRecord {
                label,
                title: document.title.clone(),
                source_filename: document
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                page_count: pages,
                compression: compression
                    .get(index)
                    .and_then(|r| r.as_ref())
                    .map(Into::into),
                annotated,
                error,
            });

            on_progress(&ProgressEvent {
                stage: PipelineStage::Numbering,
                current: index + 1,
                total: documents.len(),
                detail: document.title.clone(),
            });
        }

        Ok((records, exhibit_paths))
    }
}
