// SPDX-License-Identifier: MIT
//
// Core domain types for the exhibitkit package assembler.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One ingested source document: a readable PDF inside the run's scratch
/// area plus a display title. Immutable once ingested; discarded with the
/// run's scratch storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub title: String,
}

/// Named quality presets controlling the size/fidelity tradeoff.
///
/// Each binds a fixed parameter tuple; the mono/text channel is never
/// downsampled below legibility regardless of preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    /// 300 DPI text, 200 DPI images, best for legal documents.
    High,
    /// 150 DPI images, 300 DPI text, good compression.
    Balanced,
    /// 100 DPI images, smallest files, use with caution.
    Maximum,
}

impl QualityPreset {
    /// Ghostscript `-dPDFSETTINGS` value for this preset.
    pub fn ghostscript_setting(&self) -> &'static str {
        match self {
            Self::High => "/printer",
            Self::Balanced => "/ebook",
            Self::Maximum => "/screen",
        }
    }

    /// (color DPI, grayscale DPI, mono DPI) downsampling targets.
    pub fn dpi(&self) -> (u32, u32, u32) {
        match self {
            Self::High => (200, 200, 300),
            Self::Balanced => (150, 150, 300),
            Self::Maximum => (100, 100, 200),
        }
    }

    /// JPEG re-encoding quality (0–100).
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            Self::High => 85,
            Self::Balanced => 80,
            Self::Maximum => 75,
        }
    }

    /// Human-readable preset name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::High => "High Quality",
            Self::Balanced => "Balanced",
            Self::Maximum => "Maximum Compression",
        }
    }
}

/// Which compression strategy produced the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMethod {
    /// External Ghostscript rasterization optimizer.
    Ghostscript,
    /// In-process lopdf rewrite with JPEG re-encoding.
    Rewrite,
    /// Remote paid compression service.
    Remote,
    /// All strategies failed or compression was disabled; original bytes
    /// pass through unmodified.
    None,
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ghostscript => "ghostscript",
            Self::Rewrite => "rewrite",
            Self::Remote => "remote",
            Self::None => "none",
        };
        write!(f, "{name}")
    }
}

/// Outcome of one compression attempt, uniform regardless of which
/// strategy succeeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionResult {
    pub succeeded: bool,
    pub method: CompressionMethod,
    pub original_size: u64,
    pub compressed_size: u64,
    pub reduction_percent: f64,
    /// Points at the compressed file when `succeeded`, otherwise at the
    /// untouched input.
    pub output_path: PathBuf,
    pub error_detail: Option<String>,
}

impl CompressionResult {
    /// Pass-through result: the original document is used unmodified.
    /// Never fatal: a document must not be lost because compression failed.
    pub fn passthrough(input: PathBuf, size: u64, error_detail: Option<String>) -> Self {
        Self {
            succeeded: false,
            method: CompressionMethod::None,
            original_size: size,
            compressed_size: size,
            reduction_percent: 0.0,
            output_path: input,
            error_detail,
        }
    }

    /// Size reduction as a percentage; 0.0 when the original size is zero.
    pub fn reduction(original: u64, compressed: u64) -> f64 {
        if original == 0 {
            return 0.0;
        }
        (1.0 - compressed as f64 / original as f64) * 100.0
    }
}

/// Per-exhibit compression summary carried in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionSummary {
    pub method: CompressionMethod,
    pub original_size: u64,
    pub compressed_size: u64,
    pub reduction_percent: f64,
}

impl From<&CompressionResult> for CompressionSummary {
    fn from(result: &CompressionResult) -> Self {
        Self {
            method: result.method,
            original_size: result.original_size,
            compressed_size: result.compressed_size,
            reduction_percent: result.reduction_percent,
        }
    }
}

/// Exhibit label schemes.
///
/// Labels are a pure function of position; reordering the exhibit list
/// re-derives every label rather than patching stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberingScheme {
    /// A, B, …, Z, AA, AB, …
    Letters,
    /// "1", "2", "3", …
    Numbers,
    /// I, II, III, …
    Roman,
}

impl NumberingScheme {
    /// Derive the label for the exhibit at `index` (0-based).
    pub fn label(&self, index: usize) -> String {
        match self {
            Self::Letters => to_letters(index),
            Self::Numbers => (index + 1).to_string(),
            Self::Roman => to_roman(index + 1),
        }
    }
}

/// Bijective base-26 letter labels: 0 → A, 25 → Z, 26 → AA, 27 → AB, …
fn to_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::new();
    while n > 0 {
        n -= 1;
        out.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Standard subtractive Roman numerals (1 → I, 4 → IV, 9 → IX, …).
fn to_roman(mut num: usize) -> String {
    const VALUES: [(usize, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut out = String::new();
    for (value, symbol) in VALUES {
        while num >= value {
            out.push_str(symbol);
            num -= value;
        }
    }
    out
}

/// One numbered, labeled unit of evidence in the output package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExhibitRecord {
    /// Scheme-dependent label (derived from position, never stored identity).
    pub label: String,
    pub title: String,
    pub source_filename: String,
    pub page_count: usize,
    pub compression: Option<CompressionSummary>,
    /// Whether the exhibit overlay was applied. An unannotated exhibit is
    /// preferable to a missing one, so annotation failures only clear this.
    pub annotated: bool,
    pub error: Option<String>,
}

/// Case metadata rendered into the table of contents.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseMetadata {
    pub case_name: String,
    /// Visa category label (O-1A, P-1A, etc.).
    pub visa_type: String,
    pub beneficiary_name: Option<String>,
}

/// Lifecycle stages of a pipeline run. Linear, no back-edges; `Failed` is
/// reachable from any stage on an unrecoverable error. `Idle` is the
/// pre-run state presentation layers start from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    #[default]
    Idle,
    Ingesting,
    Compressing,
    Numbering,
    GeneratingToc,
    Merging,
    Complete,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Ingesting => "ingesting",
            Self::Compressing => "compressing",
            Self::Numbering => "numbering",
            Self::GeneratingToc => "generating_toc",
            Self::Merging => "merging",
            Self::Complete => "complete",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Discrete progress event, emitted after each per-document operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: PipelineStage,
    pub current: usize,
    pub total: usize,
    pub detail: String,
}

/// Structured summary of one pipeline run: per-exhibit records plus
/// run-level aggregates. Read-only after the run completes; the next run
/// supersedes it rather than merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExhibitManifest {
    pub records: Vec<ExhibitRecord>,
    pub total_original_size: u64,
    pub total_compressed_size: u64,
    /// Average reduction across the package; 0.0 when the original total
    /// is zero.
    pub avg_reduction: f64,
    pub quality_preset: QualityPreset,
    pub generated_at: DateTime<Utc>,
    pub total_exhibits: usize,
    pub successful_exhibits: usize,
    pub failed_exhibits: usize,
    pub stage: PipelineStage,
    /// Merged package artifact, when merging was enabled.
    pub artifact: Option<PathBuf>,
    /// Per-exhibit artifacts, when merging was disabled.
    pub artifacts: Vec<PathBuf>,
    /// Standalone table-of-contents artifact, when requested.
    pub toc: Option<PathBuf>,
}

/// Format a byte count as a human-readable string ("1.5 MB").
pub fn format_bytes(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letter_labels_follow_the_alphabet() {
        let scheme = NumberingScheme::Letters;
        assert_eq!(scheme.label(0), "A");
        assert_eq!(scheme.label(1), "B");
        assert_eq!(scheme.label(25), "Z");
    }

    #[test]
    fn letter_labels_extend_past_z() {
        let scheme = NumberingScheme::Letters;
        assert_eq!(scheme.label(26), "AA");
        assert_eq!(scheme.label(27), "AB");
        assert_eq!(scheme.label(51), "AZ");
        assert_eq!(scheme.label(52), "BA");
        assert_eq!(scheme.label(701), "ZZ");
        assert_eq!(scheme.label(702), "AAA");
    }

    #[test]
    fn number_labels_are_one_indexed() {
        let scheme = NumberingScheme::Numbers;
        assert_eq!(scheme.label(0), "1");
        assert_eq!(scheme.label(9), "10");
    }

    #[test]
    fn roman_labels_use_subtractive_forms() {
        let scheme = NumberingScheme::Roman;
        assert_eq!(scheme.label(0), "I");
        assert_eq!(scheme.label(3), "IV");
        assert_eq!(scheme.label(8), "IX");
        assert_eq!(scheme.label(13), "XIV");
        assert_eq!(scheme.label(39), "XL");
        assert_eq!(scheme.label(48), "XLIX");
    }

    #[test]
    fn labels_are_a_pure_function_of_position() {
        // Reordering and re-deriving must match deriving fresh from the
        // new order.
        let scheme = NumberingScheme::Letters;
        let mut titles = vec!["first", "second", "third"];
        titles.swap(0, 1);
        let relabeled: Vec<String> = (0..titles.len()).map(|i| scheme.label(i)).collect();
        let fresh: Vec<String> = (0..3).map(|i| scheme.label(i)).collect();
        assert_eq!(relabeled, fresh);
    }

    #[test]
    fn reduction_guards_zero_original() {
        assert_eq!(CompressionResult::reduction(0, 0), 0.0);
        assert_eq!(CompressionResult::reduction(100, 50), 50.0);
    }

    #[test]
    fn passthrough_keeps_sizes_equal() {
        let result = CompressionResult::passthrough("in.pdf".into(), 1234, None);
        assert!(!result.succeeded);
        assert_eq!(result.method, CompressionMethod::None);
        assert_eq!(result.original_size, result.compressed_size);
        assert_eq!(result.reduction_percent, 0.0);
    }

    #[test]
    fn preset_tables_match_documented_values() {
        assert_eq!(QualityPreset::High.ghostscript_setting(), "/printer");
        assert_eq!(QualityPreset::High.dpi(), (200, 200, 300));
        assert_eq!(QualityPreset::High.jpeg_quality(), 85);
        assert_eq!(QualityPreset::Balanced.ghostscript_setting(), "/ebook");
        assert_eq!(QualityPreset::Balanced.dpi(), (150, 150, 300));
        assert_eq!(QualityPreset::Maximum.ghostscript_setting(), "/screen");
        assert_eq!(QualityPreset::Maximum.jpeg_quality(), 75);
    }

    #[test]
    fn stage_lifecycle_starts_idle() {
        assert_eq!(PipelineStage::default(), PipelineStage::Idle);
    }

    #[test]
    fn format_bytes_picks_sensible_units() {
        assert_eq!(format_bytes(512), "512.0 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
