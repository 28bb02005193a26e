// SPDX-License-Identifier: MIT
//
// Pipeline configuration.
//
// One explicit record passed into the pipeline at invocation time; there
// is no ambient or session state.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::{CaseMetadata, NumberingScheme, QualityPreset};

/// Configuration for one pipeline invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Exhibit label scheme.
    pub numbering: NumberingScheme,
    /// Compression quality preset.
    pub quality: QualityPreset,
    /// Whether to compress documents before annotation.
    pub compress: bool,
    /// Whether to generate a table of contents.
    pub generate_toc: bool,
    /// Whether to merge everything into one package PDF. When disabled the
    /// run's artifacts are the individually annotated exhibits.
    pub merge: bool,
    /// Credential for the remote compression service; the remote tier is
    /// only attempted when this is present.
    pub remote_api_key: Option<String>,
    /// Case metadata rendered into the table of contents.
    pub case: CaseMetadata,
    /// Directory that receives the final artifacts. Must outlive the run's
    /// scratch storage.
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            numbering: NumberingScheme::Letters,
            quality: QualityPreset::High,
            compress: true,
            generate_toc: true,
            merge: true,
            remote_api_key: None,
            case: CaseMetadata::default(),
            output_dir: std::env::temp_dir(),
        }
    }
}
