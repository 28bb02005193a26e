// SPDX-License-Identifier: MIT
//
// Tier 1: external Ghostscript rasterization optimizer.
//
// Historically the best compression ratio at no cost. Rewrites the document
// with per-preset image downsampling and font subsetting; the mono/text
// channel is never downsampled; text legibility is never traded for size.
// A missing `gs` executable is a normal, expected fallback trigger, not a
// configuration error.

use std::path::Path;
use std::process::Command;

use exhibitkit_core::error::{ExhibitError, Result};
use exhibitkit_core::types::{CompressionMethod, QualityPreset};
use tracing::debug;

use super::CompressionStrategy;

pub struct GhostscriptStrategy {
    preset: QualityPreset,
    /// Probed once at construction; `gs` absence is accounted here instead
    /// of surfacing as a spawn error per document.
    available: bool,
}

impl GhostscriptStrategy {
    pub fn new(preset: QualityPreset) -> Self {
        let available = probe();
        debug!(available, "ghostscript probe");
        Self { preset, available }
    }
}

/// `gs --version` succeeds iff Ghostscript is installed and runnable.
fn probe() -> bool {
    Command::new("gs")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

impl CompressionStrategy for GhostscriptStrategy {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::Ghostscript
    }

    fn compress(&self, input: &Path, output: &Path) -> Result<()> {
        if !self.available {
            return Err(ExhibitError::Compression("ghostscript not available".into()));
        }

        let (color_dpi, gray_dpi, mono_dpi) = self.preset.dpi();
        let result = Command::new("gs")
            .arg("-sDEVICE=pdfwrite")
            .arg("-dCompatibilityLevel=1.4")
            .arg(format!("-dPDFSETTINGS={}", self.preset.ghostscript_setting()))
            .arg(format!("-dColorImageResolution={color_dpi}"))
            .arg(format!("-dGrayImageResolution={gray_dpi}"))
            .arg(format!("-dMonoImageResolution={mono_dpi}"))
            .arg("-dColorImageDownsampleType=/Bicubic")
            .arg("-dGrayImageDownsampleType=/Bicubic")
            .arg("-dDownsampleColorImages=true")
            .arg("-dDownsampleGrayImages=true")
            // Never downsample the text/mono channel.
            .arg("-dDownsampleMonoImages=false")
            .arg("-dCompressPages=true")
            .arg("-dOptimize=true")
            .arg("-dEmbedAllFonts=true")
            .arg("-dSubsetFonts=true")
            .arg("-dNOPAUSE")
            .arg("-dQUIET")
            .arg("-dBATCH")
            .arg(format!("-sOutputFile={}", output.display()))
            .arg(input)
            .output()
            .map_err(|err| ExhibitError::Compression(format!("failed to spawn gs: {err}")))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(ExhibitError::Compression(format!(
                "gs exited with {}: {}",
                result.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_ghostscript_fails_cleanly() {
        let strategy = GhostscriptStrategy {
            preset: QualityPreset::High,
            available: false,
        };
        let err = strategy
            .compress(Path::new("in.pdf"), Path::new("out.pdf"))
            .unwrap_err();
        assert!(err.to_string().contains("not available"));
    }
}
