// SPDX-License-Identifier: MIT
//
// Tier 2: in-process rewrite with `lopdf`.
//
// Moderate ratio, no external dependency: re-encodes embedded JPEG images
// at the preset's quality, drops zero-length streams, prunes unused
// objects, and deflates the remaining streams.

use std::path::Path;

use exhibitkit_core::error::{ExhibitError, Result};
use exhibitkit_core::types::{CompressionMethod, QualityPreset};
use image::codecs::jpeg::JpegEncoder;
use lopdf::{Document, Object, ObjectId, Stream};
use tracing::{debug, trace};

use super::CompressionStrategy;

pub struct RewriteStrategy {
    jpeg_quality: u8,
}

impl RewriteStrategy {
    pub fn new(preset: QualityPreset) -> Self {
        Self {
            jpeg_quality: preset.jpeg_quality(),
        }
    }
}

impl CompressionStrategy for RewriteStrategy {
    fn method(&self) -> CompressionMethod {
        CompressionMethod::Rewrite
    }

    fn compress(&self, input: &Path, output: &Path) -> Result<()> {
        let mut doc = Document::load(input)
            .map_err(|err| ExhibitError::Compression(format!("cannot parse input: {err}")))?;

        let reencoded = reencode_jpeg_images(&mut doc, self.jpeg_quality);

        doc.delete_zero_length_streams();
        doc.prune_objects();
        doc.renumber_objects();
        doc.compress();

        doc.save(output)
            .map_err(|err| ExhibitError::Compression(format!("cannot write output: {err}")))?;

        debug!(reencoded, "in-process rewrite complete");
        Ok(())
    }
}

/// Re-encode DCT (JPEG) image XObjects at the given quality, keeping the
/// original stream whenever re-encoding does not actually shrink it.
fn reencode_jpeg_images(doc: &mut Document, quality: u8) -> usize {
    let candidates: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) if is_jpeg_image(stream) => Some(*id),
            _ => None,
        })
        .collect();

    let mut reencoded = 0usize;
    for id in candidates {
        let Some(Object::Stream(stream)) = doc.objects.get(&id) else {
            continue;
        };
        let Some(smaller) = reencode(&stream.content, quality) else {
            trace!(?id, "image skipped (decode failed or no gain)");
            continue;
        };

        let mut dict = stream.dict.clone();
        dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        doc.objects.insert(id, Object::Stream(Stream::new(dict, smaller)));
        reencoded += 1;
    }
    reencoded
}

fn is_jpeg_image(stream: &Stream) -> bool {
    let is_image = stream
        .dict
        .get(b"Subtype")
        .ok()
        .and_then(|obj| obj.as_name().ok())
        .map(|name| name == b"Image")
        .unwrap_or(false);
    let is_dct = match stream.dict.get(b"Filter") {
        Ok(Object::Name(name)) => name == b"DCTDecode",
        Ok(Object::Array(filters)) => filters
            .iter()
            .any(|f| matches!(f, Object::Name(name) if name == b"DCTDecode")),
        _ => false,
    };
    is_image && is_dct
}

/// Decode and re-encode a JPEG payload; `None` when decoding fails or the
/// result is not smaller.
fn reencode(data: &[u8], quality: u8) -> Option<Vec<u8>> {
    let decoded = image::load_from_memory(data).ok()?;
    let rgb = decoded.to_rgb8();

    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    encoder.encode_image(&rgb).ok()?;

    (buffer.len() < data.len()).then_some(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::sample_pdf;
    use crate::pdf::reader::page_count;
    use std::fs;

    #[test]
    fn rewrite_preserves_page_count() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.pdf");
        fs::write(&input, sample_pdf(3)).unwrap();
        let output = dir.path().join("out.pdf");

        let strategy = RewriteStrategy::new(QualityPreset::High);
        strategy.compress(&input, &output).unwrap();

        let bytes = fs::read(&output).unwrap();
        assert_eq!(page_count(&bytes).unwrap(), 3);
    }

    #[test]
    fn rewrite_rejects_non_pdf_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bogus.pdf");
        fs::write(&input, b"nope").unwrap();
        let output = dir.path().join("out.pdf");

        let strategy = RewriteStrategy::new(QualityPreset::Maximum);
        assert!(strategy.compress(&input, &output).is_err());
    }

    #[test]
    fn reencode_skips_undecodable_payloads() {
        assert!(reencode(b"not a jpeg", 80).is_none());
    }

    #[test]
    fn annotated_documents_survive_rewrite_and_reannotation() {
        let dir = tempfile::tempdir().unwrap();
        let annotated = crate::pdf::annotate::annotate_exhibit(&sample_pdf(2), "A").unwrap();
        let input = dir.path().join("annotated.pdf");
        fs::write(&input, &annotated).unwrap();
        let output = dir.path().join("rewritten.pdf");

        let strategy = RewriteStrategy::new(QualityPreset::Balanced);
        strategy.compress(&input, &output).unwrap();

        let rewritten = fs::read(&output).unwrap();
        let again = crate::pdf::annotate::annotate_exhibit(&rewritten, "A").unwrap();
        assert_eq!(page_count(&again).unwrap(), 2);
    }
}
