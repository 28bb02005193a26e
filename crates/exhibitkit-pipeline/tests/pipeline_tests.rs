// SPDX-License-Identifier: MIT
//
// End-to-end pipeline runs over generated PDFs.

use std::fs;
use std::path::{Path, PathBuf};

use exhibitkit_core::config::PipelineConfig;
use exhibitkit_core::error::ExhibitError;
use exhibitkit_core::types::{
    CaseMetadata, CompressionMethod, NumberingScheme, PipelineStage, ProgressEvent,
};
use exhibitkit_pipeline::{ExhibitPipeline, ExhibitSource};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, Stream, dictionary};

/// Build a minimal valid PDF with `pages` US-Letter pages of Helvetica text.
fn sample_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for n in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("sample page {}", n + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize sample PDF");
    bytes
}

fn write_sample(dir: &Path, name: &str, pages: usize) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, sample_pdf(pages)).unwrap();
    path
}

fn file_source(path: PathBuf, title: &str) -> ExhibitSource {
    ExhibitSource::File {
        path,
        title: Some(title.to_string()),
    }
}

fn base_config(output_dir: &Path) -> PipelineConfig {
    PipelineConfig {
        compress: false,
        case: CaseMetadata {
            case_name: "MSC-24-001".to_string(),
            visa_type: "O-1A".to_string(),
            beneficiary_name: Some("Dr. Jane Example".to_string()),
        },
        output_dir: output_dir.to_path_buf(),
        ..PipelineConfig::default()
    }
}

fn pdf_pages(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}

#[test]
fn full_run_labels_merges_and_reports() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let sources = vec![
        file_source(write_sample(inputs.path(), "a.pdf", 1), "Award Letter"),
        file_source(write_sample(inputs.path(), "b.pdf", 2), "Press Coverage"),
        file_source(write_sample(inputs.path(), "c.pdf", 3), "Peer Reviews"),
    ];

    let pipeline = ExhibitPipeline::new(base_config(output.path()));
    let manifest = pipeline.run(&sources, |_| {}).unwrap();

    assert_eq!(manifest.stage, PipelineStage::Complete);
    assert_eq!(manifest.total_exhibits, 3);
    assert_eq!(manifest.successful_exhibits, 3);
    assert_eq!(manifest.failed_exhibits, 0);

    let labels: Vec<&str> = manifest.records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["A", "B", "C"]);
    assert!(manifest.records.iter().all(|r| r.annotated));
    assert_eq!(manifest.records[0].page_count, 1);
    assert_eq!(manifest.records[1].page_count, 2);
    assert_eq!(manifest.records[2].page_count, 3);

    // Merged package: 6 exhibit pages plus at least one TOC page.
    let artifact = manifest.artifact.as_ref().unwrap();
    assert!(artifact.starts_with(output.path()));
    assert!(pdf_pages(artifact) >= 7);
    assert!(manifest.toc.is_some());
}

#[test]
fn missing_sources_are_dropped_not_fatal() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let sources = vec![
        file_source(write_sample(inputs.path(), "one.pdf", 1), "One"),
        file_source(write_sample(inputs.path(), "two.pdf", 1), "Two"),
        file_source(inputs.path().join("ghost.pdf"), "Ghost"),
        file_source(write_sample(inputs.path(), "three.pdf", 1), "Three"),
        file_source(write_sample(inputs.path(), "four.pdf", 1), "Four"),
    ];

    let pipeline = ExhibitPipeline::new(base_config(output.path()));
    let manifest = pipeline.run(&sources, |_| {}).unwrap();

    assert_eq!(manifest.stage, PipelineStage::Complete);
    assert_eq!(manifest.total_exhibits, 4);
    assert_eq!(manifest.successful_exhibits, 4);
}

#[test]
fn empty_batch_is_fatal() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let sources = vec![file_source(inputs.path().join("nope.pdf"), "Missing")];

    let pipeline = ExhibitPipeline::new(base_config(output.path()));
    let result = pipeline.run(&sources, |_| {});
    assert!(matches!(result, Err(ExhibitError::NoDocuments)));
}

#[test]
fn compression_disabled_reports_passthrough_totals() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let sources = vec![file_source(
        write_sample(inputs.path(), "doc.pdf", 2),
        "Contract",
    )];

    let pipeline = ExhibitPipeline::new(base_config(output.path()));
    let manifest = pipeline.run(&sources, |_| {}).unwrap();

    assert!(manifest.records[0].compression.is_none());
    assert_eq!(
        manifest.total_original_size,
        manifest.total_compressed_size
    );
    assert_eq!(manifest.avg_reduction, 0.0);
}

#[test]
fn compression_enabled_never_grows_the_totals() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let sources = vec![
        file_source(write_sample(inputs.path(), "x.pdf", 2), "X"),
        file_source(write_sample(inputs.path(), "y.pdf", 3), "Y"),
    ];

    let config = PipelineConfig {
        compress: true,
        ..base_config(output.path())
    };
    let manifest = ExhibitPipeline::new(config).run(&sources, |_| {}).unwrap();

    assert!(manifest.total_compressed_size <= manifest.total_original_size);
    assert!(manifest.avg_reduction >= 0.0);
    for record in &manifest.records {
        let summary = record.compression.as_ref().unwrap();
        assert!(summary.compressed_size <= summary.original_size);
    }
    // Whatever the strategies did, the package still assembles.
    assert_eq!(manifest.stage, PipelineStage::Complete);
    assert!(manifest.artifact.is_some());
}

#[test]
fn all_compression_tiers_failing_still_produces_a_package() {
    // A file no optimizer can parse: Ghostscript exits nonzero, the
    // in-process rewrite fails to load it, and no remote credential is
    // configured. The document must pass through untouched.
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let path = inputs.path().join("scan.pdf");
    fs::write(&path, b"binary blob that is not a pdf").unwrap();
    let sources = vec![file_source(path, "Scanned receipt")];

    let config = PipelineConfig {
        compress: true,
        ..base_config(output.path())
    };
    let manifest = ExhibitPipeline::new(config).run(&sources, |_| {}).unwrap();

    assert_eq!(manifest.stage, PipelineStage::Complete);
    for record in &manifest.records {
        let summary = record.compression.as_ref().unwrap();
        assert_eq!(summary.method, CompressionMethod::None);
        assert_eq!(summary.compressed_size, summary.original_size);
    }
    assert_eq!(manifest.avg_reduction, 0.0);
    assert_eq!(manifest.total_original_size, manifest.total_compressed_size);

    // The TOC still anchors a merged package.
    let artifact = manifest.artifact.as_ref().unwrap();
    assert!(pdf_pages(artifact) >= 1);
}

#[test]
fn fatal_runs_emit_a_terminal_failed_event() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let sources = vec![file_source(inputs.path().join("gone.pdf"), "Gone")];

    let mut events: Vec<ProgressEvent> = Vec::new();
    let pipeline = ExhibitPipeline::new(base_config(output.path()));
    let result = pipeline.run(&sources, |event| events.push(event.clone()));

    assert!(matches!(result, Err(ExhibitError::NoDocuments)));
    let last = events.last().unwrap();
    assert_eq!(last.stage, PipelineStage::Failed);
    assert!(!last.detail.is_empty());
}

#[test]
fn merge_disabled_yields_per_exhibit_artifacts() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let sources = vec![
        file_source(write_sample(inputs.path(), "p.pdf", 1), "P"),
        file_source(write_sample(inputs.path(), "q.pdf", 1), "Q"),
    ];

    let config = PipelineConfig {
        merge: false,
        generate_toc: false,
        ..base_config(output.path())
    };
    let manifest = ExhibitPipeline::new(config).run(&sources, |_| {}).unwrap();

    assert!(manifest.artifact.is_none());
    assert!(manifest.toc.is_none());
    assert_eq!(manifest.artifacts.len(), 2);
    for artifact in &manifest.artifacts {
        assert!(artifact.exists());
        assert_eq!(pdf_pages(artifact), 1);
    }
}

#[test]
fn numbers_scheme_flows_through_to_records() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let sources = vec![
        file_source(write_sample(inputs.path(), "m.pdf", 1), "M"),
        file_source(write_sample(inputs.path(), "n.pdf", 1), "N"),
    ];

    let config = PipelineConfig {
        numbering: NumberingScheme::Numbers,
        generate_toc: false,
        ..base_config(output.path())
    };
    let manifest = ExhibitPipeline::new(config).run(&sources, |_| {}).unwrap();
    let labels: Vec<&str> = manifest.records.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["1", "2"]);
}

#[test]
fn progress_events_cover_every_stage_in_order() {
    let inputs = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let sources = vec![
        file_source(write_sample(inputs.path(), "s.pdf", 1), "S"),
        file_source(write_sample(inputs.path(), "t.pdf", 1), "T"),
    ];

    let mut events: Vec<ProgressEvent> = Vec::new();
    let pipeline = ExhibitPipeline::new(base_config(output.path()));
    pipeline.run(&sources, |event| events.push(event.clone())).unwrap();

    let stages: Vec<PipelineStage> = events.iter().map(|e| e.stage).collect();
    let order = [
        PipelineStage::Ingesting,
        PipelineStage::Numbering,
        PipelineStage::GeneratingToc,
        PipelineStage::Merging,
    ];
    let mut cursor = 0;
    for stage in &stages {
        while cursor < order.len() && order[cursor] != *stage {
            cursor += 1;
        }
        assert!(cursor < order.len(), "stage {stage} out of order");
    }

    // Per-document counters are monotonic within a stage.
    for stage in order {
        let counters: Vec<usize> = events
            .iter()
            .filter(|e| e.stage == stage)
            .map(|e| e.current)
            .collect();
        assert!(!counters.is_empty(), "no events for {stage}");
        assert!(counters.windows(2).all(|w| w[0] < w[1]) || counters.len() == 1);
        let total = events.iter().find(|e| e.stage == stage).unwrap().total;
        assert_eq!(*counters.last().unwrap(), total);
    }
}
