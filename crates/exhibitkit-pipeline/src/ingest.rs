// SPDX-License-Identifier: MIT
//
// Source ingestion: normalises direct files, ZIP archives, and URL
// downloads into scratch-resident source documents.
//
// The pipeline does not care how a document was obtained, only that its
// path resolves to a readable file when the run consumes it. A source that
// fails to materialise is dropped with a warning; only an empty result is
// fatal, and that decision belongs to the orchestrator.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use exhibitkit_core::error::{ExhibitError, Result};
use exhibitkit_core::types::SourceDocument;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::scratch::Scratch;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// One requested input to a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExhibitSource {
    /// A document already on the local filesystem.
    File {
        path: PathBuf,
        #[serde(default)]
        title: Option<String>,
    },
    /// A ZIP archive whose PDF entries each become one exhibit.
    Zip { path: PathBuf },
    /// A document fetched over HTTP.
    Url {
        url: String,
        #[serde(default)]
        title: Option<String>,
    },
}

/// Materialise one source into zero or more scratch-resident documents.
///
/// Errors describe why the source failed; the caller decides whether to
/// drop it (per-item policy) or abort (empty batch).
pub fn ingest_source(source: &ExhibitSource, scratch: &Scratch) -> Result<Vec<SourceDocument>> {
    match source {
        ExhibitSource::File { path, title } => ingest_file(path, title.as_deref(), scratch),
        ExhibitSource::Zip { path } => ingest_zip(path, scratch),
        ExhibitSource::Url { url, title } => ingest_url(url, title.as_deref(), scratch),
    }
}

fn ingest_file(path: &Path, title: Option<&str>, scratch: &Scratch) -> Result<Vec<SourceDocument>> {
    let display_title = title
        .map(str::to_string)
        .unwrap_or_else(|| file_title(path));
    let destination = scratch.unique_path("source", "pdf");
    fs::copy(path, &destination).map_err(|err| {
        ExhibitError::Ingest(format!("cannot read {}: {err}", path.display()))
    })?;
    debug!(path = %path.display(), title = %display_title, "file ingested");
    Ok(vec![SourceDocument {
        path: destination,
        title: display_title,
    }])
}

fn ingest_zip(path: &Path, scratch: &Scratch) -> Result<Vec<SourceDocument>> {
    let file = File::open(path)
        .map_err(|err| ExhibitError::Ingest(format!("cannot open {}: {err}", path.display())))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|err| {
        ExhibitError::Ingest(format!("corrupt archive {}: {err}", path.display()))
    })?;

    let mut documents = Vec::new();
    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(archive = %path.display(), index, %err, "skipping corrupt archive entry");
                continue;
            }
        };
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if !name.to_ascii_lowercase().ends_with(".pdf") {
            continue;
        }

        let destination = scratch.unique_path("unzipped", "pdf");
        let extracted = File::create(&destination)
            .map_err(ExhibitError::Io)
            .and_then(|mut out| io::copy(&mut entry, &mut out).map_err(ExhibitError::Io));
        match extracted {
            Ok(_) => {
                debug!(archive = %path.display(), entry = %name, "archive entry extracted");
                documents.push(SourceDocument {
                    path: destination,
                    title: file_title(Path::new(&name)),
                });
            }
            Err(err) => {
                warn!(archive = %path.display(), entry = %name, %err, "skipping unreadable archive entry");
            }
        }
    }

    if documents.is_empty() {
        return Err(ExhibitError::Ingest(format!(
            "archive {} contains no readable PDF entries",
            path.display()
        )));
    }
    Ok(documents)
}

fn ingest_url(url: &str, title: Option<&str>, scratch: &Scratch) -> Result<Vec<SourceDocument>> {
    let client = reqwest::blocking::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|err| ExhibitError::Ingest(format!("http client: {err}")))?;

    let bytes = client
        .get(url)
        .send()
        .map_err(|err| ExhibitError::Ingest(format!("download failed for {url}: {err}")))?
        .error_for_status()
        .map_err(|err| ExhibitError::Ingest(format!("download failed for {url}: {err}")))?
        .bytes()
        .map_err(|err| ExhibitError::Ingest(format!("download body for {url}: {err}")))?;

    let destination = scratch.unique_path("download", "pdf");
    fs::write(&destination, &bytes)?;

    let display_title = title.map(str::to_string).unwrap_or_else(|| {
        url.rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap_or("webpage")
            .to_string()
    });
    debug!(url, bytes = bytes.len(), "url ingested");
    Ok(vec![SourceDocument {
        path: destination,
        title: display_title,
    }])
}

fn file_title(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_source_lands_in_scratch_with_its_name_as_title() {
        let scratch = Scratch::new().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let original = outside.path().join("award letter.pdf");
        fs::write(&original, b"%PDF-1.4 stub").unwrap();

        let docs = ingest_source(
            &ExhibitSource::File {
                path: original,
                title: None,
            },
            &scratch,
        )
        .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "award letter.pdf");
        assert!(docs[0].path.starts_with(scratch.path()));
    }

    #[test]
    fn missing_file_is_an_ingest_error() {
        let scratch = Scratch::new().unwrap();
        let result = ingest_source(
            &ExhibitSource::File {
                path: "/no/such/file.pdf".into(),
                title: None,
            },
            &scratch,
        );
        assert!(result.is_err());
    }

    #[test]
    fn zip_pdf_entries_become_documents() {
        let scratch = Scratch::new().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let archive_path = outside.path().join("bundle.zip");

        let file = File::create(&archive_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("one.pdf", options).unwrap();
        writer.write_all(b"%PDF-1.4 one").unwrap();
        writer.start_file("notes.txt", options).unwrap();
        writer.write_all(b"ignore me").unwrap();
        writer.start_file("two.pdf", options).unwrap();
        writer.write_all(b"%PDF-1.4 two").unwrap();
        writer.finish().unwrap();

        let docs = ingest_source(&ExhibitSource::Zip { path: archive_path }, &scratch).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "one.pdf");
        assert_eq!(docs[1].title, "two.pdf");
    }

    #[test]
    fn zip_without_pdfs_is_an_ingest_error() {
        let scratch = Scratch::new().unwrap();
        let outside = tempfile::tempdir().unwrap();
        let archive_path = outside.path().join("empty.zip");

        let file = File::create(&archive_path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("readme.md", options).unwrap();
        writer.write_all(b"no pdfs here").unwrap();
        writer.finish().unwrap();

        let result = ingest_source(&ExhibitSource::Zip { path: archive_path }, &scratch);
        assert!(result.is_err());
    }

    #[test]
    fn url_title_falls_back_to_the_last_path_segment() {
        // Exercised without the network: the fallback logic is pure.
        let url = "https://example.com/evidence/award.pdf";
        let segment = url
            .rsplit('/')
            .find(|segment| !segment.is_empty())
            .unwrap();
        assert_eq!(segment, "award.pdf");
    }
}
