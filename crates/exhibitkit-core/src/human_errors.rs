// SPDX-License-Identifier: MIT
//
// Human-readable error messages for presentation layers.
//
// User-visible failure is always a short message plus a suggestion, with
// the original error text available as expandable technical detail, never
// a raw crash.

use crate::error::ExhibitError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Network blip or busy service, safe to retry.
    Transient,
    /// User must change their inputs (bad file, empty batch).
    ActionRequired,
    /// Cannot be fixed by retrying: corrupt document, missing storage.
    Permanent,
}

/// A plain-English error with an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Original error text, for an expandable detail view.
    pub detail: String,
    pub severity: Severity,
}

/// Convert an `ExhibitError` into something a petition preparer can act on.
pub fn humanize_error(err: &ExhibitError) -> HumanError {
    let detail = err.to_string();
    match err {
        ExhibitError::Pdf(_) => HumanError {
            message: "One of your documents could not be processed.".into(),
            suggestion: "Re-export the document as a standard PDF and try again.".into(),
            detail,
            severity: Severity::Permanent,
        },
        ExhibitError::Compression(_) => HumanError {
            message: "We couldn't shrink a document.".into(),
            suggestion: "The original file was kept, so your package is complete; \
                         it may just be larger than expected."
                .into(),
            detail,
            severity: Severity::Transient,
        },
        ExhibitError::Ingest(_) => HumanError {
            message: "A source file or link couldn't be read.".into(),
            suggestion: "Check that the file exists and any URLs are reachable, then retry."
                .into(),
            detail,
            severity: Severity::Transient,
        },
        ExhibitError::NoDocuments => HumanError {
            message: "No documents were available to process.".into(),
            suggestion: "Add at least one PDF, ZIP, or URL source and run again.".into(),
            detail,
            severity: Severity::ActionRequired,
        },
        ExhibitError::Storage(_) | ExhibitError::Io(_) => HumanError {
            message: "The finished package couldn't be saved.".into(),
            suggestion: "Make sure the output folder exists and has free space.".into(),
            detail,
            severity: Severity::Permanent,
        },
        ExhibitError::Serialization(_) => HumanError {
            message: "The job description couldn't be read.".into(),
            suggestion: "Check the job file for JSON syntax errors.".into(),
            detail,
            severity: Severity::ActionRequired,
        },
    }
}
