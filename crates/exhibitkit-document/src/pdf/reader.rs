// SPDX-License-Identifier: MIT
//
// Shared PDF inspection helpers built on `lopdf`.

use std::path::Path;

use exhibitkit_core::error::{ExhibitError, Result};
use lopdf::{Document, Object};

/// Load a PDF from raw bytes.
pub fn load_bytes(data: &[u8]) -> Result<Document> {
    Document::load_mem(data)
        .map_err(|err| ExhibitError::Pdf(format!("failed to load PDF from memory: {err}")))
}

/// Load a PDF from the filesystem.
pub fn load_file(path: impl AsRef<Path>) -> Result<Document> {
    let path_ref = path.as_ref();
    Document::load(path_ref).map_err(|err| {
        ExhibitError::Pdf(format!("failed to open {}: {err}", path_ref.display()))
    })
}

/// Number of pages in a serialized PDF.
pub fn page_count(data: &[u8]) -> Result<usize> {
    Ok(load_bytes(data)?.get_pages().len())
}

/// Number of pages in a PDF file on disk.
pub fn page_count_of(path: impl AsRef<Path>) -> Result<usize> {
    Ok(load_file(path)?.get_pages().len())
}

/// Resolve an object through at most one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Numeric value of an Integer or Real object.
pub(crate) fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Look up an attribute on a page, walking the /Parent chain for
/// inheritable entries (/Resources, /MediaBox, /Rotate, ...).
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: lopdf::ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut current = page_id;
    // Bounded walk: a well-formed page tree is shallow, and the bound
    // protects against cyclic /Parent references in damaged files.
    for _ in 0..32 {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
    None
}
