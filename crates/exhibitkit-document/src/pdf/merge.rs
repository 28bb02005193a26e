// SPDX-License-Identifier: MIT
//
// Ordered PDF concatenation.
//
// A pure primitive with no exhibit semantics: pages from each readable
// input are deep-cloned, in order, into a freshly built document with its
// own /Pages tree and catalog. Inputs that are missing or unreadable are
// skipped with a diagnostic rather than failing the whole merge.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use exhibitkit_core::error::{ExhibitError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, info, instrument, warn};

use super::reader::inherited_attribute;

/// Attributes a page may inherit from its original /Pages ancestors. They
/// are flattened onto each cloned page because the clone gets a new parent.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Concatenate the given PDFs in order into a single document, returned as
/// serialized bytes. Missing or unparseable inputs are skipped; the merge
/// fails only when nothing survives.
#[instrument(skip_all, fields(input_count = paths.len()))]
pub fn merge_documents(paths: &[PathBuf]) -> Result<Vec<u8>> {
    let mut target = Document::with_version("1.5");
    let mut kids: Vec<ObjectId> = Vec::new();
    let mut skipped = 0usize;

    for path in paths {
        match append_document(&mut target, path) {
            Ok(cloned) => kids.extend(cloned),
            Err(err) => {
                warn!(path = %path.display(), %err, "skipping unreadable merge input");
                skipped += 1;
            }
        }
    }

    if kids.is_empty() {
        return Err(ExhibitError::Pdf(
            "no readable documents to merge".to_string(),
        ));
    }

    let kid_refs: Vec<Object> = kids.iter().map(|id| Object::Reference(*id)).collect();
    let page_count = kids.len() as i64;
    let pages_id = target.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kid_refs,
        "Count" => page_count,
    });
    for kid in &kids {
        if let Ok(page) = target.get_object_mut(*kid)
            && let Object::Dictionary(dict) = page
        {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }
    let catalog_id = target.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    target.trailer.set("Root", catalog_id);
    target.compress();

    let mut output = Vec::new();
    target
        .save_to(&mut output)
        .map_err(|err| ExhibitError::Pdf(format!("failed to serialise merged PDF: {err}")))?;

    info!(
        pages = page_count,
        skipped,
        output_bytes = output.len(),
        "merge complete"
    );
    Ok(output)
}

/// Clone every page of the document at `path` into `target`, returning the
/// new page object ids in page order.
fn append_document(target: &mut Document, path: &Path) -> Result<Vec<ObjectId>> {
    let source = Document::load(path)
        .map_err(|err| ExhibitError::Pdf(format!("cannot load {}: {err}", path.display())))?;

    let pages = source.get_pages();
    let mut page_numbers: Vec<u32> = pages.keys().copied().collect();
    page_numbers.sort_unstable();

    // One clone map per input: references back into already-cloned objects
    // (annotation /P entries, shared resources) resolve to the reserved
    // target id instead of being cloned again.
    let mut cloned_ids: HashMap<ObjectId, ObjectId> = HashMap::new();
    let mut cloned = Vec::with_capacity(page_numbers.len());
    for page_number in page_numbers {
        let page_id = pages[&page_number];
        cloned.push(clone_page(&source, target, page_id, &mut cloned_ids)?);
    }

    debug!(path = %path.display(), pages = cloned.len(), "input appended");
    Ok(cloned)
}

/// Deep-clone one page into `target`.
///
/// Inheritable attributes are materialised onto the page first; the clone
/// is re-parented under the target's /Pages node, so anything the page used
/// to inherit would otherwise be lost. The page's target id is reserved
/// before descending so references back to the page (annotation /P entries)
/// resolve through the clone map instead of recursing.
fn clone_page(
    source: &Document,
    target: &mut Document,
    page_id: ObjectId,
    cloned_ids: &mut HashMap<ObjectId, ObjectId>,
) -> Result<ObjectId> {
    let page_dict = source
        .get_object(page_id)
        .ok()
        .and_then(|obj| obj.as_dict().ok())
        .ok_or_else(|| ExhibitError::Pdf(format!("page object {page_id:?} is not a dictionary")))?;

    let mut flattened = page_dict.clone();
    for key in INHERITABLE_KEYS {
        if !flattened.has(key)
            && let Some(value) = inherited_attribute(source, page_id, key)
        {
            flattened.set(key, value.clone());
        }
    }

    let new_id = target.new_object_id();
    cloned_ids.insert(page_id, new_id);
    let cloned = deep_clone(source, target, &Object::Dictionary(flattened), cloned_ids)?;
    target.objects.insert(new_id, cloned);
    Ok(new_id)
}

/// Recursively clone an object graph from `source` into `target`.
///
/// Every source object is cloned at most once: its target id is reserved in
/// `cloned_ids` before its contents are descended, so cyclic references
/// (a valid PDF is a graph, not a tree) terminate at the map lookup and
/// shared objects keep being shared after the clone. The /Parent
/// back-reference is skipped; the caller re-parents cloned pages.
fn deep_clone(
    source: &Document,
    target: &mut Document,
    object: &Object,
    cloned_ids: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Object> {
    match object {
        Object::Dictionary(dict) => Ok(Object::Dictionary(clone_dict(
            source, target, dict, cloned_ids,
        )?)),
        Object::Array(items) => {
            let mut cloned = Vec::with_capacity(items.len());
            for item in items {
                cloned.push(deep_clone(source, target, item, cloned_ids)?);
            }
            Ok(Object::Array(cloned))
        }
        Object::Reference(ref_id) => {
            if let Some(mapped) = cloned_ids.get(ref_id) {
                return Ok(Object::Reference(*mapped));
            }
            match source.get_object(*ref_id) {
                Ok(referenced) => {
                    let new_id = target.new_object_id();
                    cloned_ids.insert(*ref_id, new_id);
                    let cloned = deep_clone(source, target, referenced, cloned_ids)?;
                    target.objects.insert(new_id, cloned);
                    Ok(Object::Reference(new_id))
                }
                Err(err) => {
                    warn!(?ref_id, %err, "cannot resolve reference during clone, using Null");
                    Ok(Object::Null)
                }
            }
        }
        Object::Stream(stream) => {
            let dict = clone_dict(source, target, &stream.dict, cloned_ids)?;
            Ok(Object::Stream(lopdf::Stream::new(
                dict,
                stream.content.clone(),
            )))
        }
        other => Ok(other.clone()),
    }
}

fn clone_dict(
    source: &Document,
    target: &mut Document,
    dict: &Dictionary,
    cloned_ids: &mut HashMap<ObjectId, ObjectId>,
) -> Result<Dictionary> {
    let mut cloned = Dictionary::new();
    for (key, value) in dict.iter() {
        if key == b"Parent" {
            continue;
        }
        cloned.set(key.clone(), deep_clone(source, target, value, cloned_ids)?);
    }
    Ok(cloned)
}
