// SPDX-License-Identifier: MIT
//
// Exhibit overlay: draws "Exhibit X" near the top margin and
// "Page N of total" near the bottom margin of every page.
//
// The overlay is composed as an additional content stream appended to each
// page's /Contents; existing page streams are never rewritten, so the page
// count and underlying content are preserved exactly.

use exhibitkit_core::error::{ExhibitError, Result};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::{debug, instrument};

use super::reader::{as_number, inherited_attribute, load_bytes, resolve};

/// Font resource names reserved for the overlay. Prefixed to avoid
/// colliding with the document's own resources.
const HEADER_FONT: &str = "ExhibitHdr";
const FOOTER_FONT: &str = "ExhibitFtr";

const HEADER_SIZE: f32 = 10.0;
const FOOTER_SIZE: f32 = 9.0;
/// 0.5 inch in PDF points.
const MARGIN: f32 = 36.0;

/// US Letter, used when a page carries no /MediaBox anywhere in its chain.
const DEFAULT_PAGE: (f32, f32) = (612.0, 792.0);

/// Overlay every page of `data` with the exhibit label and a
/// "Page N of total" footer, where `total` is this document's own page
/// count. Returns the annotated document as new bytes.
#[instrument(skip(data), fields(bytes_len = data.len(), label))]
pub fn annotate_exhibit(data: &[u8], label: &str) -> Result<Vec<u8>> {
    let mut doc = load_bytes(data)?;
    let pages = doc.get_pages();
    let total = pages.len();
    if total == 0 {
        return Err(ExhibitError::Pdf("document has no pages".into()));
    }

    let header_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let footer_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let page_list: Vec<(u32, ObjectId)> = pages.into_iter().collect();
    for (page_number, page_id) in page_list {
        let (width, height) = page_dimensions(&doc, page_id);
        let header = format!("Exhibit {label}");
        let footer = format!("Page {page_number} of {total}");

        let content = overlay_content(&header, &footer, width, height);
        let encoded = content
            .encode()
            .map_err(|err| ExhibitError::Pdf(format!("failed to encode overlay: {err}")))?;
        let stream_id = doc.add_object(Stream::new(dictionary! {}, encoded));

        append_page_content(&mut doc, page_id, stream_id)?;
        register_overlay_fonts(&mut doc, page_id, header_font_id, footer_font_id)?;
    }

    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| ExhibitError::Pdf(format!("failed to serialise annotated PDF: {err}")))?;

    debug!(total, output_bytes = output.len(), "exhibit overlay applied");
    Ok(output)
}

/// Build the overlay operations for one page.
///
/// Text is centred with the same average-glyph-width estimate used for
/// plain-text layout: Helvetica glyphs average roughly half the font size.
fn overlay_content(header: &str, footer: &str, width: f32, height: f32) -> Content {
    let header_x = centered_x(header, HEADER_SIZE, width);
    let footer_x = centered_x(footer, FOOTER_SIZE, width);

    Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![HEADER_FONT.into(), HEADER_SIZE.into()]),
            Operation::new("Td", vec![header_x.into(), (height - MARGIN).into()]),
            Operation::new("Tj", vec![Object::string_literal(header)]),
            Operation::new("ET", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![FOOTER_FONT.into(), FOOTER_SIZE.into()]),
            Operation::new("Td", vec![footer_x.into(), MARGIN.into()]),
            Operation::new("Tj", vec![Object::string_literal(footer)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ],
    }
}

fn centered_x(text: &str, font_size: f32, page_width: f32) -> f32 {
    let estimated_width = text.chars().count() as f32 * 0.5 * font_size;
    ((page_width - estimated_width) / 2.0).max(0.0)
}

/// Effective page dimensions from /MediaBox (possibly inherited), falling
/// back to US Letter.
fn page_dimensions(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let media_box = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_array().ok());

    if let Some(coords) = media_box
        && coords.len() == 4
    {
        let values: Vec<f32> = coords.iter().filter_map(as_number).collect();
        if values.len() == 4 {
            return (values[2] - values[0], values[3] - values[1]);
        }
    }
    DEFAULT_PAGE
}

/// Append the overlay stream to the page's /Contents without touching the
/// existing streams. /Contents may be a single reference, an array, or
/// absent (blank page).
fn append_page_content(doc: &mut Document, page_id: ObjectId, stream_id: ObjectId) -> Result<()> {
    let page_dict = doc
        .get_object_mut(page_id)
        .ok()
        .and_then(|obj| obj.as_dict_mut().ok())
        .ok_or_else(|| ExhibitError::Pdf(format!("page object {page_id:?} is not a dictionary")))?;

    let new_contents = match page_dict.get(b"Contents") {
        Ok(Object::Array(existing)) => {
            let mut contents = existing.clone();
            contents.push(Object::Reference(stream_id));
            Object::Array(contents)
        }
        Ok(existing @ Object::Reference(_)) => {
            Object::Array(vec![existing.clone(), Object::Reference(stream_id)])
        }
        _ => Object::Reference(stream_id),
    };
    page_dict.set("Contents", new_contents);
    Ok(())
}

/// Make the overlay fonts visible from the page's /Resources.
///
/// Inherited resources are flattened onto the page first so that adding a
/// page-level dictionary never shadows fonts the original content relies on.
fn register_overlay_fonts(
    doc: &mut Document,
    page_id: ObjectId,
    header_font_id: ObjectId,
    footer_font_id: ObjectId,
) -> Result<()> {
    // Effective resources for this page, cloned so we can extend them.
    let mut resources: Dictionary = inherited_attribute(doc, page_id, b"Resources")
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    // The /Font entry may itself be indirect; resolve before extending.
    let mut fonts: Dictionary = resources
        .get(b"Font")
        .ok()
        .and_then(|obj| resolve(doc, obj))
        .and_then(|obj| obj.as_dict().ok())
        .cloned()
        .unwrap_or_default();

    fonts.set(HEADER_FONT, Object::Reference(header_font_id));
    fonts.set(FOOTER_FONT, Object::Reference(footer_font_id));
    resources.set("Font", Object::Dictionary(fonts));

    let page_dict = doc
        .get_object_mut(page_id)
        .ok()
        .and_then(|obj| obj.as_dict_mut().ok())
        .ok_or_else(|| ExhibitError::Pdf(format!("page object {page_id:?} is not a dictionary")))?;
    page_dict.set("Resources", Object::Dictionary(resources));
    Ok(())
}
