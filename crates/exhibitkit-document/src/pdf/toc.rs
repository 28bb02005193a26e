// SPDX-License-Identifier: MIT
//
// Table-of-contents rendering with `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: pages are `PdfPage` structs built
// from `Vec<Op>` operation lists and serialised via `PdfDocument::save()`.
// The TOC is a pure rendering of the manifest; row order mirrors the
// record sequence exactly and carries no ordering logic of its own.

use chrono::{DateTime, Utc};
use exhibitkit_core::error::Result;
use exhibitkit_core::types::{CaseMetadata, ExhibitRecord};
use printpdf::{
    BuiltinFont, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Pt, TextItem,
};
use tracing::{debug, instrument};

/// US Letter in millimetres.
const PAGE_W: Mm = Mm(215.9);
const PAGE_H: Mm = Mm(279.4);

/// 1 inch margins, matching the package's legal-document layout.
const MARGIN_PT: f32 = 72.0;

/// Titles longer than this are truncated with an ellipsis marker. Purely
/// cosmetic; the underlying record keeps the full title.
const TITLE_BUDGET: usize = 50;

/// One laid-out line of the TOC.
struct TocLine {
    text: String,
    font: BuiltinFont,
    size: f32,
    centered: bool,
    /// Vertical space consumed by this line, in points.
    advance: f32,
}

impl TocLine {
    fn title(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: BuiltinFont::HelveticaBold,
            size: 20.0,
            centered: true,
            advance: 26.0,
        }
    }

    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: BuiltinFont::Helvetica,
            size: 11.0,
            centered: false,
            advance: 15.0,
        }
    }

    fn row(text: impl Into<String>, bold: bool) -> Self {
        Self {
            text: text.into(),
            // Courier keeps the columns aligned.
            font: if bold {
                BuiltinFont::CourierBold
            } else {
                BuiltinFont::Courier
            },
            size: 9.0,
            centered: false,
            advance: 13.0,
        }
    }

    fn gap(points: f32) -> Self {
        Self {
            text: String::new(),
            font: BuiltinFont::Helvetica,
            size: 0.0,
            centered: false,
            advance: points,
        }
    }
}

/// Render a table-of-contents document for the given exhibit records.
///
/// Contains a title block, a case-information block, and one row per
/// record (label, truncated title, page count or failure status). Rows
/// paginate automatically onto additional pages.
#[instrument(skip_all, fields(records = records.len()))]
pub fn generate_toc(
    records: &[ExhibitRecord],
    case: &CaseMetadata,
    generated_at: DateTime<Utc>,
) -> Result<Vec<u8>> {
    let lines = layout_lines(records, case, generated_at);

    let mut doc = PdfDocument::new("Exhibit Package - Table of Contents");
    let page_h_pt = PAGE_H.into_pt().0;
    let page_w_pt = PAGE_W.into_pt().0;
    let bottom_limit = MARGIN_PT;

    let mut pages: Vec<PdfPage> = Vec::new();
    let mut ops: Vec<Op> = Vec::new();
    let mut cursor_y = page_h_pt - MARGIN_PT;

    for line in &lines {
        if cursor_y - line.advance < bottom_limit {
            pages.push(PdfPage::new(PAGE_W, PAGE_H, std::mem::take(&mut ops)));
            cursor_y = page_h_pt - MARGIN_PT;
        }
        cursor_y -= line.advance;
        if line.text.is_empty() {
            continue;
        }

        let x = if line.centered {
            // Average glyph width is roughly half the font size.
            let estimated = line.text.chars().count() as f32 * 0.5 * line.size;
            ((page_w_pt - estimated) / 2.0).max(MARGIN_PT)
        } else {
            MARGIN_PT
        };

        ops.push(Op::StartTextSection);
        ops.push(Op::SetTextCursor {
            pos: Point {
                x: Pt(x),
                y: Pt(cursor_y),
            },
        });
        ops.push(Op::SetFontSizeBuiltinFont {
            size: Pt(line.size),
            font: line.font,
        });
        ops.push(Op::WriteTextBuiltinFont {
            items: vec![TextItem::Text(line.text.clone())],
            font: line.font,
        });
        ops.push(Op::EndTextSection);
    }
    pages.push(PdfPage::new(PAGE_W, PAGE_H, ops));

    doc.with_pages(pages);
    debug!(pages = doc.pages.len(), "TOC layout complete");

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    Ok(doc.save(&PdfSaveOptions::default(), &mut warnings))
}

fn layout_lines(
    records: &[ExhibitRecord],
    case: &CaseMetadata,
    generated_at: DateTime<Utc>,
) -> Vec<TocLine> {
    let mut lines = Vec::new();

    lines.push(TocLine::title("EXHIBIT PACKAGE"));
    lines.push(TocLine::title("TABLE OF CONTENTS"));
    lines.push(TocLine::gap(20.0));

    if !case.visa_type.is_empty() {
        lines.push(TocLine::info(format!("Visa Type: {}", case.visa_type)));
    }
    if !case.case_name.is_empty() {
        lines.push(TocLine::info(format!("Case: {}", case.case_name)));
    }
    if let Some(beneficiary) = &case.beneficiary_name {
        lines.push(TocLine::info(format!("Beneficiary: {beneficiary}")));
    }
    lines.push(TocLine::info(format!(
        "Generated: {}",
        generated_at.format("%B %d, %Y")
    )));
    lines.push(TocLine::info(format!("Total Exhibits: {}", records.len())));
    lines.push(TocLine::gap(24.0));

    lines.push(TocLine::row(
        format!("{:<12} {:<52} {:>8}", "Exhibit", "Title", "Pages"),
        true,
    ));
    for record in records {
        let status = if record.error.is_some() {
            "failed".to_string()
        } else {
            record.page_count.to_string()
        };
        lines.push(TocLine::row(
            format!(
                "{:<12} {:<52} {:>8}",
                format!("Exhibit {}", record.label),
                truncate_title(&record.title, TITLE_BUDGET),
                status
            ),
            false,
        ));
    }

    lines
}

/// Truncate at a character budget with an ellipsis marker, respecting
/// UTF-8 boundaries.
fn truncate_title(title: &str, budget: usize) -> String {
    if title.chars().count() <= budget {
        return title.to_string();
    }
    let mut truncated: String = title.chars().take(budget).collect();
    truncated.push_str("...");
    truncated
}
