// SPDX-License-Identifier: MIT
//
// exhibitkit: PDF binary manipulation: page annotation overlays, ordered
// merging, table-of-contents rendering, and the tiered compression engine.

pub mod compress;
pub mod pdf;

pub use compress::CompressionEngine;
pub use pdf::annotate::annotate_exhibit;
pub use pdf::merge::merge_documents;
pub use pdf::reader::page_count;
pub use pdf::toc::generate_toc;
