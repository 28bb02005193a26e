// SPDX-License-Identifier: MIT
//
// exhibitkit: source ingestion, run-scoped scratch storage, and the
// synchronous exhibit pipeline orchestrator.

pub mod ingest;
pub mod pipeline;
pub mod scratch;

pub use ingest::ExhibitSource;
pub use pipeline::ExhibitPipeline;
pub use scratch::Scratch;
