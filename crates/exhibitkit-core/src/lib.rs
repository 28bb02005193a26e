// SPDX-License-Identifier: MIT
//
// exhibitkit: core types and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod types;

pub use config::PipelineConfig;
pub use error::ExhibitError;
pub use types::*;
