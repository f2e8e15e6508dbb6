//! Core engine: candidate building, enrichment, selection, and the run
//! that ties them together.

pub mod candidates;
pub mod enricher;
pub mod selector;
pub mod accountant;
pub mod job;
