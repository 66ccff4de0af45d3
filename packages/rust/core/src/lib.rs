//! Retrieval-and-generation core for Mriynyk.
//!
//! This crate resolves a free-text query to a curriculum topic, assembles
//! that topic's pages in reading order, and drives schema-constrained
//! workbook generation over them (see [`pipeline::Pipeline`]).

pub mod assembler;
mod bounded;
pub mod directory;
pub mod disambiguator;
pub mod explain;
pub mod pipeline;
pub mod prompts;
pub mod resolver;
pub mod solver;
pub mod workbook;

#[cfg(test)]
mod testing;

pub use bounded::TimeBounded;
pub use pipeline::{AnswerResult, Pipeline, ProgressReporter, SilentProgress};
