//! Corpus adapter and export pipeline for the BioNLP Shared Task 2009.
//!
//! This crate ties together archive download, brat parsing, and the
//! knowledge-base transform into the dataset adapter and an end-to-end
//! `build_dataset` workflow.

pub mod adapter;
pub mod export;
pub mod features;
pub mod kb;
pub mod pipeline;

pub use adapter::{
    BioNlpSharedTask2009, BuilderConfig, DatasetInfo, Example, Examples, SplitGenerator,
    standardize_argument_roles, standardize_role,
};
pub use kb::{KbDocument, brat_to_kb};
