//! sigmatch-core
//!
//! Core library for identifying stripped functions in a compiled binary by
//! matching it against a corpus of signatures extracted from known libraries.
//!
//! This crate defines the signature model, the corpus builder, the signature
//! database with its snapshot persistence, and the matching pipeline
//! (consolidation and post-processing of candidate maps).
//!
//! All substantive logic lives here so it is fully testable and reusable from
//! multiple frontends.

pub mod corpus;
pub mod db;
pub mod matching;
pub mod model;
pub mod services;
