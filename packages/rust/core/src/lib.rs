//! Core pipeline orchestration and domain logic for bandmerge.
//!
//! This crate ties together discovery, layer loading, batching, triplet
//! ordering and the external merge engine into one sequential run
//! (see [`pipeline::generate_merged_files`]).

pub mod batch;
pub mod layers;
pub mod merge;
pub mod ordering;
pub mod pipeline;
