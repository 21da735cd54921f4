//! Plan-then-apply batch reorganization of music collections.
//!
//! A [`pipeline::Pipeline`] runs an ordered list of [`strategies::Stage`]s
//! over a scanned file list. Analysis produces a reviewable
//! [`pipeline::Plan`] without touching the filesystem; execution applies it
//! record by record.

pub mod condition;
pub mod config;
pub mod cue;
pub mod encoder;
pub mod error;
pub mod library;
pub mod logging;
pub mod metadata;
pub mod pipeline;
pub mod record;
pub mod strategies;
pub mod transform;
