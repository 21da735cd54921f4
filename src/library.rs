//! Enumerates the items handed to the pipeline.

mod scan;

pub use scan::scan;
