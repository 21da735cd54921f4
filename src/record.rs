//! Planned operations threaded through the pipeline.

mod lineage;
mod model;

pub use lineage::Lineage;
pub use model::{ChangeRecord, ExecStatus, OpKind, RecordId};
pub(crate) use model::file_name_of;

#[cfg(test)]
mod tests;
