//! File predicates: single conditions, AND groups and OR-combined stage gates.

mod group;
mod kind;
mod model;

pub use group::{ConditionGroup, StageGate};
pub use kind::ConditionKind;
pub use model::{Condition, Subject, ARCHIVE_EXTENSIONS, AUDIO_EXTENSIONS, extension_of, is_audio_name};
