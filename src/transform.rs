//! Text-rewrite rules applied to file and directory names.

mod action;
mod initial;
mod rule;
mod script;

pub use action::{RenameAction, RenameScope};
pub use initial::{first_valid_char, initial_of};
pub use rule::TransformRule;
pub use script::{PassThrough, ScriptConverter};
pub(crate) use rule::split_extension;
