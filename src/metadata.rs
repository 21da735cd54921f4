//! Artist/album/title/year/track resolution.
//!
//! Embedded tags are preferred; when they are missing or look garbled the
//! resolver falls back to what the file and directory names say.

mod infer;
mod model;
mod reader;
mod resolver;
mod template;

pub use infer::extract_from_file_system;
pub use model::AudioMeta;
pub use reader::{ContainerKind, LoftyTagReader, TagReader};
pub use resolver::{MetadataResolver, is_garbled};
pub use template::format;
