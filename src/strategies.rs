//! The closed set of pipeline stages.

mod album_dir;
mod archive;
mod cleanup;
mod convert;
mod cue_rename;
mod cue_split;
mod fsops;
mod keys;
mod migrate;
mod output;
mod rename;
mod stage;
mod track_number;
mod type_fix;

pub use album_dir::AlbumDirNormalizeStrategy;
pub use archive::{ArchiveEngine, ArchiveNormalizeStrategy, ExtractDirMode};
pub use cleanup::{CleanupMode, CleanupStrategy};
pub use convert::ConvertStrategy;
pub use cue_rename::CueRenameStrategy;
pub use cue_split::CueSplitStrategy;
pub use migrate::MigrateStrategy;
pub use output::{OutputDirMode, OutputOptions};
pub use rename::{RenameStrategy, TransferMode};
pub use stage::Stage;
pub use track_number::TrackNumberStrategy;
pub use type_fix::{TypeFixStrategy, detect_extension};

#[cfg(test)]
mod tests;
