use super::{
    AlbumDirNormalizeStrategy, ArchiveNormalizeStrategy, CleanupStrategy, ConvertStrategy,
    CueRenameStrategy, CueSplitStrategy, MigrateStrategy, RenameStrategy, TrackNumberStrategy,
    TypeFixStrategy,
};
use crate::condition::StageGate;
use crate::config::{ConfigStore, PipelineSettings, StageName};
use crate::error::ExecuteError;
use crate::pipeline::{AnalyzeContext, Pipeline, Strategy, TargetScope};
use crate::record::ChangeRecord;

/// The closed set of strategies a pipeline can be built from.
#[derive(Debug, Clone)]
pub enum Stage {
    Rename(RenameStrategy),
    Migrate(MigrateStrategy),
    Convert(ConvertStrategy),
    CueSplit(CueSplitStrategy),
    TrackNumber(TrackNumberStrategy),
    AlbumDirNormalize(AlbumDirNormalizeStrategy),
    CueRename(CueRenameStrategy),
    Cleanup(CleanupStrategy),
    ArchiveNormalize(ArchiveNormalizeStrategy),
    TypeFix(TypeFixStrategy),
}

impl Stage {
    /// A stage with default parameters.
    pub fn from_name(name: StageName) -> Self {
        match name {
            StageName::Rename => Stage::Rename(RenameStrategy::default()),
            StageName::Migrate => Stage::Migrate(MigrateStrategy::default()),
            StageName::Convert => Stage::Convert(ConvertStrategy::default()),
            StageName::CueSplit => Stage::CueSplit(CueSplitStrategy::default()),
            StageName::TrackNumber => Stage::TrackNumber(TrackNumberStrategy::default()),
            StageName::AlbumDirNormalize => {
                Stage::AlbumDirNormalize(AlbumDirNormalizeStrategy::default())
            }
            StageName::CueRename => Stage::CueRename(CueRenameStrategy::default()),
            StageName::Cleanup => Stage::Cleanup(CleanupStrategy::default()),
            StageName::ArchiveNormalize => {
                Stage::ArchiveNormalize(ArchiveNormalizeStrategy::default())
            }
            StageName::TypeFix => Stage::TypeFix(TypeFixStrategy::default()),
        }
    }
}

macro_rules! dispatch {
    ($self:expr, $s:ident => $body:expr) => {
        match $self {
            Stage::Rename($s) => $body,
            Stage::Migrate($s) => $body,
            Stage::Convert($s) => $body,
            Stage::CueSplit($s) => $body,
            Stage::TrackNumber($s) => $body,
            Stage::AlbumDirNormalize($s) => $body,
            Stage::CueRename($s) => $body,
            Stage::Cleanup($s) => $body,
            Stage::ArchiveNormalize($s) => $body,
            Stage::TypeFix($s) => $body,
        }
    };
}

impl Strategy for Stage {
    fn name(&self) -> &'static str {
        dispatch!(self, s => s.name())
    }

    fn target_scope(&self) -> TargetScope {
        dispatch!(self, s => s.target_scope())
    }

    fn preferred_threads(&self) -> Option<usize> {
        dispatch!(self, s => s.preferred_threads())
    }

    fn gate(&self) -> &StageGate {
        dispatch!(self, s => s.gate())
    }

    fn analyze(&self, inputs: &[ChangeRecord], ctx: &AnalyzeContext<'_>) -> Vec<ChangeRecord> {
        dispatch!(self, s => s.analyze(inputs, ctx))
    }

    fn execute(&self, record: &ChangeRecord) -> Result<(), ExecuteError> {
        dispatch!(self, s => s.execute(record))
    }

    fn load_config(&mut self, store: &ConfigStore, scope: &str) {
        dispatch!(self, s => s.load_config(store, scope))
    }

    fn save_config(&self, store: &mut ConfigStore, scope: &str) {
        dispatch!(self, s => s.save_config(store, scope))
    }
}

impl Pipeline<Stage> {
    /// Stages named in the settings, in order, with default parameters.
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        let stages = settings.stages.iter().copied().map(Stage::from_name).collect();
        Pipeline::new(stages)
            .with_default_threads(settings.default_threads)
            .with_parallel_analyze(settings.parallel_analyze)
    }
}
