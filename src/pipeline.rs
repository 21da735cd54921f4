//! Ordered stages turning a file list into planned records, then applying
//! them to disk.

mod cancel;
mod engine;
mod lock;
mod plan;
mod progress;
mod strategy;

pub use cancel::CancelFlag;
pub use engine::Pipeline;
pub use lock::{LockGuard, LockTable};
pub use plan::{ExecutionReport, Plan, RecordOutcome};
pub use progress::{LogProgress, NoProgress, ProgressCounter, ProgressReporter};
pub use strategy::{AnalyzeContext, Strategy, TargetScope};
