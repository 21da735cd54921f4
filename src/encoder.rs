//! External audio encoder collaborator.

mod ffmpeg;
mod format;
mod job;

pub use ffmpeg::FfmpegEncoder;
pub use format::TargetFormat;
pub use job::EncodeJob;

use crate::error::ExecuteError;

/// Runs one encode to completion. Not preemptible: cancellation is only
/// observed between jobs.
pub trait Encoder: Send + Sync {
    fn encode(&self, job: &EncodeJob) -> Result<(), ExecuteError>;
}

#[cfg(test)]
mod tests;
