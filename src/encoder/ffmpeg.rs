use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use super::Encoder;
use super::job::EncodeJob;
use crate::error::ExecuteError;

/// Encoder driving an `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegEncoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }

    /// Command line for one attempt. `map_metadata` selects between copying
    /// the source tags and writing the job's explicit tags.
    pub fn args(&self, job: &EncodeJob, map_metadata: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-y", "-hide_banner", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();
        if let Some(threads) = job.threads {
            args.push("-threads".into());
            args.push(threads.to_string().into());
        }
        args.push("-i".into());
        args.push(job.source.clone().into_os_string());

        if let Some(start) = job.start_ms {
            args.push("-ss".into());
            args.push(seconds(start).into());
        }
        if let Some(duration) = job.duration_ms {
            args.push("-t".into());
            args.push(seconds(duration).into());
        }
        args.push("-map".into());
        args.push("0:a:0".into());

        if map_metadata {
            args.push("-map_metadata".into());
            args.push("0".into());
            if job.format.extension() == "mp3" {
                args.push("-id3v2_version".into());
                args.push("3".into());
            }
        } else {
            args.push("-map_metadata".into());
            args.push("-1".into());
            for (key, value) in &job.tags {
                args.push("-metadata".into());
                args.push(format!("{key}={value}").into());
            }
        }

        if let Some(rate) = job.sample_rate {
            args.push("-ar".into());
            args.push(rate.to_string().into());
        }
        if let Some(channels) = job.channels {
            args.push("-ac".into());
            args.push(channels.to_string().into());
        }
        args.push("-c:a".into());
        args.push(job.format.codec().into());
        args.push("-f".into());
        args.push(job.format.muxer().into());
        args.push(job.target.clone().into_os_string());
        args
    }

    fn run(&self, job: &EncodeJob, map_metadata: bool) -> Result<(), ExecuteError> {
        let args = self.args(job, map_metadata);
        debug!(binary = %self.binary.display(), ?args, "running encoder");
        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ExecuteError::io("spawn", &self.binary, e))?;
        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("no diagnostic output")
            .trim()
            .to_string();
        Err(ExecuteError::Encoder(format!("{}: {reason}", output.status)))
    }
}

impl Encoder for FfmpegEncoder {
    /// Tag mapping fails on some damaged sources, so a failed mapped attempt
    /// is retried once with explicit tags.
    fn encode(&self, job: &EncodeJob) -> Result<(), ExecuteError> {
        match self.run(job, job.map_metadata) {
            Err(ExecuteError::Encoder(reason)) if job.map_metadata => {
                warn!(
                    source = %job.source.display(),
                    %reason,
                    "encode with mapped tags failed, retrying with explicit tags"
                );
                if job.target.exists() {
                    fs::remove_file(&job.target)
                        .map_err(|e| ExecuteError::io("remove partial", &job.target, e))?;
                }
                self.run(job, false)
            }
            other => other,
        }
    }
}

fn seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}
