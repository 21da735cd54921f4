use std::ffi::OsString;

use super::*;
use crate::error::ExecuteError;

fn strings(args: &[OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

fn window(args: &[String], pair: [&str; 2]) -> bool {
    args.windows(2).any(|w| w[0] == pair[0] && w[1] == pair[1])
}

#[test]
fn cd_format_forces_sample_layout() {
    let job = EncodeJob::new("in.flac", "out.wav", TargetFormat::CdWav);
    assert_eq!(job.sample_rate, Some(44_100));
    assert_eq!(job.channels, Some(2));

    let args = strings(&FfmpegEncoder::default().args(&job, true));
    assert!(window(&args, ["-c:a", "pcm_s16le"]));
    assert!(window(&args, ["-f", "wav"]));
    assert!(window(&args, ["-ar", "44100"]));
    assert!(window(&args, ["-ac", "2"]));
    assert_eq!(args.last().map(String::as_str), Some("out.wav"));
}

#[test]
fn split_offsets_and_mapped_tags() {
    let mut job = EncodeJob::new("image.ape", "01 - Song.mp3", TargetFormat::Mp3);
    job.start_ms = Some(157_546);
    job.duration_ms = Some(5);
    job.threads = Some(2);

    let args = strings(&FfmpegEncoder::default().args(&job, true));
    assert!(window(&args, ["-threads", "2"]));
    assert!(window(&args, ["-i", "image.ape"]));
    assert!(window(&args, ["-ss", "157.546"]));
    assert!(window(&args, ["-t", "0.005"]));
    assert!(window(&args, ["-map", "0:a:0"]));
    assert!(window(&args, ["-map_metadata", "0"]));
    assert!(window(&args, ["-id3v2_version", "3"]));
    assert!(!args.iter().any(|a| a == "-ar"));
}

#[test]
fn explicit_tags_replace_mapping() {
    let job = EncodeJob::new("a.flac", "b.flac", TargetFormat::Flac)
        .tag("title", "Song")
        .tag("artist", "  ")
        .tag("album", "Record");
    assert_eq!(job.tags.len(), 2);

    let args = strings(&FfmpegEncoder::default().args(&job, false));
    assert!(window(&args, ["-map_metadata", "-1"]));
    assert!(window(&args, ["-metadata", "title=Song"]));
    assert!(window(&args, ["-metadata", "album=Record"]));
    assert!(!args.iter().any(|a| a.starts_with("artist=")));
}

#[test]
fn format_names_parse() {
    assert_eq!("flac".parse::<TargetFormat>().unwrap(), TargetFormat::Flac);
    assert_eq!("wav-cd".parse::<TargetFormat>().unwrap(), TargetFormat::CdWav);
    assert_eq!("cd".parse::<TargetFormat>().unwrap(), TargetFormat::CdWav);
    assert_eq!(TargetFormat::Alac.extension(), "m4a");
    assert!("opus".parse::<TargetFormat>().is_err());
}

#[test]
fn missing_binary_is_an_io_failure() {
    let job = EncodeJob::new("a.flac", "b.wav", TargetFormat::Wav);
    let err = FfmpegEncoder::new("/nonexistent/reshelf-ffmpeg")
        .encode(&job)
        .unwrap_err();
    assert!(matches!(err, ExecuteError::Io { action: "spawn", .. }));
}

#[cfg(unix)]
#[test]
fn failed_mapped_attempt_retries_with_explicit_tags() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("fake-ffmpeg");
    std::fs::write(
        &script,
        "#!/bin/sh\nfor a in \"$@\"; do last=\"$a\"; done\ncase \"$*\" in *\"-map_metadata 0\"*) echo 'bad tags' >&2; exit 1;; esac\necho encoded > \"$last\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let target = dir.path().join("out.flac");
    let job = EncodeJob::new(dir.path().join("in.flac"), &target, TargetFormat::Flac);
    FfmpegEncoder::new(&script).encode(&job).unwrap();
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "encoded\n");

    let mut strict = job.clone();
    strict.map_metadata = false;
    std::fs::remove_file(&target).unwrap();
    FfmpegEncoder::new(&script).encode(&strict).unwrap();
    assert!(target.exists());
}

#[cfg(unix)]
#[test]
fn non_zero_exit_reports_last_stderr_line() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("fail");
    std::fs::write(&script, "#!/bin/sh\necho first >&2\necho 'Invalid data found' >&2\nexit 3\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut job = EncodeJob::new("a", "b", TargetFormat::Flac);
    job.map_metadata = false;
    match FfmpegEncoder::new(&script).encode(&job) {
        Err(ExecuteError::Encoder(reason)) => assert!(reason.contains("Invalid data found")),
        other => panic!("unexpected result: {other:?}"),
    }
}
