use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::tempdir;
use walkdir::WalkDir;

use super::fsops::{move_path, remove_if_empty, sanitize_component};
use super::*;
use crate::condition::{Condition, ConditionGroup, ConditionKind, StageGate};
use crate::config::{ConfigStore, PipelineSettings, StageName};
use crate::encoder::{EncodeJob, Encoder, TargetFormat};
use crate::error::{ExecuteError, MetadataError};
use crate::metadata::{AudioMeta, MetadataResolver, TagReader};
use crate::pipeline::{ExecutionReport, NoProgress, Pipeline, Plan, Strategy, TargetScope};
use crate::record::{ExecStatus, OpKind, RecordId};
use crate::transform::{RenameAction, TransformRule};

struct FixedTags(Option<AudioMeta>);

impl TagReader for FixedTags {
    fn read(&self, _path: &Path) -> Result<AudioMeta, MetadataError> {
        self.0.clone().ok_or(MetadataError::NoTag)
    }
}

fn names_only() -> MetadataResolver {
    MetadataResolver::new(Arc::new(FixedTags(None)))
}

fn tagged(artist: &str, album: &str, year: &str) -> MetadataResolver {
    MetadataResolver::new(Arc::new(FixedTags(Some(AudioMeta {
        artist: artist.to_string(),
        album: album.to_string(),
        year: year.to_string(),
        title: "Some Title".to_string(),
        ..AudioMeta::default()
    }))))
}

/// Writes a marker file instead of encoding and remembers every job.
#[derive(Default)]
struct RecordingEncoder {
    jobs: Mutex<Vec<EncodeJob>>,
}

impl RecordingEncoder {
    fn jobs(&self) -> Vec<EncodeJob> {
        self.jobs.lock().unwrap().clone()
    }
}

impl Encoder for RecordingEncoder {
    fn encode(&self, job: &EncodeJob) -> Result<(), ExecuteError> {
        fs::write(&job.target, b"encoded").map_err(|e| ExecuteError::io("write", &job.target, e))?;
        self.jobs.lock().unwrap().push(job.clone());
        Ok(())
    }
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"data").unwrap();
}

/// Every file and directory below `root`, root excluded.
fn tree(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap().into_path())
        .collect();
    paths.sort();
    paths
}

fn plan_with<S: Strategy>(stage: S, root: &Path) -> (Pipeline<S>, Plan) {
    let pipeline = Pipeline::new(vec![stage]).with_parallel_analyze(false);
    let plan = pipeline.analyze(&tree(root), &[root.to_path_buf()], &NoProgress);
    (pipeline, plan)
}

fn run<S: Strategy>(stage: S, root: &Path) -> (Plan, ExecutionReport) {
    let (pipeline, mut plan) = plan_with(stage, root);
    let report = pipeline.execute(&mut plan);
    (plan, report)
}

fn gate(kind: ConditionKind, value: &str) -> StageGate {
    StageGate::new().with_group(ConditionGroup::new().with(Condition::new(kind, value)))
}

#[test]
fn sanitize_replaces_reserved_characters() {
    assert_eq!(sanitize_component(r#"AC/DC: "Live" <1991>?"#), "AC_DC_ _Live_ _1991__");
    assert_eq!(sanitize_component("plain name"), "plain name");
}

#[test]
fn move_refuses_to_overwrite_and_cleans_empty_dirs() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("sub").join("a.txt");
    let b = dir.path().join("b.txt");
    touch(&a);
    touch(&b);

    assert!(matches!(
        move_path(&a, &b, false),
        Err(ExecuteError::TargetExists(_))
    ));
    assert!(a.exists());

    move_path(&a, &b, true).unwrap();
    assert!(!a.exists());
    assert!(remove_if_empty(&dir.path().join("sub")));
    assert!(!remove_if_empty(dir.path()));

    assert!(matches!(
        move_path(&a, &b, false),
        Err(ExecuteError::MissingSource(_))
    ));
}

#[test]
fn output_dir_follows_mode() {
    let mut opts = OutputOptions::new("Convert");
    opts.format = TargetFormat::Flac;
    let src = Path::new("/music/album");

    assert_eq!(opts.output_dir(src), src.join("Convert - FLAC"));

    opts.dir_mode = OutputDirMode::SameDir;
    assert_eq!(opts.output_dir(src), src);

    opts.dir_mode = OutputDirMode::Relative;
    opts.relative_path = "../converted".to_string();
    assert_eq!(opts.output_dir(src), src.join("../converted"));

    opts.relative_path = "/out".to_string();
    assert_eq!(opts.output_dir(src), PathBuf::from("/out"));
}

#[test]
fn staging_path_prefers_existing_staging_dir() {
    let dir = tempdir().unwrap();
    let target = Path::new("/music/out/01 - A.flac");
    let mut opts = OutputOptions::new("Convert");

    assert_eq!(
        opts.staging_path(target, RecordId(3)),
        Some(PathBuf::from("/music/out/01 - A.flac.temp"))
    );

    opts.staging_dir = Some(dir.path().to_path_buf());
    assert_eq!(
        opts.staging_path(target, RecordId(3)),
        Some(dir.path().join("reshelf-3-01 - A.flac"))
    );

    opts.staging_dir = None;
    opts.temp_suffix = false;
    assert_eq!(opts.staging_path(target, RecordId(3)), None);
}

#[test]
fn rename_applies_rules_in_order() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("my_song.mp3"));
    touch(&root.join("untouched.mp3"));

    let stage = RenameStrategy::new(vec![
        TransformRule::new(RenameAction::ReplaceText, "_", " "),
        TransformRule::new(RenameAction::ToUpper, "", ""),
    ]);
    let (plan, report) = run(stage, root);

    let changed: Vec<&str> = plan.records().iter().map(|r| r.new_name.as_str()).collect();
    assert_eq!(changed, vec!["MY SONG.mp3", "UNTOUCHED.mp3"]);
    assert_eq!(report.succeeded, 2);
    assert!(root.join("MY SONG.mp3").exists());
    assert!(!root.join("my_song.mp3").exists());
}

#[test]
fn rename_with_separator_moves_or_copies() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("Artist-Song.mp3"));

    let mut stage = RenameStrategy::new(vec![TransformRule::new(
        RenameAction::ReplaceText,
        "-",
        "/",
    )]);
    stage.transfer = TransferMode::Copy;
    let (plan, report) = run(stage.clone(), root);
    assert_eq!(plan.records()[0].op, OpKind::Copy);
    assert_eq!(report.succeeded, 1);
    assert!(root.join("Artist").join("Song.mp3").exists());
    assert!(root.join("Artist-Song.mp3").exists());

    fs::remove_dir_all(root.join("Artist")).unwrap();
    stage.transfer = TransferMode::Move;
    let (plan, _) = run(stage, root);
    assert_eq!(plan.records()[0].op, OpKind::Move);
    assert!(root.join("Artist").join("Song.mp3").exists());
    assert!(!root.join("Artist-Song.mp3").exists());
}

#[test]
fn rename_into_existing_name_fails_without_touching_source() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("a_b.mp3"));
    touch(&root.join("a b.mp3"));

    let stage = RenameStrategy::new(vec![TransformRule::new(RenameAction::ReplaceText, "_", " ")]);
    let (plan, report) = run(stage, root);

    assert_eq!(report.failed, 1);
    assert_eq!(plan.records()[0].status, ExecStatus::Failed);
    assert!(plan.records()[0].fail_reason.as_deref().unwrap().contains("already exists"));
    assert!(root.join("a_b.mp3").exists());
}

#[test]
fn rename_scope_config_selects_folders() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("old_dir").join("old_file.mp3"));

    let mut store = ConfigStore::new();
    store.set("arn_scope", "FOLDERS");
    store.set("arn_rule_count", 1);
    store.set("arn_rule_0_action", "REPLACE_TEXT");
    store.set("arn_rule_0_find", "old_");
    store.set("arn_rule_0_replace", "new_");

    let mut stage = RenameStrategy::default();
    stage.load_config(&store, "");
    assert_eq!(stage.rules.len(), 1);

    let (_, plan) = plan_with(stage, root);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.records()[0].planned_path, root.join("new_dir"));
}

#[test]
fn migrate_files_by_template_and_cleans_source() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let album = src.path().join("Artist X").join("2001 - Album Y");
    touch(&album.join("03 - Song.flac"));

    let stage = MigrateStrategy::new(dest.path()).with_resolver(names_only());
    let (plan, report) = run(stage, src.path());

    let expected = dest
        .path()
        .join("Artist X")
        .join("2001 Album Y")
        .join("03 - Song.flac");
    assert_eq!(plan.records()[0].planned_path, expected);
    assert_eq!(report.succeeded, 1);
    assert!(expected.exists());
    assert!(!album.exists());
}

#[test]
fn migrate_without_destination_plans_nothing() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("a.mp3"));
    let (_, plan) = plan_with(MigrateStrategy::default(), dir.path());
    assert!(plan.is_empty());
}

#[test]
fn convert_writes_into_sub_dir_through_staging() {
    let dir = tempdir().unwrap();
    let album = dir.path().join("album");
    touch(&album.join("song.mp3"));
    touch(&album.join("cover.jpg"));

    let encoder = Arc::new(RecordingEncoder::default());
    let mut stage = ConvertStrategy::new(encoder.clone()).with_resolver(names_only());
    stage.options.format = TargetFormat::Flac;
    let (plan, report) = run(stage, dir.path());

    let target = album.join("Convert - FLAC").join("song.flac");
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.records()[0].op, OpKind::Convert);
    assert_eq!(plan.records()[0].param("meta_title"), Some("song"));
    assert_eq!(report.succeeded, 1);
    assert!(target.exists());
    assert!(!album.join("Convert - FLAC").join("song.flac.temp").exists());
    assert!(album.join("song.mp3").exists());

    let jobs = encoder.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].source, album.join("song.mp3"));
    assert_eq!(jobs[0].target, album.join("Convert - FLAC").join("song.flac.temp"));
    assert!(jobs[0].map_metadata);
    assert_eq!(jobs[0].sample_rate, Some(44_100));
    assert_eq!(jobs[0].threads, Some(4));
    assert!(jobs[0].tags.iter().any(|(k, v)| k == "title" && v == "song"));
}

/// Writes part of the output, then fails.
struct BrokenEncoder;

impl Encoder for BrokenEncoder {
    fn encode(&self, job: &EncodeJob) -> Result<(), ExecuteError> {
        fs::write(&job.target, b"half").map_err(|e| ExecuteError::io("write", &job.target, e))?;
        Err(ExecuteError::Encoder("exit status 1".to_string()))
    }
}

#[test]
fn failed_convert_leaves_no_partial_output() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("song.flac"));

    let mut stage = ConvertStrategy::new(Arc::new(BrokenEncoder)).with_resolver(names_only());
    stage.options.format = TargetFormat::Wav;
    stage.options.dir_mode = OutputDirMode::SameDir;
    let (plan, report) = run(stage.clone(), dir.path());

    assert_eq!(report.failed, 1);
    assert_eq!(plan.records()[0].status, ExecStatus::Failed);
    assert!(!dir.path().join("song.wav.temp").exists());
    assert!(!dir.path().join("song.wav").exists());
    assert!(dir.path().join("song.flac").exists());

    stage.options.temp_suffix = false;
    let (_, report) = run(stage, dir.path());
    assert_eq!(report.failed, 1);
    assert!(!dir.path().join("song.wav").exists());
}

#[test]
fn convert_skips_existing_targets_unless_overwriting() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("song.flac"));
    touch(&dir.path().join("song.wav"));

    let mut stage = ConvertStrategy::new(Arc::new(RecordingEncoder::default()))
        .with_resolver(names_only());
    stage.options.format = TargetFormat::Wav;
    stage.options.dir_mode = OutputDirMode::SameDir;

    let (_, plan) = plan_with(stage.clone(), dir.path());
    assert!(plan.is_empty());

    stage.options.overwrite = true;
    let (_, plan) = plan_with(stage, dir.path());
    let sources: Vec<String> = plan.records().iter().map(|r| r.original_name.clone()).collect();
    assert_eq!(sources, vec!["song.flac"]);
}

const LIVE_SET: &str = "PERFORMER \"Band\"\r\nTITLE \"Live Set\"\r\nREM GENRE Rock\r\nREM DATE 1999\r\nFILE \"image.flac\" WAVE\r\n  TRACK 01 AUDIO\r\n    TITLE \"Intro\"\r\n    INDEX 01 00:00:00\r\n  TRACK 02 AUDIO\r\n    TITLE \"Song: Two\"\r\n    INDEX 01 01:30:00\r\n";

#[test]
fn cue_split_plans_one_record_per_track() {
    let dir = tempdir().unwrap();
    let album = dir.path().join("Live");
    fs::create_dir_all(&album).unwrap();
    fs::write(album.join("live.cue"), LIVE_SET).unwrap();
    touch(&album.join("image.flac"));

    let encoder = Arc::new(RecordingEncoder::default());
    let (plan, report) = run(CueSplitStrategy::new(encoder.clone()), dir.path());

    let out = album.join("Split - WAV");
    let targets: Vec<PathBuf> = plan.records().iter().map(|r| r.planned_path.clone()).collect();
    assert_eq!(
        targets,
        vec![out.join("01 - Intro.wav"), out.join("02 - Song_ Two.wav")]
    );
    let first = &plan.records()[0];
    assert_eq!(first.op, OpKind::Split);
    assert_eq!(first.param("start"), Some("0"));
    assert_eq!(first.param("duration"), Some("90000"));
    assert_eq!(first.param("meta_artist"), Some("Band"));
    assert_eq!(first.param("meta_genre"), Some("Rock"));
    assert_eq!(plan.records()[1].param("duration"), None);

    assert_eq!(report.succeeded, 2);
    assert!(out.join("01 - Intro.wav").exists());

    let mut jobs = encoder.jobs();
    jobs.sort_by(|a, b| a.target.cmp(&b.target));
    assert_eq!(jobs[0].source, album.join("image.flac"));
    assert_eq!(jobs[0].start_ms, None);
    assert_eq!(jobs[0].duration_ms, Some(90_000));
    assert_eq!(jobs[1].start_ms, Some(90_000));
    assert!(!jobs[0].map_metadata);
    assert_eq!(
        jobs[0].tags,
        vec![
            ("title".to_string(), "Intro".to_string()),
            ("artist".to_string(), "Band".to_string()),
            ("album".to_string(), "Live Set".to_string()),
            ("date".to_string(), "1999".to_string()),
            ("track".to_string(), "1".to_string()),
            ("genre".to_string(), "Rock".to_string()),
        ]
    );
}

#[test]
fn cue_split_skips_split_sheets_missing_images_and_existing_tracks() {
    let dir = tempdir().unwrap();
    let root = dir.path();

    let already = "FILE \"01.flac\" WAVE\n  TRACK 01 AUDIO\n    INDEX 01 00:00:00\nFILE \"02.flac\" WAVE\n  TRACK 02 AUDIO\n    INDEX 01 00:00:00\n";
    fs::write(root.join("already.cue"), already).unwrap();
    touch(&root.join("01.flac"));
    touch(&root.join("02.flac"));
    fs::write(root.join("orphan.cue"), LIVE_SET.replace("image.flac", "gone.flac")).unwrap();

    let (_, plan) = plan_with(CueSplitStrategy::default(), root);
    assert!(plan.is_empty());

    let album = tempdir().unwrap();
    fs::write(album.path().join("live.cue"), LIVE_SET).unwrap();
    touch(&album.path().join("image.flac"));
    touch(&album.path().join("Split - WAV").join("01 - Intro.wav"));
    let (_, plan) = plan_with(CueSplitStrategy::default(), album.path());
    let names: Vec<&str> = plan.records().iter().map(|r| r.new_name.as_str()).collect();
    assert_eq!(names, vec!["02 - Song_ Two.wav"]);
}

#[test]
fn numbered_name_strips_existing_numbers() {
    let s = TrackNumberStrategy::default();
    assert_eq!(s.numbered_name("03 c.mp3", 1, 2), "01. c.mp3");
    assert_eq!(s.numbered_name("Intro.flac", 12, 2), "12. Intro.flac");
    assert_eq!(s.numbered_name("07.flac", 2, 2), "02.flac");

    let plain = TrackNumberStrategy {
        pad: false,
        separator: " - ".to_string(),
        ..TrackNumberStrategy::default()
    };
    assert_eq!(plain.numbered_name("1_Song.mp3", 3, 0), "3 - Song.mp3");
}

#[test]
fn track_number_orders_each_directory_by_name() {
    let dir = tempdir().unwrap();
    let album = dir.path().join("album");
    for name in ["b.mp3", "A.mp3", "03 c.mp3", "cover.jpg"] {
        touch(&album.join(name));
    }
    touch(&dir.path().join("single").join("only.mp3"));

    let (plan, report) = run(TrackNumberStrategy::default(), dir.path());
    let mut renamed: Vec<(String, String)> = plan
        .records()
        .iter()
        .map(|r| (r.original_name.clone(), r.new_name.clone()))
        .collect();
    renamed.sort();
    assert_eq!(
        renamed,
        vec![
            ("03 c.mp3".to_string(), "01. c.mp3".to_string()),
            ("A.mp3".to_string(), "02. A.mp3".to_string()),
            ("b.mp3".to_string(), "03. b.mp3".to_string()),
        ]
    );
    assert_eq!(report.succeeded, 3);
    assert!(album.join("02. A.mp3").exists());
    assert!(dir.path().join("single").join("only.mp3").exists());
}

#[test]
fn album_name_takes_majority_and_collapses_blanks() {
    let s = AlbumDirNormalizeStrategy::default();
    let meta = |artist: &str, album: &str| AudioMeta {
        artist: artist.to_string(),
        album: album.to_string(),
        ..AudioMeta::default()
    };
    let tracks = [meta("B", "Rec"), meta("A", "Rec"), meta("A", "Other")];
    assert_eq!(s.album_name("dir", &tracks), "A - Rec");

    let tie = [meta("B", ""), meta("A", "")];
    assert_eq!(s.album_name("dir: one", &tie), "A - dir_ one");

    assert_eq!(s.album_name("dir", &[AudioMeta::default()]), "Unknown Artist - dir");
}

#[test]
fn album_dir_renames_from_track_tags() {
    let dir = tempdir().unwrap();
    let album = dir.path().join("old name");
    touch(&album.join("01.mp3"));
    touch(&album.join("02.mp3"));
    touch(&dir.path().join("empty").join("notes.txt"));

    let stage = AlbumDirNormalizeStrategy::default().with_resolver(tagged("Band", "Record", "2010"));
    let (plan, report) = run(stage, dir.path());

    assert_eq!(plan.len(), 1);
    assert_eq!(plan.records()[0].op, OpKind::AlbumRename);
    assert_eq!(report.succeeded, 1);
    assert!(dir.path().join("Band - 2010 - Record").join("01.mp3").exists());
    assert!(!album.exists());
}

#[test]
fn later_stages_follow_a_renamed_album_directory() {
    let dir = tempdir().unwrap();
    let album = dir.path().join("old name");
    touch(&album.join("a.mp3"));
    touch(&album.join("b.mp3"));

    let pipeline = Pipeline::new(vec![
        Stage::AlbumDirNormalize(
            AlbumDirNormalizeStrategy::default().with_resolver(tagged("Band", "Record", "2010")),
        ),
        Stage::TrackNumber(TrackNumberStrategy::default()),
    ])
    .with_parallel_analyze(false);
    let mut plan = pipeline.analyze(&tree(dir.path()), &[dir.path().to_path_buf()], &NoProgress);

    let renamed = dir.path().join("Band - 2010 - Record");
    let mut numbered: Vec<PathBuf> = plan
        .records()
        .iter()
        .filter(|r| r.op == OpKind::Rename)
        .map(|r| {
            assert_eq!(r.current_source().parent(), Some(renamed.as_path()));
            r.planned_path.clone()
        })
        .collect();
    numbered.sort();
    assert_eq!(
        numbered,
        vec![renamed.join("01. a.mp3"), renamed.join("02. b.mp3")]
    );

    let report = pipeline.execute(&mut plan);
    assert_eq!(report.failed, 0);
    assert_eq!(report.succeeded, 3);
    assert!(renamed.join("01. a.mp3").exists());
    assert!(renamed.join("02. b.mp3").exists());
    assert!(!album.exists());
}

#[test]
fn files_rename_before_their_directory_in_one_stage() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("old_dir").join("old_file.mp3"));

    let mut stage = RenameStrategy::new(vec![TransformRule::new(
        RenameAction::ReplaceText,
        "old_",
        "new_",
    )]);
    stage.scope = TargetScope::All;
    let (plan, report) = run(stage, root);

    assert_eq!(plan.len(), 2);
    assert_eq!(report.succeeded, 2);
    assert!(root.join("new_dir").join("new_file.mp3").exists());
}

#[test]
fn cue_rename_pairs_sheet_with_audio_and_rewrites_reference() {
    let dir = tempdir().unwrap();
    let disc = dir.path().join("disc");
    fs::create_dir_all(&disc).unwrap();
    fs::write(
        disc.join("Some Album.cue"),
        "TITLE \"X\"\nFILE \"Some Album.flac\" WAVE\n  TRACK 01 AUDIO\n    INDEX 01 00:00:00\n",
    )
    .unwrap();
    touch(&disc.join("Some Album.flac"));

    let (plan, report) = run(CueRenameStrategy::default(), dir.path());
    let mut names: Vec<&str> = plan.records().iter().map(|r| r.new_name.as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["album.cue", "album.flac"]);
    assert_eq!(report.succeeded, 2);

    let text = fs::read_to_string(disc.join("album.cue")).unwrap();
    assert!(text.contains("FILE \"album.flac\" WAVE"));
    assert!(disc.join("album.flac").exists());
}

#[test]
fn cue_rename_numbers_multiple_discs() {
    let s = CueRenameStrategy::default();
    assert_eq!(s.rank_name(0, 1), "album");
    assert_eq!(s.rank_name(0, 2), "albumdisk(1)");
    assert_eq!(s.rank_name(1, 2), "albumdisk(2)");

    let dir = tempdir().unwrap();
    let disc = dir.path().join("set");
    for stem in ["CD2", "cd1"] {
        fs::create_dir_all(&disc).unwrap();
        fs::write(
            disc.join(format!("{stem}.cue")),
            format!("FILE \"{stem}.wav\" WAVE\n  TRACK 01 AUDIO\n    INDEX 01 00:00:00\n"),
        )
        .unwrap();
        touch(&disc.join(format!("{stem}.wav")));
    }
    let (_, plan) = plan_with(CueRenameStrategy::default(), dir.path());
    let mut renamed: Vec<(String, String)> = plan
        .records()
        .iter()
        .map(|r| (r.original_name.clone(), r.new_name.clone()))
        .collect();
    renamed.sort();
    assert_eq!(
        renamed,
        vec![
            ("CD2.cue".to_string(), "albumdisk(2).cue".to_string()),
            ("CD2.wav".to_string(), "albumdisk(2).wav".to_string()),
            ("cd1.cue".to_string(), "albumdisk(1).cue".to_string()),
            ("cd1.wav".to_string(), "albumdisk(1).wav".to_string()),
        ]
    );
}

#[test]
fn cleanup_without_conditions_plans_nothing() {
    let dir = tempdir().unwrap();
    touch(&dir.path().join("a.log"));
    let (_, plan) = plan_with(CleanupStrategy::default(), dir.path());
    assert!(plan.is_empty());
}

#[test]
fn cleanup_deletes_or_recycles_matching_files() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("sub").join("a.log"));
    touch(&root.join("sub").join("b.flac"));

    let recycle = CleanupStrategy::new(gate(ConditionKind::ExtIn, "log"), CleanupMode::Recycle);
    let (plan, report) = run(recycle, root);
    let trashed = root.join(".reshelf-trash").join("sub").join("a.log");
    assert_eq!(plan.records()[0].op, OpKind::Delete);
    assert_eq!(plan.records()[0].planned_path, trashed);
    assert_eq!(report.succeeded, 1);
    assert!(trashed.exists());
    assert!(root.join("sub").join("b.flac").exists());

    touch(&root.join("sub").join("c.log"));
    let permanent = CleanupStrategy::new(gate(ConditionKind::ExtIn, "log"), CleanupMode::Permanent);
    let pipeline = Pipeline::new(vec![permanent]);
    let mut plan = pipeline.analyze(
        &[root.join("sub").join("c.log")],
        &[root.to_path_buf()],
        &NoProgress,
    );
    pipeline.execute(&mut plan);
    assert_eq!(plan.records()[0].status, ExecStatus::Success);
    assert!(!root.join("sub").join("c.log").exists());
}

#[test]
fn recycle_target_mirrors_deepest_root() {
    let mut s = CleanupStrategy::default();
    let roots = [PathBuf::from("/m"), PathBuf::from("/m/inner")];
    assert_eq!(
        s.recycle_target(Path::new("/m/inner/x/a.log"), &roots),
        PathBuf::from("/m/inner/.reshelf-trash/x/a.log")
    );

    s.recycle_dir = Some(PathBuf::from("/trash"));
    assert_eq!(
        s.recycle_target(Path::new("/elsewhere/a.log"), &roots),
        PathBuf::from("/trash/a.log")
    );
}

#[test]
fn pipeline_from_settings_keeps_stage_order_and_scopes_config() {
    let settings = PipelineSettings {
        stages: vec![StageName::Rename, StageName::Cleanup],
        ..PipelineSettings::default()
    };
    let mut pipeline = Pipeline::from_settings(&settings);
    let names: Vec<&str> = pipeline.stages().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["rename", "cleanup"]);

    let mut store = ConfigStore::new();
    store.set("s1_fcs_mode", "PERMANENT");
    store.set("s1_fcs_trash", "/trash");
    pipeline.load_config(&store);
    let Stage::Cleanup(cleanup) = &pipeline.stages()[1] else {
        panic!("second stage is not cleanup");
    };
    assert_eq!(cleanup.mode, CleanupMode::Permanent);
    assert_eq!(cleanup.recycle_dir, Some(PathBuf::from("/trash")));

    let mut saved = ConfigStore::new();
    pipeline.save_config(&mut saved);
    assert_eq!(saved.get("s1_fcs_mode"), Some("PERMANENT"));
    assert_eq!(saved.get("s0_arn_rule_count"), Some("0"));
}

#[test]
fn output_options_survive_a_store_round_trip() {
    let mut stage = ConvertStrategy::default();
    stage.options.format = TargetFormat::Mp3;
    stage.options.dir_mode = OutputDirMode::Relative;
    stage.options.relative_path = "../mp3".to_string();
    stage.options.sample_rate = None;
    stage.options.workers = 6;
    stage.options.staging_dir = Some(PathBuf::from("/tmp/stage"));
    stage.gate = gate(ConditionKind::IsAudio, "");

    let mut store = ConfigStore::new();
    stage.save_config(&mut store, "s2_");
    assert_eq!(store.get("s2_ac_sample_rate"), Some("ORIGINAL"));

    let mut loaded = ConvertStrategy::default();
    loaded.load_config(&store, "s2_");
    assert_eq!(loaded.options, stage.options);
    assert_eq!(loaded.gate.groups().len(), 1);
    assert_eq!(loaded.preferred_threads(), Some(6));
}

fn write_zip(path: &Path, entries: &[(&str, &[u8])]) {
    use std::io::Write;

    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(fs::File::create(path).unwrap());
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn archive_lifts_a_lone_top_folder_next_to_the_archive() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    let archive = root.join("dl").join("Album.zip");
    write_zip(
        &archive,
        &[("Band - Record/01.flac", b"one"), ("Band - Record/02.flac", b"two")],
    );

    let (plan, report) = run(ArchiveNormalizeStrategy::default(), root);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.records()[0].op, OpKind::Extract);
    assert_eq!(plan.records()[0].planned_path, root.join("dl").join("Album"));
    assert_eq!(report.succeeded, 1);

    let album = root.join("dl").join("Band - Record");
    assert_eq!(fs::read(album.join("01.flac")).unwrap(), b"one");
    assert!(album.join("02.flac").exists());
    assert!(!root.join("dl").join("Album").exists());
    assert!(archive.exists());
}

#[test]
fn archive_folder_named_like_the_archive_is_flattened_in_place() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_zip(
        &root.join("Album.zip"),
        &[("Album/a.mp3", b"a"), ("Album/.DS_Store", b""), ("Thumbs.db", b"")],
    );

    let strategy = ArchiveNormalizeStrategy {
        delete_on_success: true,
        ..ArchiveNormalizeStrategy::default()
    };
    let (_, report) = run(strategy, root);
    assert_eq!(report.succeeded, 1);
    assert!(root.join("Album").join("a.mp3").exists());
    assert!(!root.join("Album").join("Album").exists());
    assert!(!root.join("Album.zip").exists());
}

#[test]
fn archive_with_loose_files_stays_wrapped() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    write_zip(&root.join("mix.zip"), &[("a.mp3", b"a"), ("b.mp3", b"b")]);
    touch(&root.join("notes.txt"));

    let (plan, report) = run(ArchiveNormalizeStrategy::default(), root);
    assert_eq!(plan.len(), 1);
    assert_eq!(report.succeeded, 1);
    assert!(root.join("mix").join("a.mp3").exists());
    assert!(root.join("mix").join("b.mp3").exists());
}

#[test]
fn unreadable_archive_fails_and_leaves_no_empty_folder() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("broken.zip"), b"not a zip at all").unwrap();

    let (plan, report) = run(ArchiveNormalizeStrategy::default(), root);
    assert_eq!(report.failed, 1);
    assert!(plan.records()[0].fail_reason.is_some());
    assert!(root.join("broken.zip").exists());
    assert!(!root.join("broken").exists());

    let strategy = ArchiveNormalizeStrategy {
        delete_on_failure: true,
        ..ArchiveNormalizeStrategy::default()
    };
    let (_, report) = run(strategy, root);
    assert_eq!(report.failed, 1);
    assert!(!root.join("broken.zip").exists());
}

#[test]
fn archive_base_dir_follows_mode() {
    let mut s = ArchiveNormalizeStrategy::default();
    let archive = Path::new("/m/dl/set.7z");
    assert_eq!(s.base_dir(archive), PathBuf::from("/m/dl"));

    s.dir_mode = ExtractDirMode::Sibling;
    assert_eq!(s.base_dir(archive), PathBuf::from("/m/dl/Extracted_set.7z"));

    s.dir_mode = ExtractDirMode::Custom;
    assert_eq!(s.base_dir(archive), PathBuf::from("/m/dl/Unzipped"));
    s.custom_dir = PathBuf::from("/out");
    assert_eq!(s.base_dir(archive), PathBuf::from("/out"));
}

#[test]
fn archive_settings_survive_a_store_round_trip() {
    let stage = ArchiveNormalizeStrategy {
        engine: ArchiveEngine::External,
        tool: PathBuf::from("/usr/bin/7zz"),
        dir_mode: ExtractDirMode::Sibling,
        wrap: false,
        overwrite: true,
        passwords: vec!["first".to_string(), "second".to_string()],
        extensions: vec!["zip".to_string(), "rar".to_string()],
        ..ArchiveNormalizeStrategy::default()
    };
    let mut store = ConfigStore::new();
    stage.save_config(&mut store, "s0_");
    assert_eq!(store.get("s0_una_engine"), Some("EXTERNAL"));

    let mut loaded = ArchiveNormalizeStrategy::default();
    loaded.load_config(&store, "s0_");
    assert_eq!(loaded.engine, ArchiveEngine::External);
    assert_eq!(loaded.tool, PathBuf::from("/usr/bin/7zz"));
    assert_eq!(loaded.dir_mode, ExtractDirMode::Sibling);
    assert!(!loaded.wrap);
    assert!(loaded.overwrite);
    assert_eq!(loaded.passwords, vec!["first", "second"]);
    assert_eq!(loaded.extensions, vec!["zip", "rar"]);
}

const FLAC_HEADER: &[u8] = b"fLaC\x00\x00\x00\x22\x10\x00\x10\x00\x00\x00\x00\x00\x00\x00\x0a\xc4\x42\xf0\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00";
const WAV_HEADER: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt \x10\x00\x00\x00\x01\x00\x02\x00\x44\xac\x00\x00\x10\xb1\x02\x00\x04\x00\x10\x00data\x00\x00\x00\x00";

#[test]
fn content_decides_the_detected_extension() {
    let dir = tempdir().unwrap();
    let flac = dir.path().join("a.mp3");
    let wav = dir.path().join("b.bin");
    let other = dir.path().join("c.mp3");
    fs::write(&flac, FLAC_HEADER).unwrap();
    fs::write(&wav, WAV_HEADER).unwrap();
    fs::write(&other, b"plain text, no magic").unwrap();

    assert_eq!(detect_extension(&flac), Some("flac"));
    assert_eq!(detect_extension(&wav), Some("wav"));
    assert_eq!(detect_extension(&other), None);
    assert_eq!(detect_extension(&dir.path().join("missing.mp3")), None);
}

#[test]
fn type_fix_renames_audio_with_the_wrong_extension() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("song.mp3"), FLAC_HEADER).unwrap();
    fs::write(root.join("fine.wav"), WAV_HEADER).unwrap();
    fs::write(root.join("noise.mp3"), b"plain text, no magic").unwrap();
    fs::write(root.join("image.txt"), FLAC_HEADER).unwrap();

    let (plan, report) = run(TypeFixStrategy::default(), root);
    assert_eq!(plan.len(), 1);
    let rec = &plan.records()[0];
    assert_eq!(rec.op, OpKind::Rename);
    assert_eq!(rec.param("detected"), Some("flac"));
    assert_eq!(rec.param("was"), Some("mp3"));
    assert_eq!(report.succeeded, 1);
    assert!(root.join("song.flac").exists());
    assert!(!root.join("song.mp3").exists());
    assert!(root.join("image.txt").exists());

    let any_file = TypeFixStrategy {
        audio_only: false,
        ..TypeFixStrategy::default()
    };
    let (_, report) = run(any_file, root);
    assert_eq!(report.succeeded, 1);
    assert!(root.join("image.flac").exists());
}

#[test]
fn type_fix_leaves_a_taken_name_alone() {
    let dir = tempdir().unwrap();
    let root = dir.path();
    fs::write(root.join("song.mp3"), FLAC_HEADER).unwrap();
    fs::write(root.join("song.flac"), FLAC_HEADER).unwrap();

    let (_, plan) = plan_with(TypeFixStrategy::default(), root);
    assert!(plan.is_empty());
}

#[test]
fn type_fix_and_archive_stages_build_from_settings() {
    let settings = PipelineSettings {
        stages: vec![StageName::ArchiveNormalize, StageName::TypeFix],
        ..PipelineSettings::default()
    };
    let mut pipeline = Pipeline::from_settings(&settings);
    let names: Vec<&str> = pipeline.stages().iter().map(|s| s.name()).collect();
    assert_eq!(names, vec!["archive-normalize", "type-fix"]);

    let mut store = ConfigStore::new();
    store.set("s0_una_mode", "SIBLING");
    store.set("s1_tfx_audio_only", "false");
    pipeline.load_config(&store);
    let Stage::ArchiveNormalize(archive) = &pipeline.stages()[0] else {
        panic!("first stage is not archive-normalize");
    };
    assert_eq!(archive.dir_mode, ExtractDirMode::Sibling);
    let Stage::TypeFix(fix) = &pipeline.stages()[1] else {
        panic!("second stage is not type-fix");
    };
    assert!(!fix.audio_only);
}
