use std::fs;

use tempfile::tempdir;

use super::*;
use crate::error::CueParseError;

const ALBUM: &str = r#"REM GENRE Pop
REM DATE 2003
REM COMMENT "ExactAudioCopy v1.0"
PERFORMER "Jay Chou"
TITLE "Yeh Hui-Mei"
FILE "album.flac" WAVE
  TRACK 01 AUDIO
    TITLE "Track One"
    INDEX 01 00:00:00
  TRACK 02 AUDIO
    TITLE "Track Two"
    PERFORMER "Guest"
    INDEX 00 03:58:70
    INDEX 01 04:00:00
  TRACK 03 AUDIO
    TITLE "Track Three"
    INDEX 01 07:30:30
"#;

#[test]
fn cue_time_uses_75_frames_per_second() {
    assert_eq!(cue_time_to_ms("02:37:41").unwrap(), 157_546);
    assert_eq!(cue_time_to_ms("00:00:00").unwrap(), 0);
    assert_eq!(cue_time_to_ms("01:02").unwrap(), 62_000);
    assert!(cue_time_to_ms("aa:00:00").is_err());
    assert!(cue_time_to_ms("1:2:3:4").is_err());
}

#[test]
fn album_and_track_fields_bind_by_position() {
    let sheet = parse_str(ALBUM).unwrap();
    assert_eq!(sheet.album_title, "Yeh Hui-Mei");
    assert_eq!(sheet.album_performer, "Jay Chou");
    assert_eq!(sheet.album_file_name.as_deref(), Some("album.flac"));
    assert_eq!(sheet.all_files, vec!["album.flac"]);
    assert_eq!(sheet.genre(), Some("Pop"));
    assert_eq!(sheet.date(), Some("2003"));
    assert_eq!(sheet.remark("comment"), Some("ExactAudioCopy v1.0"));

    assert_eq!(sheet.tracks.len(), 3);
    assert_eq!(sheet.tracks[0].title, "Track One");
    assert_eq!(sheet.tracks[0].performer, "Jay Chou");
    assert_eq!(sheet.tracks[1].performer, "Guest");
    assert_eq!(sheet.tracks[1].raw_last_end.as_deref(), Some("03:58:70"));
    assert_eq!(sheet.tracks[1].start_ms, Some(240_000));
    assert_eq!(sheet.tracks[2].file_name.as_deref(), Some("album.flac"));
}

#[test]
fn inference_fills_durations_from_next_track() {
    let sheet = parse_str(ALBUM).unwrap();
    let t2 = 240_000;
    let t3 = 7 * 60_000 + 30_000 + 400;
    assert_eq!(sheet.tracks[0].duration_ms, Some(t2));
    assert_eq!(sheet.tracks[1].duration_ms, Some(t3 - t2));
    assert_eq!(sheet.tracks[2].duration_ms, None);

    assert_eq!(sheet.tracks[0].duration_display, "04:00");
    assert_eq!(sheet.tracks[1].duration_display, "03:30");
    assert_eq!(sheet.tracks[2].duration_display, UNKNOWN_DURATION);
    assert_eq!(
        sheet.tracks[1].display_info,
        "[02] Track Two - Guest [03:30]"
    );
    assert_eq!(
        sheet.tracks[2].display_info,
        "[03] Track Three - Jay Chou [??:??]"
    );
}

#[test]
fn first_track_without_index_starts_at_zero() {
    let text = r#"FILE "a.wav" WAVE
TRACK 01 AUDIO
TITLE "Intro"
TRACK 02 AUDIO
INDEX 01 02:00:00
TRACK 03 AUDIO
INDEX 01 05:00:00
"#;
    let sheet = parse_str(text).unwrap();
    let durations: Vec<Option<u64>> = sheet.tracks.iter().map(|t| t.duration_ms).collect();
    assert_eq!(durations, vec![Some(120_000), Some(180_000), None]);
    assert_eq!(sheet.tracks[0].start_ms, Some(0));
    assert_eq!(sheet.tracks[0].raw_start, None);
    assert_eq!(sheet.tracks[0].duration_display, "02:00");
}

#[test]
fn index_02_gives_explicit_end() {
    let text = r#"FILE "a.wav" WAVE
TRACK 01 AUDIO
INDEX 01 00:00:00
INDEX 02 01:00:00
TRACK 02 AUDIO
INDEX 01 01:10:00
INDEX 02 01:40:00
"#;
    let sheet = parse_str(text).unwrap();
    assert_eq!(sheet.tracks[0].duration_ms, Some(60_000));
    assert_eq!(sheet.tracks[1].duration_ms, Some(30_000));
}

#[test]
fn performer_defaults_to_unknown() {
    let sheet = parse_str("TRACK 01 AUDIO\nTITLE x\nINDEX 01 00:00:00\n").unwrap();
    assert_eq!(sheet.tracks[0].performer, UNKNOWN_PERFORMER);
    assert_eq!(sheet.tracks[0].title, "x");
}

#[test]
fn file_lines_apply_to_following_tracks() {
    let text = r#"FILE "disc one.flac" WAVE
TRACK 01 AUDIO
INDEX 01 00:00:00
FILE disc two.flac FLAC
TRACK 02 AUDIO
INDEX 01 00:00:00
FILE "disc one.flac" WAVE
"#;
    let sheet = parse_str(text).unwrap();
    assert_eq!(sheet.album_file_name.as_deref(), Some("disc one.flac"));
    assert_eq!(sheet.all_files, vec!["disc one.flac", "disc two.flac"]);
    assert_eq!(sheet.tracks[0].file_name.as_deref(), Some("disc one.flac"));
    assert_eq!(sheet.tracks[1].file_name.as_deref(), Some("disc two.flac"));
    assert_eq!(sheet.file_count(), 2);
}

#[test]
fn quoted_file_name_is_kept_whole() {
    let text = "FILE \"Live WAVE FLAC rip.ape\" WAVE\nTRACK 01 AUDIO\nINDEX 01 00:00:00\n";
    let sheet = parse_str(text).unwrap();
    assert_eq!(sheet.album_file_name.as_deref(), Some("Live WAVE FLAC rip.ape"));

    let sheet = parse_str("FILE Live FLAC rip.ape WAVE\n").unwrap();
    assert_eq!(sheet.album_file_name.as_deref(), Some("Live"));
}

#[test]
fn malformed_track_or_index_rejects_sheet() {
    assert!(matches!(
        parse_str("TRACK xx AUDIO\n"),
        Err(CueParseError::TrackNumber { line: 1, .. })
    ));
    assert!(matches!(
        parse_str("TRACK 01 AUDIO\nINDEX 01 bad\n"),
        Err(CueParseError::Index { line: 2, .. })
    ));
    assert!(matches!(
        parse_str("INDEX 01 00:00:00\n"),
        Err(CueParseError::IndexOutsideTrack { line: 1 })
    ));
}

#[test]
fn unknown_lines_are_skipped() {
    let sheet = parse_str("CATALOG 123\nFLAGS DCP\nGARBAGE\n\nTRACK 1 AUDIO\nISRC X\n").unwrap();
    assert_eq!(sheet.tracks.len(), 1);
    assert_eq!(sheet.tracks[0].number, 1);
}

#[test]
fn target_file_name_sanitizes_title() {
    let sheet = parse_str("TRACK 07 AUDIO\nTITLE \"A/B: C?\"\n").unwrap();
    assert_eq!(sheet.tracks[0].target_file_name("flac"), "07 - A_B_ C_.flac");
    assert_eq!(sheet.tracks[0].target_file_name(".wav"), "07 - A_B_ C_.wav");
}

#[test]
fn effective_file_name_falls_back_to_album_file() {
    let mut sheet = parse_str(ALBUM).unwrap();
    sheet.tracks[0].file_name = None;
    assert_eq!(
        sheet.tracks[0].effective_file_name(&sheet),
        Some("album.flac")
    );
}

/// A sheet long enough for the charset detector to settle on GBK.
fn chinese_sheet() -> String {
    let titles = [
        "以父之名", "懦夫", "晴天", "三年二班", "东风破", "你听得到", "同一种调调",
        "她的睫毛", "爱情悬崖", "梯田", "双刀",
    ];
    let mut text = String::from("PERFORMER \"周杰伦\"\nTITLE \"叶惠美\"\nFILE \"叶惠美.flac\" WAVE\n");
    for (i, title) in titles.iter().enumerate() {
        text.push_str(&format!(
            "  TRACK {:02} AUDIO\n    TITLE \"{title}\"\n    PERFORMER \"周杰伦\"\n    INDEX 01 {:02}:00:00\n",
            i + 1,
            i * 4
        ));
    }
    text
}

#[test]
fn parse_file_decodes_gbk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gbk.cue");
    let text = chinese_sheet();
    let (bytes, _, _) = encoding_rs::GBK.encode(&text);
    fs::write(&path, &bytes).unwrap();

    let sheet = parse_file(&path).unwrap();
    assert_eq!(sheet.album_performer, "周杰伦");
    assert_eq!(sheet.tracks[0].title, "以父之名");
    assert_eq!(sheet.tracks[4].title, "东风破");
    assert_eq!(sheet.tracks.len(), 11);
}

#[test]
fn utf8_with_bom_is_decoded() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice("TITLE \"Ünïcode\"\n".as_bytes());
    let (text, enc) = decode_text(&bytes);
    assert_eq!(enc, encoding_rs::UTF_8);
    assert_eq!(parse_str(&text).unwrap().album_title, "Ünïcode");
}

#[test]
fn locate_prefers_declared_then_cue_base_name() {
    let dir = tempdir().unwrap();
    let cue = dir.path().join("album.cue");
    fs::write(&cue, "").unwrap();
    fs::write(dir.path().join("album.flac"), b"x").unwrap();

    assert_eq!(
        locate_audio_file(&cue, None),
        Some(dir.path().join("album.flac"))
    );
    assert_eq!(
        locate_audio_file(&cue, Some("missing.wav")),
        Some(dir.path().join("album.flac"))
    );

    fs::write(dir.path().join("declared.ape"), b"x").unwrap();
    assert_eq!(
        locate_audio_file(&cue, Some("declared.ape")),
        Some(dir.path().join("declared.ape"))
    );
}

#[test]
fn locate_tries_declared_base_with_other_extensions() {
    let dir = tempdir().unwrap();
    let cue = dir.path().join("sheet.cue");
    fs::write(&cue, "").unwrap();
    fs::write(dir.path().join("image.wv"), b"x").unwrap();

    assert_eq!(
        locate_audio_file(&cue, Some("image.wav")),
        Some(dir.path().join("image.wv"))
    );
    assert_eq!(locate_audio_file(&cue, Some("other.wav")), None);
}

#[test]
fn rewrite_replaces_file_lines_and_writes_utf8() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("a.cue");
    let text = chinese_sheet();
    let (bytes, _, _) = encoding_rs::GBK.encode(&text);
    fs::write(&path, &bytes).unwrap();

    assert!(has_file_reference(&path));
    assert!(rewrite_file_reference(&path, "album.flac").unwrap());

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("FILE \"album.flac\" WAVE"));
    assert!(written.contains("TITLE \"叶惠美\""));
    let sheet = parse_str(&written).unwrap();
    assert_eq!(sheet.album_file_name.as_deref(), Some("album.flac"));
    assert_eq!(sheet.tracks[1].title, "懦夫");

    assert!(rewrite_file_reference(&dir.path().join("missing.cue"), "x").is_err());
}
