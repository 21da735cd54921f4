use std::path::{Path, PathBuf};

use super::*;

#[test]
fn identity_record_is_unchanged_and_reads_its_original() {
    let rec = ChangeRecord::identity(RecordId(0), "/m/a.mp3");
    assert!(!rec.changed);
    assert_eq!(rec.op, OpKind::None);
    assert_eq!(rec.status, ExecStatus::Pending);
    assert_eq!(rec.original_name, "a.mp3");
    assert_eq!(rec.new_name, "a.mp3");
    assert_eq!(rec.source(), Path::new("/m/a.mp3"));
    assert_eq!(rec.current_source(), Path::new("/m/a.mp3"));
    assert_eq!(rec.derived_from(), None);
}

#[test]
fn derive_keeps_identity_and_names_the_target() {
    let rec = ChangeRecord::identity(RecordId(4), "/m/a.mp3");
    let planned = rec
        .derive(OpKind::Rename, "/m/b.mp3")
        .with_param("note", 7);
    assert!(planned.changed);
    assert_eq!(planned.new_name, "b.mp3");
    assert_eq!(planned.original_name, "a.mp3");
    assert_eq!(planned.derived_from(), Some(RecordId(4)));
    assert_eq!(planned.param("note"), Some("7"));
    assert_eq!(planned.current_source(), Path::new("/m/a.mp3"));

    let none = rec.derive(OpKind::None, "/m/a.mp3");
    assert!(!none.changed);
}

#[test]
fn carry_forward_reads_the_planned_result() {
    let rec = ChangeRecord::identity(RecordId(0), "/m/a.mp3");
    let mut planned = rec.derive(OpKind::Rename, "/m/b.mp3");
    planned.id = RecordId(1);

    let next = planned.carry_forward(RecordId(2));
    assert_eq!(next.id, RecordId(2));
    assert_eq!(next.upstream, Some(RecordId(1)));
    assert!(!next.changed);
    assert_eq!(next.source(), Path::new("/m/a.mp3"));
    assert_eq!(next.current_source(), Path::new("/m/b.mp3"));
    assert_eq!(next.new_name, "b.mp3");
    assert_eq!(next.lineage().versions().len(), 2);

    // An unchanged record passes its own upstream on.
    let again = next.carry_forward(RecordId(3));
    assert_eq!(again.upstream, Some(RecordId(1)));
    assert_eq!(again.current_source(), Path::new("/m/b.mp3"));
}

#[test]
fn only_moving_operations_consume_their_source() {
    for op in [OpKind::Rename, OpKind::Move, OpKind::Delete, OpKind::AlbumRename, OpKind::CueRename] {
        assert!(op.consumes_source(), "{op}");
    }
    for op in [OpKind::None, OpKind::Copy, OpKind::Convert, OpKind::Split] {
        assert!(!op.consumes_source(), "{op}");
    }
    assert_eq!(OpKind::AlbumRename.to_string(), "ALBUM_RENAME");
    assert_eq!(ExecStatus::Skipped.to_string(), "SKIPPED");
    assert_eq!(RecordId(12).to_string(), "#12");
}

#[test]
fn lineage_advances_to_each_new_version() {
    let mut lineage = Lineage::new("/m/a");
    assert_eq!(lineage.current(), Path::new("/m/a"));

    lineage.advance("/m/b");
    lineage.advance("/m/c");
    assert_eq!(lineage.current(), Path::new("/m/c"));
    assert_eq!(
        lineage.versions(),
        &[PathBuf::from("/m/a"), PathBuf::from("/m/b"), PathBuf::from("/m/c")]
    );
    assert_eq!(lineage.original(), Path::new("/m/a"));
}

#[test]
fn file_name_falls_back_to_whole_path() {
    assert_eq!(file_name_of(Path::new("/m/x.flac")), "x.flac");
    assert_eq!(file_name_of(Path::new("/")), "/");
}

#[test]
fn rebase_follows_a_moved_directory() {
    let mut item = ChangeRecord::identity(RecordId(0), "/m/old/a.mp3");
    assert!(item.rebase(Path::new("/m/old"), Path::new("/m/new"), RecordId(5)));
    assert_eq!(item.current_source(), Path::new("/m/new/a.mp3"));
    assert_eq!(item.source(), Path::new("/m/old/a.mp3"));
    assert_eq!(item.planned_path, PathBuf::from("/m/new/a.mp3"));
    assert_eq!(item.upstream, Some(RecordId(5)));
    assert!(!item.changed);

    let mut dir = ChangeRecord::identity(RecordId(1), "/m/old");
    assert!(!dir.rebase(Path::new("/m/old"), Path::new("/m/new"), RecordId(5)));
    let mut sibling = ChangeRecord::identity(RecordId(2), "/m/older/b.mp3");
    assert!(!sibling.rebase(Path::new("/m/old"), Path::new("/m/new"), RecordId(5)));
    assert_eq!(sibling.upstream, None);
}
