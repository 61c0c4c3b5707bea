mod common;

use std::fs;

use pathkit_core::{Content, Dir, Entity, Error, File, IfExists, PathHandle, Settings};

use common::{settings_in, workspace, write};

#[test]
fn test_extension_case_normalization() {
    let (_tmp, dir) = workspace();
    let report = dir.new_file("Report", Some("TXT")).unwrap();
    assert_eq!(report.name(), "Report.TXT");
    assert_eq!(report.extension().as_deref(), Some("txt"));
    assert_eq!(report.format().name(), "text");
}

#[test]
fn test_round_trip_rename() {
    let (_tmp, dir) = workspace();
    let file = dir.new_file("before", Some("txt")).unwrap();
    file.write("payload").unwrap();
    let old_path = file.path();

    file.rename("after", Some("txt")).unwrap();

    assert_eq!(file.path(), dir.path().join("after.txt"));
    assert!(!old_path.exists());
    assert_eq!(file.read().unwrap(), Content::from("payload"));

    // The parent cache is re-keyed onto the same handle.
    assert_eq!(dir.files().cached_names(), vec!["after.txt"]);
    assert!(dir.files().get("after.txt").unwrap().ptr_eq(&file));
}

#[test]
fn test_move_parent_consistency() {
    let (_tmp, dir) = workspace();
    let source = dir.new_dir("source").unwrap();
    let target = dir.new_dir("target").unwrap();
    let child = source.new_file("child", Some("txt")).unwrap();

    child.move_to(&target).unwrap();

    assert_eq!(child.parent().unwrap(), target);
    assert!(target.files().contains(child.path()).unwrap());
    assert!(target.files().get("child.txt").unwrap().ptr_eq(&child));
    assert!(!source.files().cached_names().contains(&"child.txt".to_string()));
    assert!(source.files().names().unwrap().is_empty());
}

#[test]
fn test_move_path_drops_stale_parent() {
    let (tmp, dir) = workspace();
    let file = dir.new_file("loose", Some("txt")).unwrap();
    let elsewhere = tmp.path().join("elsewhere").join("loose.txt");

    file.move_path(&elsewhere).unwrap();

    assert_eq!(file.path(), elsewhere);
    assert_eq!(file.parent().unwrap().path(), tmp.path().join("elsewhere"));
    assert!(dir.files().cached_names().is_empty());
}

#[test]
fn test_moved_dir_rebases_children() {
    let (_tmp, dir) = workspace();
    let outer = dir.new_dir("outer").unwrap();
    let inner = outer.new_dir("inner").unwrap();
    let leaf = inner.new_file("leaf", Some("txt")).unwrap();

    outer.rename("renamed").unwrap();

    assert_eq!(inner.path(), dir.path().join("renamed").join("inner"));
    assert_eq!(leaf.path(), dir.path().join("renamed").join("inner").join("leaf.txt"));
    assert!(leaf.path().is_file());
    assert_eq!(dir.dirs().names().unwrap(), vec!["renamed"]);
}

#[test]
fn test_collision_policies() {
    let (tmp, dir) = workspace();
    let source = dir.new_file("source", Some("txt")).unwrap();
    source.write("new").unwrap();
    let occupied = dir.new_file("taken", Some("txt")).unwrap();
    occupied.write("old").unwrap();
    let dest = dir.path().join("taken.txt");

    match source.copy(&dest) {
        Err(Error::AlreadyExists { path, policy }) => {
            assert_eq!(path, dest);
            assert_eq!(policy, IfExists::Fail);
        }
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    let copying = File::with_settings(source.path(), settings_in(&tmp).with_if_exists(IfExists::MakeCopy)).unwrap();
    let copy = copying.new_copy(&dest).unwrap();
    assert_eq!(copy.name(), "taken (1).txt");
    assert_eq!(fs::read_to_string(&dest).unwrap(), "old");

    let trashing = File::with_settings(source.path(), settings_in(&tmp).with_if_exists(IfExists::Trash)).unwrap();
    trashing.copy(&dest).unwrap();
    assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    assert_eq!(
        fs::read_to_string(tmp.path().join(".trash").join("taken.txt")).unwrap(),
        "old"
    );

    fs::write(&dest, "again").unwrap();
    let allowing = File::with_settings(source.path(), settings_in(&tmp).with_if_exists(IfExists::Allow)).unwrap();
    allowing.move_path(&dest).unwrap();
    assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    assert!(!dir.path().join("source.txt").exists());
}

#[test]
fn test_same_path_is_rejected() {
    let (_tmp, dir) = workspace();
    let file = dir.new_file("same", Some("txt")).unwrap();
    assert!(matches!(file.copy(file.path()), Err(Error::SamePath(_))));
    assert!(matches!(file.rename("same.txt", None), Err(Error::SamePath(_))));
}

#[test]
fn test_copies_are_independent() {
    let (_tmp, dir) = workspace();
    let target = dir.new_dir("target").unwrap();
    let original = dir.new_file("original", Some("txt")).unwrap();
    original.write("one").unwrap();

    let copy = original.new_copy_to(&target).unwrap();
    copy.write("two").unwrap();

    assert_eq!(original.read().unwrap(), Content::from("one"));
    assert_eq!(copy.parent().unwrap(), target);
    assert!(target.files().get("original.txt").unwrap().ptr_eq(&copy));

    let renamed = original.new_rename("sibling", Some("txt")).unwrap();
    assert_eq!(renamed.path(), dir.path().join("sibling.txt"));
    assert!(original.path().exists());
}

#[test]
fn test_bind_checks_on_disk_kind() {
    let (_tmp, dir) = workspace();
    let target = dir.new_dir("target").unwrap();
    let file = dir.new_file("thing", None).unwrap();
    fs::remove_file(file.path()).unwrap();
    fs::create_dir(file.path()).unwrap();

    assert!(matches!(target.bind(file, false), Err(Error::TypeMismatch(_))));
}

#[test]
fn test_bind_moves_or_copies() {
    let (_tmp, dir) = workspace();
    let target = dir.new_dir("target").unwrap();
    let moved = dir.new_dir("moved").unwrap();
    moved.new_file("inside", Some("txt")).unwrap();
    let kept = dir.new_file("kept", Some("md")).unwrap();

    let bound = target.bind(moved.clone(), false).unwrap();
    assert!(matches!(&bound, Entity::Dir(d) if d.ptr_eq(&moved)));
    assert!(target.path().join("moved").join("inside.txt").is_file());
    assert!(!dir.path().join("moved").exists());

    let copied = target.bind(kept.clone(), true).unwrap();
    assert!(kept.path().is_file());
    assert_eq!(copied.path(), target.path().join("kept.md"));

    assert!(matches!(moved.move_to(&moved), Err(Error::Unsupported(_))));
}

#[test]
fn test_delete_and_recreate() {
    let (_tmp, dir) = workspace();
    let file = dir.new_file("temp", Some("txt")).unwrap();
    file.delete().unwrap();
    assert!(!file.exists());
    assert!(dir.files().cached_names().is_empty());

    file.create().unwrap();
    assert!(file.exists());

    let sub = dir.new_dir("sub").unwrap();
    sub.new_file("x", None).unwrap();
    sub.delete().unwrap();
    assert!(!sub.exists());
    assert!(dir.dirs().names().unwrap().is_empty());
}

#[test]
fn test_trash_keeps_handle() {
    let (tmp, dir) = workspace();
    let file = dir.new_file("bin", Some("txt")).unwrap();
    file.write("rubbish").unwrap();

    let landed = file.trash().unwrap();
    assert_eq!(landed, tmp.path().join(".trash").join("bin.txt"));
    assert!(!file.exists());
    assert_eq!(fs::read_to_string(landed).unwrap(), "rubbish");
    assert!(dir.files().names().unwrap().is_empty());
}

#[test]
fn test_clear_empties_directory() {
    let (_tmp, dir) = workspace();
    write(dir.path().join("a.txt"), "");
    write(dir.path().join("nested").join("b.txt"), "");
    dir.synchronize().unwrap();

    dir.clear().unwrap();
    assert!(dir.is_empty().unwrap());
    assert!(dir.path().is_dir());
}

#[cfg(unix)]
#[test]
fn test_clear_removes_dangling_links() {
    let (tmp, dir) = workspace();
    write(dir.path().join("a.txt"), "");
    std::os::unix::fs::symlink(tmp.path().join("nowhere").join("target"), dir.path().join("dangling"))
        .unwrap();
    std::os::unix::fs::symlink(tmp.path().join("outside.txt"), dir.path().join("link")).unwrap();

    dir.clear().unwrap();

    assert!(dir.is_empty().unwrap());
    assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    assert!(!tmp.path().join("nowhere").exists());
    assert!(!tmp.path().join("outside.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_clear_keeps_symlinked_dir_targets() {
    let (tmp, dir) = workspace();
    write(tmp.path().join("kept").join("inside.txt"), "");
    std::os::unix::fs::symlink(tmp.path().join("kept"), dir.path().join("shortcut")).unwrap();
    let shortcut = dir.dirs().get("shortcut").unwrap();
    assert_eq!(shortcut.files().names().unwrap(), vec!["inside.txt"]);

    dir.clear().unwrap();

    assert!(dir.is_empty().unwrap());
    assert!(tmp.path().join("kept").join("inside.txt").is_file());
}

#[test]
fn test_equality_and_ancestry() {
    let (_tmp, dir) = workspace();
    let sub = dir.new_dir("sub").unwrap();
    let file = sub.new_file("leaf", Some("txt")).unwrap();
    let other = dir.new_dir("other").unwrap();

    assert!(file < sub);
    assert!(file < dir);
    assert!(dir > sub);
    assert!(sub.partial_cmp(&other).is_none());
    assert!(!(sub < other) && !(sub > other));

    let again = Dir::new(dir.path().join("sub").join("..").join("sub")).unwrap();
    assert_eq!(again, sub);
    assert!(!again.ptr_eq(&sub));
    assert_eq!(file, dir.path().join("sub").join("leaf.txt"));

    // Component-wise: a sibling sharing a name prefix is not a descendant.
    let prefixed = dir.new_dir("sub2").unwrap();
    assert!(prefixed.partial_cmp(&sub).is_none());
}

#[test]
fn test_structured_formats() {
    let (_tmp, dir) = workspace();
    let json = dir.new_file("config", Some("json")).unwrap();
    json.write(serde_json::json!({"name": "pathkit", "tags": ["a", "b"]})).unwrap();
    assert_eq!(json.read().unwrap().as_structured().unwrap()["name"], "pathkit");

    let yaml = dir.new_file("config", Some("yaml")).unwrap();
    yaml.write(serde_json::json!({"depth": 2})).unwrap();
    assert_eq!(yaml.read().unwrap().as_structured().unwrap()["depth"], 2);

    let toml = dir.new_file("config", Some("toml")).unwrap();
    toml.write(serde_json::json!({"section": {"key": "value"}})).unwrap();
    assert_eq!(
        toml.read().unwrap().as_structured().unwrap()["section"]["key"],
        "value"
    );
}

#[test]
fn test_force_read_bypasses_cache() {
    let (tmp, dir) = workspace();
    let path = dir.path().join("live.txt");
    write(&path, "first");
    let file = File::with_settings(&path, Settings {
        force_read: true,
        ..settings_in(&tmp)
    })
    .unwrap();

    assert_eq!(file.read().unwrap(), Content::from("first"));
    fs::write(&path, "second").unwrap();
    assert_eq!(file.read().unwrap(), Content::from("second"));
}

#[test]
fn test_compress_defaults_beside_dir() {
    let (_tmp, dir) = workspace();
    let bundle = dir.new_dir("bundle").unwrap();
    bundle.new_file("a", Some("txt")).unwrap().write("alpha").unwrap();

    let archive = bundle.compress(None).unwrap();
    assert_eq!(archive.path(), dir.path().join("bundle.zip"));
    assert!(archive.size().unwrap() > 0);
    assert!(dir.files().contains("bundle.zip").unwrap());
}
