use std::fs;

use pathkit_cli::{Cli, Commands, Parser};
use pathkit_core::IfExists;
use tempfile::TempDir;

fn run(args: &[&str]) -> String {
    let cli = Cli::try_parse_from(args).unwrap();
    let settings = cli.settings().unwrap();
    let mut out = Vec::new();
    cli.command.run(settings, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn fixture() -> TempDir {
    let tmp = TempDir::new().unwrap();
    fs::create_dir_all(tmp.path().join("Sub Dir")).unwrap();
    fs::write(tmp.path().join("My Notes.txt"), "hello").unwrap();
    fs::write(tmp.path().join("data.json"), r#"{"k": 1}"#).unwrap();
    fs::write(tmp.path().join("Sub Dir").join("deep.txt"), "needle").unwrap();
    tmp
}

#[test]
fn test_cli_parsing_global_options() {
    let cli = Cli::try_parse_from([
        "pathkit",
        "ls",
        "/tmp",
        "--if-exists",
        "make-copy",
        "--verbose",
    ])
    .unwrap();
    assert!(matches!(cli.command, Commands::Ls(_)));
    assert_eq!(cli.if_exists, Some(IfExists::MakeCopy));
    assert!(cli.verbose);
    assert_eq!(cli.settings().unwrap().if_exists, IfExists::MakeCopy);
}

#[test]
fn test_cli_rejects_unknown_policy() {
    assert!(Cli::try_parse_from(["pathkit", "ls", "--if-exists", "overwrite"]).is_err());
}

#[test]
fn test_ls_lists_dirs_then_files() {
    let tmp = fixture();
    let root = tmp.path().to_str().unwrap();
    assert_eq!(run(&["pathkit", "ls", root]), "Sub Dir/\nMy Notes.txt\ndata.json\n");
    assert_eq!(run(&["pathkit", "ls", root, "--ids"]), "sub_dir/\ndata\nmy_notes\n");
}

#[test]
fn test_resolve_identifier() {
    let tmp = fixture();
    let root = tmp.path().to_str().unwrap();
    let out = run(&["pathkit", "resolve", "my_notes", "--dir", root]);
    assert_eq!(out.trim(), tmp.path().join("My Notes.txt").to_str().unwrap());

    let out = run(&["pathkit", "resolve", "sub_dir", "--dir", root, "--kind", "dir"]);
    assert_eq!(out.trim(), tmp.path().join("Sub Dir").to_str().unwrap());
}

#[test]
fn test_find_by_content() {
    let tmp = fixture();
    let root = tmp.path().to_str().unwrap();
    let out = run(&["pathkit", "find", root, "--content", "needle"]);
    assert_eq!(
        out.trim(),
        tmp.path().join("Sub Dir").join("deep.txt").to_str().unwrap()
    );
}

#[test]
fn test_cat_structured_content() {
    let tmp = fixture();
    let path = tmp.path().join("data.json");
    let out = run(&["pathkit", "cat", path.to_str().unwrap()]);
    assert_eq!(out, "{\n  \"k\": 1\n}\n");
}

#[test]
fn test_tree_and_compress() {
    let tmp = fixture();
    let root = tmp.path().to_str().unwrap();
    let tree = run(&["pathkit", "tree", root, "--depth", "0"]);
    assert!(tree.contains("+--My Notes.txt"));
    assert!(tree.contains("+--Sub Dir/"));
    assert!(!tree.contains("deep.txt"));

    let sub = tmp.path().join("Sub Dir");
    let out = run(&["pathkit", "compress", sub.to_str().unwrap()]);
    assert_eq!(out.trim(), tmp.path().join("Sub Dir.zip").to_str().unwrap());
    assert!(tmp.path().join("Sub Dir.zip").is_file());
}
