//! Tests for the local side of directory transfer: tree walking and
//! destination mirroring. (The SFTP wire itself needs a live host; the
//! structure and predicate rules are covered here.)

use std::fs;
use std::path::{Path, PathBuf};

use machine::{mirrored_root, walk_local_files};

fn make_tree(root: &Path) {
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join("a"), "alpha").unwrap();
    fs::write(root.join("sub/b"), "beta").unwrap();
    fs::write(root.join("skip.tmp"), "junk").unwrap();
}

#[test]
fn test_walk_collects_nested_files_in_sorted_order() {
    let dir = tempfile::tempdir().unwrap();
    make_tree(dir.path());

    let files = walk_local_files(dir.path()).unwrap();
    let relative: Vec<PathBuf> = files
        .iter()
        .map(|f| f.strip_prefix(dir.path()).unwrap().to_path_buf())
        .collect();
    assert_eq!(
        relative,
        vec![
            PathBuf::from("a"),
            PathBuf::from("skip.tmp"),
            PathBuf::from("sub/b"),
        ]
    );
}

#[test]
fn test_walk_of_missing_directory_is_empty() {
    assert!(walk_local_files(Path::new("/no/such/dir")).unwrap().is_empty());
}

#[test]
fn test_transfer_destination_mirrors_source_structure() {
    // Transferring directory D containing `a` and `sub/b` must produce
    // `<dest>/<basename(D)>/a` and `<dest>/<basename(D)>/sub/b`.
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("payload");
    make_tree(&source);

    let dest_root = mirrored_root(Path::new("/dest"), &source).unwrap();
    assert_eq!(dest_root, PathBuf::from("/dest/payload"));

    let predicate = |path: &Path| path.extension().map(|e| e != "tmp").unwrap_or(true);
    let mirrored: Vec<PathBuf> = walk_local_files(&source)
        .unwrap()
        .into_iter()
        .filter(|file| predicate(file))
        .map(|file| dest_root.join(file.strip_prefix(&source).unwrap()))
        .collect();

    assert_eq!(
        mirrored,
        vec![
            PathBuf::from("/dest/payload/a"),
            PathBuf::from("/dest/payload/sub/b"),
        ]
    );
}

#[test]
fn test_mirrored_root_rejects_sources_without_a_leaf() {
    assert!(mirrored_root(Path::new("/dest"), Path::new("/")).is_err());
}
