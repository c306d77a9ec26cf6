//! Repository setup used by every CLI command

use git2::Repository;
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use vcstatus_cli::output::render_text;
use vcstatus_cli::{open_repository, Config};

#[test]
fn test_open_repository_registers_enclosing_roots() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let root = temp_dir.path().canonicalize().expect("test setup failed");
    Repository::init(&root).expect("test setup failed");
    fs::create_dir_all(root.join("src")).expect("test setup failed");

    let repository = open_repository(&Config::default(), &[root.join("src"), root.clone()])
        .expect("repository should open");

    assert_eq!(repository.roots(), vec![root]);
    assert_eq!(repository.branch_names().len(), 1);
}

#[test]
fn test_open_repository_fails_outside_any_repository() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let plain = temp_dir.path().canonicalize().expect("test setup failed");

    // A temp dir nested in some other checkout would be discovered
    if Repository::discover(&plain).is_ok() {
        return;
    }
    assert!(open_repository(&Config::default(), &[plain]).is_err());
}

#[test]
fn test_pending_text_lists_staged_file() {
    let temp_dir = TempDir::new().expect("test setup failed");
    let root = temp_dir.path().canonicalize().expect("test setup failed");
    let repo = Repository::init(&root).expect("test setup failed");
    fs::write(root.join("new.txt"), "hello").expect("test setup failed");
    let mut index = repo.index().expect("test setup failed");
    index
        .add_path(std::path::Path::new("new.txt"))
        .expect("test setup failed");
    index.write().expect("test setup failed");

    let repository =
        open_repository(&Config::default(), &[root.clone()]).expect("repository should open");
    let text = render_text(&repository.pending_files());

    assert_eq!(text, format!("A {}", root.join("new.txt").display()));
}
