use assert_cmd::Command;

fn bookstore(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("bookstore").unwrap();
    cmd.env("BOOKSTORE_CONFIG_DIR", config_dir)
        .env_remove("BOOKSTORE_ENV")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    let dir = tempfile::tempdir().unwrap();
    let output = bookstore(dir.path()).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("check"));
}

#[test]
fn check_reports_defaults_without_config_files() {
    let dir = tempfile::tempdir().unwrap();
    let output = bookstore(dir.path()).arg("check").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("configuration ok"));
    assert!(stdout.contains("store: memory"));
    assert!(stdout.contains("modules: books, orders"));
}

#[test]
fn check_opens_a_configured_redb_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data").join("books.redb");
    std::fs::write(
        dir.path().join("base.toml"),
        format!(
            "[database]\nbackend = \"redb\"\npath = \"{}\"\n",
            db_path.display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();

    let output = bookstore(dir.path()).arg("check").output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("store: redb"));
    assert!(db_path.exists());
}

#[test]
fn unknown_environment_fails() {
    let dir = tempfile::tempdir().unwrap();
    let output = bookstore(dir.path())
        .env("BOOKSTORE_ENV", "qa")
        .arg("check")
        .output()
        .unwrap();

    assert!(!output.status.success());
}
