//! Command-line behaviour of the `regcache` binary.

use std::path::Path;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use regcache_core::{RuleStore, SqliteRuleStore};

/// A `regcache` command isolated from the user's configuration.
fn regcache(config_home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("regcache").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home)
        .env("HOME", config_home)
        .current_dir(config_home);
    cmd
}

fn seed_rules(db: &Path) {
    let store = SqliteRuleStore::open(db, Duration::from_secs(1)).unwrap();
    store.save_rule("RG", "data_emissao", "DATA_BR").unwrap();
    store.save_rule("CNH", "validade", "DATA_BR").unwrap();
    store.save_rule("CNH", "validade", "DATA_ISO").unwrap();
}

#[test]
fn test_rules_list_empty_cache() {
    let home = tempfile::tempdir().unwrap();
    let db = home.path().join("cache.db");

    regcache(home.path())
        .args(["rules", "list", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("No rules cached"));
}

#[test]
fn test_rules_list_and_show() {
    let home = tempfile::tempdir().unwrap();
    let db = home.path().join("cache.db");
    seed_rules(&db);

    regcache(home.path())
        .args(["rules", "list", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("DATA_BR"))
        .stdout(predicate::str::contains("conflicting"))
        .stdout(predicate::str::contains("1 active, 1 conflicting"));

    regcache(home.path())
        .args(["rules", "list", "--label", "RG", "--json", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"field\": \"data_emissao\""))
        .stdout(predicate::str::contains("CNH").not());

    regcache(home.path())
        .args(["rules", "show", "CNH", "validade", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("CNH / validade: conflicting"));
}

#[test]
fn test_rules_reset_requires_confirmation() {
    let home = tempfile::tempdir().unwrap();
    let db = home.path().join("cache.db");
    seed_rules(&db);

    regcache(home.path())
        .args(["rules", "reset", "--db"])
        .arg(&db)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--yes"));

    regcache(home.path())
        .args(["rules", "reset", "--yes", "--db"])
        .arg(&db)
        .assert()
        .success();

    let store = SqliteRuleStore::open(&db, Duration::from_secs(1)).unwrap();
    assert!(store.records().unwrap().is_empty());
}

#[test]
fn test_config_show_defaults() {
    let home = tempfile::tempdir().unwrap();

    regcache(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No config file found"))
        .stdout(predicate::str::contains("gpt-5-mini"));
}

#[test]
fn test_config_set_and_get() {
    let home = tempfile::tempdir().unwrap();
    let config = home.path().join("regcache.json");

    regcache(home.path())
        .args(["config", "set", "extraction.tie_break", "first", "--config"])
        .arg(&config)
        .assert()
        .success();

    regcache(home.path())
        .args(["config", "get", "extraction.tie_break", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"first\""));

    regcache(home.path())
        .args(["config", "set", "extraction.tie_break", "loudest", "--config"])
        .arg(&config)
        .assert()
        .failure();
}

#[test]
fn test_batch_missing_directory_fails() {
    let home = tempfile::tempdir().unwrap();

    regcache(home.path())
        .args(["batch", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dataset directory not found"));
}

#[test]
fn test_batch_without_api_key_fails() {
    let home = tempfile::tempdir().unwrap();
    let dataset = home.path().join("dataset");
    std::fs::create_dir_all(dataset.join("files")).unwrap();
    std::fs::write(dataset.join("files").join("rg1.txt"), "NOME MARIA 04/02/2021").unwrap();
    std::fs::write(
        dataset.join("dataset.json"),
        r#"[{"pdf_path": "rg1.txt", "label": "RG", "extraction_schema": {"nome": "Nome"}}]"#,
    )
    .unwrap();

    regcache(home.path())
        .args(["batch"])
        .arg(&dataset)
        .arg("--db")
        .arg(home.path().join("cache.db"))
        .env_remove("OPENAI_API_KEY")
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_process_rejects_bad_schema() {
    let home = tempfile::tempdir().unwrap();
    let input = home.path().join("rg1.txt");
    std::fs::write(&input, "NOME MARIA").unwrap();

    regcache(home.path())
        .arg("process")
        .arg(&input)
        .args(["--label", "RG", "--schema", "[1, 2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid --schema"));
}
