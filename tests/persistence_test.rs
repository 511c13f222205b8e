#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn run(db_path: &Path, args: &[&str]) -> String {
    let output = Command::new(cargo_bin!("transfer-ledger"))
        .env_remove("RUST_LOG")
        .arg("--db-path")
        .arg(db_path)
        .args(args)
        .output()
        .expect("Failed to execute command");
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_rocksdb_persistence_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // Each invocation is a separate process over the same database.
    run(&db_path, &["user", "create", "alice"]);
    run(&db_path, &["account", "create", "--user-id", "1", "--balance", "1800"]);
    run(&db_path, &["account", "create", "--user-id", "1", "--balance", "10"]);
    let record = run(&db_path, &["transfer", "1", "2", "200"]);
    assert!(record.contains("\"transfer_id\": 1"));

    let second = run(&db_path, &["transfer", "2", "1", "10"]);
    assert!(second.contains("\"transfer_id\": 2"));

    let accounts = run(&db_path, &["account", "list"]);
    assert!(accounts.contains("1,1,alice Account #1,1610"));
    assert!(accounts.contains("2,1,alice Account #2,200"));

    let history = run(&db_path, &["history", "2"]);
    assert!(history.contains("\"account_role\": \"receiver\""));
    assert!(history.contains("\"account_role\": \"sender\""));
}
