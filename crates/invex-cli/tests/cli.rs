use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// `invex` isolated from the caller's environment, config and `.env`.
fn invex(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("invex").unwrap();
    cmd.current_dir(dir)
        .env("XDG_CONFIG_HOME", dir.join("config-home"))
        .env_remove("LLAMA_CLOUD_API_KEY")
        .env_remove("GOOGLE_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help() {
    let dir = TempDir::new().unwrap();
    invex(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_convert_requires_parser_key() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.pdf"), b"%PDF-1.4").unwrap();

    invex(dir.path())
        .args(["convert", "a.pdf"])
        .env("GOOGLE_API_KEY", "test-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("LLAMA_CLOUD_API_KEY"));
}

#[test]
fn test_convert_requires_model_key() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.pdf"), b"%PDF-1.4").unwrap();

    invex(dir.path())
        .args(["convert", "--extractor", "local", "a.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_API_KEY"));

    // Nothing was exported
    assert!(
        fs::read_dir(dir.path())
            .unwrap()
            .all(|e| !e.unwrap().file_name().to_string_lossy().starts_with("invoices_"))
    );
}

#[test]
fn test_convert_without_pdfs() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

    invex(dir.path())
        .args(["convert", "--extractor", "local", "*.txt"])
        .env("GOOGLE_API_KEY", "test-key")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No PDF files found"));
}

#[test]
fn test_convert_unreadable_pdf_becomes_failed_record() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.pdf"), b"this is not a pdf").unwrap();

    invex(dir.path())
        .args(["convert", "--extractor", "local", "--output-dir", "out", "broken.pdf"])
        .env("GOOGLE_API_KEY", "test-key")
        .assert()
        .success()
        .stdout(predicate::str::contains("0 successful, 1 failed"))
        .stdout(predicate::str::contains("Failed files:"))
        .stdout(predicate::str::contains("broken.pdf"));

    let names: Vec<String> = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names.len(), 1, "{names:?}");
    assert!(names[0].starts_with("invoices_summary_"));
    assert!(names[0].ends_with(".xlsx"));
}

#[test]
fn test_convert_csv_export() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("broken.pdf"), b"garbage").unwrap();

    invex(dir.path())
        .args([
            "convert",
            "--extractor",
            "local",
            "--format",
            "csv",
            "--show",
            "none",
            "broken.pdf",
        ])
        .env("GOOGLE_API_KEY", "test-key")
        .assert()
        .success();

    let export = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| {
            p.file_name()
                .is_some_and(|n| n.to_string_lossy().starts_with("invoices_summary_"))
        })
        .unwrap();
    let content = fs::read_to_string(export).unwrap();
    let mut lines = content.lines();
    assert!(lines.next().unwrap().ends_with("source_file,processing_status,error_message"));
    assert!(lines.next().unwrap().contains("broken.pdf,failed,"));
}

#[test]
fn test_config_init_get_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("invex.json");
    let config = config.to_str().unwrap();

    invex(dir.path())
        .args(["--config", config, "config", "init"])
        .assert()
        .success();

    invex(dir.path())
        .args(["--config", config, "config", "get", "model.model"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gemini-1.5-flash"));

    invex(dir.path())
        .args(["--config", config, "config", "set", "model.max_retries", "5"])
        .assert()
        .success();

    invex(dir.path())
        .args(["--config", config, "config", "get", "model.max_retries"])
        .assert()
        .success()
        .stdout(predicate::str::diff("5\n"));

    invex(dir.path())
        .args(["--config", config, "config", "set", "model.no_such_key", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));

    invex(dir.path())
        .args(["--config", config, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_check() {
    let dir = TempDir::new().unwrap();

    invex(dir.path())
        .args(["config", "check"])
        .env("GOOGLE_API_KEY", "test-key")
        .assert()
        .failure()
        .stdout(predicate::str::contains("GOOGLE_API_KEY is set"))
        .stderr(predicate::str::contains("LLAMA_CLOUD_API_KEY"));

    invex(dir.path())
        .args(["config", "check"])
        .env("GOOGLE_API_KEY", "test-key")
        .env("LLAMA_CLOUD_API_KEY", "llx-test")
        .assert()
        .success();
}
