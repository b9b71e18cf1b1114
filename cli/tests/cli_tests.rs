use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

/// Single handle with --dry-run should print the dry-run line and exit 0.
#[test]
fn test_single_program_dry_run() {
    cargo_bin_cmd!("bountytab")
        .args(&["ifood-og", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN] Would collect: ifood-og (bugcrowd)"));
}

/// List file with --dry-run should process every non-blank line.
#[test]
fn test_list_file_dry_run() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "acme").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "ifood-og").unwrap();
    writeln!(file, "security").unwrap();

    let path = file.path().to_str().unwrap().to_string();

    cargo_bin_cmd!("bountytab")
        .args(&["-l", &path, "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN] Would collect: acme (bugcrowd)"))
        .stdout(predicate::str::contains("[DRY RUN] Would collect: ifood-og (bugcrowd)"))
        .stdout(predicate::str::contains("[DRY RUN] Would collect: security (bugcrowd)"));
}

/// The browser platform is selectable and shows up in the dry-run line.
#[test]
fn test_platform_selection_dry_run() {
    cargo_bin_cmd!("bountytab")
        .args(&["security", "-P", "hackerone", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[DRY RUN] Would collect: security (hackerone)"));
}

/// Running with no arguments should fail (clap requires a handle or -l).
#[test]
fn test_no_args_shows_error() {
    cargo_bin_cmd!("bountytab")
        .assert()
        .failure();
}

/// Unknown platforms are rejected by the value parser.
#[test]
fn test_unknown_platform_rejected() {
    cargo_bin_cmd!("bountytab")
        .args(&["acme", "-P", "intigriti", "--dry-run"])
        .assert()
        .failure();
}

/// A missing list file is a startup error, not a hang.
#[test]
fn test_missing_list_file_fails() {
    cargo_bin_cmd!("bountytab")
        .args(&["-l", "/no/such/programs.txt", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}
