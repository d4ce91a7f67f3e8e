//! SystemRunner against real programs and files.

#![cfg(unix)]

use std::fs;
use usc_exec::{CommandLine, Runner, SystemRunner};

#[test]
fn test_arguments_reach_the_program_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a b*.txt");
    fs::write(&path, "literal\n").unwrap();

    let cmd = CommandLine::new("cat").arg(path.to_str().unwrap());
    let out = SystemRunner::new().run(&cmd).unwrap();
    assert!(out.success());
    assert_eq!(out.stdout, "literal\n");
    assert!(out.command.ends_with("'"), "{}", out.command);
}

#[test]
fn test_stdin_data_is_written_through() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crontab");

    let cmd = CommandLine::new("tee")
        .arg(path.to_str().unwrap())
        .stdin("0 3 * * * /usr/local/bin/backup\n");
    let out = SystemRunner::new().run(&cmd).unwrap().check().unwrap();
    assert_eq!(out.stdout, "0 3 * * * /usr/local/bin/backup\n");
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "0 3 * * * /usr/local/bin/backup\n"
    );
}

#[test]
fn test_failure_keeps_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");

    let cmd = CommandLine::new("cat").arg(missing.to_str().unwrap());
    let out = SystemRunner::new().run(&cmd).unwrap();
    assert!(!out.success());
    assert!(out.stderr.contains("No such file"), "{}", out.stderr);

    let err = out.check().unwrap_err();
    assert_ne!(err.exit_code(), 0);
    assert!(err.stderr().contains("No such file"));
}
