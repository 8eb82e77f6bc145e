//! Runs the `sercom` binary on sessions that cannot start.

use std::{fs, process::Command};

#[test]
fn malformed_config_is_reported_on_stderr() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("sercom.conf"), "[general\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sercom"))
        .arg("--port=/nonexistent/sercom-test")
        .arg(format!("--directory={}", dir.path().display()))
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("malformed configuration file"), "{}", stderr);
    assert!(stderr.contains("Session ended with errors!"), "{}", stderr);
    assert!(!stdout.contains("malformed"), "{}", stdout);
    assert!(!stdout.contains("Session ended"), "{}", stdout);
}
