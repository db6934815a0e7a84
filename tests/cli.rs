use assert_cmd::Command;

#[test]
fn help_lists_service_options() {
    let output = Command::cargo_bin("mirrorlb")
        .expect("binary")
        .arg("--help")
        .output()
        .expect("run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--url", "--interval", "--completion", "--host", "--port", "--selection"] {
        assert!(stdout.contains(flag), "missing {flag} in help");
    }
}

#[test]
fn invalid_completion_exits_with_error() {
    Command::cargo_bin("mirrorlb")
        .expect("binary")
        .args(["--completion", "2", "--quiet"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn unknown_selection_policy_is_rejected() {
    Command::cargo_bin("mirrorlb")
        .expect("binary")
        .args(["--selection", "fastest"])
        .assert()
        .failure();
}
