use std::io::Write;
use std::process::{Command, Output, Stdio};

fn run(args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ssml"))
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn ssml");
    // Commands that fail early may exit before reading stdin.
    let _ = child
        .stdin
        .take()
        .expect("stdin is piped")
        .write_all(stdin.as_bytes());
    child.wait_with_output().expect("wait for ssml")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "ssml failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap().trim_end().to_string()
}

#[test]
fn export_reads_markup_from_stdin() {
    let output = run(
        &["export"],
        r#"<p>wait<span class="break" time="3"><sup>3s</sup></span><span class="ordinal" ordinal="true">2</span></p>"#,
    );
    assert_eq!(
        stdout(&output),
        r#"<speak><p>wait<break time="3s"/><say-as interpret-as="ordinal">2</say-as></p></speak>"#
    );
}

#[test]
fn normalize_rewrites_legacy_markup() {
    let output = run(
        &["normalize"],
        r#"<P>x<strong class="emphasis" emphasis="strong">y</strong></P>"#,
    );
    assert_eq!(
        stdout(&output),
        r#"<p>x<strong class="emphasis" level="strong">y</strong></p>"#
    );
}

#[test]
fn inspect_prints_document_json() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("doc.html");
    std::fs::write(&input, "<p>hi</p>").unwrap();

    let output = run(&["inspect", input.to_str().unwrap()], "");
    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(json["blocks"].as_array().map(Vec::len), Some(1));
}

#[test]
fn save_then_load_uses_the_storage_key() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("editor.sqlite3");
    let db = db.to_str().unwrap();

    stdout(&run(&["save", "--db", db], "<p>kept</p>"));
    assert_eq!(stdout(&run(&["load", "--db", db], "")), "<p>kept</p>");
    assert_eq!(
        stdout(&run(&["load", "--db", db, "--ssml"], "")),
        "<speak><p>kept</p></speak>"
    );
}

#[test]
fn unparseable_input_fails_with_message() {
    let output = run(&["export"], "<p><strong>");
    assert!(!output.status.success());
    assert!(!output.stderr.is_empty());
}

#[test]
fn missing_config_file_is_reported() {
    let output = run(&["--config", "/nonexistent/ssml.json", "export"], "<p></p>");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("ssml.json"));
}
