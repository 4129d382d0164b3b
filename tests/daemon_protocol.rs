use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_reportcardd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn reportcardd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_raw(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn error_code(resp: &serde_json::Value) -> Option<&str> {
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

#[test]
fn protocol_error_envelopes() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let health = request_raw(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert!(health["result"]["workspacePath"].is_null());

    let unknown = request_raw(&mut stdin, &mut reader, "2", "students.list", json!({}));
    assert_eq!(unknown.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(error_code(&unknown), Some("not_implemented"));

    // Export requires a selected workspace.
    let export = request_raw(
        &mut stdin,
        &mut reader,
        "3",
        "report.export",
        json!({
            "student": { "fullName": "Ama Mensah" },
            "term": { "name": "Term 1", "year": "2025" },
            "school": { "name": "Sunrise Academy" }
        }),
    );
    assert_eq!(error_code(&export), Some("no_workspace"));

    let bad = request_raw(&mut stdin, &mut reader, "4", "grading.resolve", json!({}));
    assert_eq!(error_code(&bad), Some("bad_params"));

    let _ = child.kill();
}

#[test]
fn resolver_methods_answer_without_a_workspace() {
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let grade = request_raw(
        &mut stdin,
        &mut reader,
        "1",
        "grading.resolve",
        json!({ "percentage": 85 }),
    );
    assert_eq!(
        grade["result"]["grade"].as_str(),
        Some("A"),
        "fallback ladder over IPC"
    );

    let banded = request_raw(
        &mut stdin,
        &mut reader,
        "2",
        "grading.resolve",
        json!({
            "percentage": 85,
            "gradingBands": [
                { "gradeName": "Distinction", "minPercentage": 80, "maxPercentage": 100 }
            ]
        }),
    );
    assert_eq!(banded["result"]["grade"].as_str(), Some("Distinction"));

    let comment = request_raw(
        &mut stdin,
        &mut reader,
        "3",
        "comments.resolve",
        json!({ "kind": "headteacher", "average": 55 }),
    );
    assert_eq!(
        comment["result"]["comment"].as_str(),
        Some("Excellent progress this term.")
    );

    let templates = request_raw(&mut stdin, &mut reader, "4", "templates.list", json!({}));
    let list = templates["result"]["templates"]
        .as_array()
        .expect("templates array");
    assert_eq!(list.len(), 4);
    assert_eq!(list[0]["key"].as_str(), Some("classic"));

    let _ = child.kill();
}
