use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn workspace_and_file_names_come_from_config() {
    let root = temp_dir("attendd-config");
    let workspace = root.join("class-a");
    let config_path = root.join("attendd.toml");
    std::fs::write(
        &config_path,
        format!(
            "workspace = {:?}\nstudents_file = \"roster.json\"\n",
            workspace.to_string_lossy()
        ),
    )
    .expect("write config");

    let mut child = Command::new(env!("CARGO_BIN_EXE_attendd"))
        .env("ATTENDD_CONFIG", &config_path)
        .env_remove("ATTENDD_WORKSPACE")
        .env("ATTENDD_ATTENDANCE_FILE", "log.csv")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendd");
    let mut stdin = child.stdin.take().expect("child stdin");
    let mut reader = BufReader::new(child.stdout.take().expect("child stdout"));

    writeln!(stdin, "{}", json!({ "id": "1", "method": "health" })).expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let health: serde_json::Value = serde_json::from_str(line.trim()).expect("parse");
    assert_eq!(
        health["result"]["workspacePath"].as_str(),
        Some(workspace.to_string_lossy().as_ref())
    );

    writeln!(
        stdin,
        "{}",
        json!({ "id": "2", "method": "students.register", "params": { "id": "1", "name": "Alice" } })
    )
    .expect("write");
    stdin.flush().expect("flush");
    line.clear();
    reader.read_line(&mut line).expect("read");
    let reg: serde_json::Value = serde_json::from_str(line.trim()).expect("parse");
    assert_eq!(reg["ok"], true);

    drop(stdin);
    let _ = child.wait();

    assert!(workspace.join("roster.json").is_file());
    assert!(workspace.join("log.csv").is_file());
    assert!(!workspace.join("students.json").exists());
    let roster = std::fs::read_to_string(workspace.join("roster.json")).expect("roster");
    assert!(roster.contains("Alice"));

    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn invalid_config_fails_startup() {
    let root = temp_dir("attendd-config-bad");
    let config_path = root.join("attendd.toml");
    std::fs::write(&config_path, "students_file = \"../escape.json\"\n").expect("write config");

    let status = Command::new(env!("CARGO_BIN_EXE_attendd"))
        .env("ATTENDD_CONFIG", &config_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("run attendd");
    assert!(!status.success());

    let _ = std::fs::remove_dir_all(root);
}
