#[path = "../src/backup.rs"]
mod backup;

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
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

fn accept_any(_students: &[u8], _attendance: &[u8]) -> anyhow::Result<()> {
    Ok(())
}

fn registry_and_header(students: &[u8], attendance: &[u8]) -> anyhow::Result<()> {
    let parsed: serde_json::Value = serde_json::from_slice(students)?;
    anyhow::ensure!(parsed.is_array(), "registry is not an array");
    anyhow::ensure!(
        attendance.starts_with(b"Date,Student ID,Name,Status\n"),
        "log header missing"
    );
    Ok(())
}

fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::Digest;
    format!("{:x}", sha2::Sha256::digest(bytes))
}

fn write_bundle(path: &std::path::Path, students: &[u8], attendance: &[u8]) {
    let out = File::create(path).expect("create bundle");
    let mut zip = zip::ZipWriter::new(out);
    let opts = zip::write::FileOptions::default();
    zip.start_file("manifest.json", opts).expect("manifest");
    write!(
        zip,
        "{}",
        serde_json::json!({
            "format": backup::BUNDLE_FORMAT_V1,
            "entries": {
                "data/students.json": { "sha256": sha256_hex(students) },
                "data/attendance.csv": { "sha256": sha256_hex(attendance) }
            }
        })
    )
    .expect("write manifest");
    zip.start_file("data/students.json", opts).expect("students");
    zip.write_all(students).expect("write students");
    zip.start_file("data/attendance.csv", opts).expect("attendance");
    zip.write_all(attendance).expect("write attendance");
    zip.finish().expect("finish");
}

const STUDENTS: &[u8] = br#"[{"id":"1","name":"Alice"}]"#;
const ATTENDANCE: &[u8] = b"Date,Student ID,Name,Status\n2024-01-01,1,Alice,Present\n";

#[test]
fn zip_export_and_import_roundtrip() {
    let src = temp_dir("attendd-backup-src");
    let dst = temp_dir("attendd-backup-dst");
    let out_dir = temp_dir("attendd-backup-out");

    std::fs::write(src.join("students.json"), STUDENTS).expect("write students");
    std::fs::write(src.join("attendance.csv"), ATTENDANCE).expect("write attendance");

    let bundle_path = out_dir.join("workspace.attendd.zip");
    let export = backup::export_workspace_bundle(
        &src.join("students.json"),
        &src.join("attendance.csv"),
        &bundle_path,
    )
    .expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT_V1);
    assert_eq!(export.entry_count, 3);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT_V1));
    assert!(manifest.contains("sha256"));
    archive
        .by_name("data/attendance.csv")
        .expect("attendance entry in bundle");

    std::fs::write(dst.join("students.json"), b"[]").expect("seed dst");
    let import = backup::import_workspace_bundle(
        &bundle_path,
        &dst.join("students.json"),
        &dst.join("attendance.csv"),
        accept_any,
    )
    .expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT_V1);
    assert_eq!(import.students_bytes, STUDENTS.len());

    assert_eq!(
        std::fs::read(dst.join("students.json")).expect("read students"),
        STUDENTS
    );
    assert_eq!(
        std::fs::read(dst.join("attendance.csv")).expect("read attendance"),
        ATTENDANCE
    );

    let _ = std::fs::remove_dir_all(src);
    let _ = std::fs::remove_dir_all(dst);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn tampered_bundle_is_rejected_and_leaves_stores_alone() {
    let dst = temp_dir("attendd-backup-tampered");
    let bundle_path = dst.join("tampered.zip");

    {
        let out = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(out);
        let opts = zip::write::FileOptions::default();
        zip.start_file("manifest.json", opts).expect("manifest");
        write!(
            zip,
            "{}",
            serde_json::json!({
                "format": backup::BUNDLE_FORMAT_V1,
                "entries": {
                    "data/students.json": { "sha256": "00" },
                    "data/attendance.csv": { "sha256": "00" }
                }
            })
        )
        .expect("write manifest");
        zip.start_file("data/students.json", opts).expect("students");
        zip.write_all(STUDENTS).expect("write students");
        zip.start_file("data/attendance.csv", opts).expect("attendance");
        zip.write_all(ATTENDANCE).expect("write attendance");
        zip.finish().expect("finish");
    }

    std::fs::write(dst.join("students.json"), b"[]").expect("seed");
    let e = backup::import_workspace_bundle(
        &bundle_path,
        &dst.join("students.json"),
        &dst.join("attendance.csv"),
        accept_any,
    )
    .expect_err("checksum mismatch");
    assert!(e.to_string().contains("checksum mismatch"));
    assert_eq!(std::fs::read(dst.join("students.json")).expect("read"), b"[]");
    assert!(!dst.join("attendance.csv").exists());

    let _ = std::fs::remove_dir_all(dst);
}

#[test]
fn unknown_bundle_format_is_rejected() {
    let dst = temp_dir("attendd-backup-format");
    let bundle_path = dst.join("other.zip");
    {
        let out = File::create(&bundle_path).expect("create bundle");
        let mut zip = zip::ZipWriter::new(out);
        zip.start_file("manifest.json", zip::write::FileOptions::default())
            .expect("manifest");
        zip.write_all(br#"{"format":"some-other-app-v2"}"#)
            .expect("write manifest");
        zip.finish().expect("finish");
    }
    let e = backup::import_workspace_bundle(
        &bundle_path,
        &dst.join("students.json"),
        &dst.join("attendance.csv"),
        accept_any,
    )
    .expect_err("format");
    assert!(e.to_string().contains("unsupported bundle format"));
    let _ = std::fs::remove_dir_all(dst);
}

#[test]
fn well_checksummed_garbage_is_rejected_before_any_file_moves() {
    let dst = temp_dir("attendd-backup-garbage");
    let bundle_path = dst.join("garbage.zip");
    write_bundle(
        &bundle_path,
        br#"{"not":"an array"}"#,
        b"garbage without header\n",
    );

    std::fs::write(dst.join("students.json"), STUDENTS).expect("seed students");
    std::fs::write(dst.join("attendance.csv"), ATTENDANCE).expect("seed attendance");

    let e = backup::import_workspace_bundle(
        &bundle_path,
        &dst.join("students.json"),
        &dst.join("attendance.csv"),
        registry_and_header,
    )
    .expect_err("contents rejected");
    assert!(format!("{e:#}").contains("registry is not an array"));

    assert_eq!(std::fs::read(dst.join("students.json")).expect("read"), STUDENTS);
    assert_eq!(std::fs::read(dst.join("attendance.csv")).expect("read"), ATTENDANCE);
    assert!(!dst.join("students.json.importing").exists());
    assert!(!dst.join("attendance.csv.importing").exists());

    let _ = std::fs::remove_dir_all(dst);
}

#[test]
fn valid_bundle_replaces_both_stores_and_leaves_no_staging_files() {
    let dst = temp_dir("attendd-backup-staged");
    let bundle_path = dst.join("good.zip");
    write_bundle(&bundle_path, STUDENTS, ATTENDANCE);

    std::fs::write(dst.join("students.json"), b"[]").expect("seed students");
    std::fs::write(dst.join("attendance.csv"), b"Date,Student ID,Name,Status\n")
        .expect("seed attendance");

    backup::import_workspace_bundle(
        &bundle_path,
        &dst.join("students.json"),
        &dst.join("attendance.csv"),
        registry_and_header,
    )
    .expect("import");

    assert_eq!(std::fs::read(dst.join("students.json")).expect("read"), STUDENTS);
    assert_eq!(std::fs::read(dst.join("attendance.csv")).expect("read"), ATTENDANCE);
    assert!(!dst.join("students.json.importing").exists());
    assert!(!dst.join("attendance.csv.importing").exists());

    let _ = std::fs::remove_dir_all(dst);
}
