use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const STUDENTS_ENTRY: &str = "data/students.json";
const ATTENDANCE_ENTRY: &str = "data/attendance.csv";
pub const BUNDLE_FORMAT_V1: &str = "attendd-workspace-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub students_bytes: usize,
    pub attendance_bytes: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn read_store(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.to_string_lossy()))
}

/// Caller must hold the workspace lock so both stores are from one state.
pub fn export_workspace_bundle(
    students_path: &Path,
    attendance_path: &Path,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let students = read_store(students_path)?;
    let attendance = read_store(attendance_path)?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let exported_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": exported_at,
        "entries": {
            STUDENTS_ENTRY: { "sha256": sha256_hex(&students), "bytes": students.len() },
            ATTENDANCE_ENTRY: { "sha256": sha256_hex(&attendance), "bytes": attendance.len() },
        }
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (entry, bytes) in [(STUDENTS_ENTRY, &students), (ATTENDANCE_ENTRY, &attendance)] {
        zip.start_file(entry, opts)
            .with_context(|| format!("failed to start {entry}"))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write {entry}"))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 3,
    })
}

/// Restore both stores from a bundle.
///
/// Nothing is replaced unless every checksum in the manifest matches and
/// `validate(students, attendance)` accepts the restored contents. Both files
/// are staged before either is renamed into place. Caller must hold the
/// workspace lock.
pub fn import_workspace_bundle<F>(
    in_path: &Path,
    students_path: &Path,
    attendance_path: &Path,
    validate: F,
) -> anyhow::Result<ImportSummary>
where
    F: FnOnce(&[u8], &[u8]) -> anyhow::Result<()>,
{
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut restored: Vec<Vec<u8>> = Vec::with_capacity(2);
    for entry in [STUDENTS_ENTRY, ATTENDANCE_ENTRY] {
        let mut bytes = Vec::new();
        archive
            .by_name(entry)
            .with_context(|| format!("bundle missing {entry}"))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {entry}"))?;
        let expected = manifest
            .get("entries")
            .and_then(|e| e.get(entry))
            .and_then(|e| e.get("sha256"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("manifest has no checksum for {entry}"))?;
        let actual = sha256_hex(&bytes);
        if actual != expected {
            return Err(anyhow!(
                "checksum mismatch for {entry}: expected {expected}, got {actual}"
            ));
        }
        restored.push(bytes);
    }

    let attendance = restored.pop().unwrap_or_default();
    let students = restored.pop().unwrap_or_default();
    validate(&students, &attendance).context("bundle contents rejected")?;

    let staged_students = stage_file(students_path, &students)?;
    let staged_attendance = match stage_file(attendance_path, &attendance) {
        Ok(p) => p,
        Err(e) => {
            let _ = std::fs::remove_file(&staged_students);
            return Err(e);
        }
    };
    if let Err(e) = commit_staged(&staged_students, students_path) {
        let _ = std::fs::remove_file(&staged_students);
        let _ = std::fs::remove_file(&staged_attendance);
        return Err(e);
    }
    if let Err(e) = commit_staged(&staged_attendance, attendance_path) {
        let _ = std::fs::remove_file(&staged_attendance);
        return Err(e);
    }

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        students_bytes: students.len(),
        attendance_bytes: attendance.len(),
    })
}

/// Write `bytes` next to `dst` as `<dst>.importing`, synced to disk.
fn stage_file(dst: &Path, bytes: &[u8]) -> anyhow::Result<PathBuf> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.to_string_lossy()))?;
    }
    let mut tmp_name = dst.as_os_str().to_os_string();
    tmp_name.push(".importing");
    let tmp = PathBuf::from(tmp_name);

    let written = File::create(&tmp)
        .and_then(|mut out| {
            out.write_all(bytes)?;
            out.sync_all()
        })
        .with_context(|| format!("failed to write temp file {}", tmp.to_string_lossy()));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(tmp)
}

fn commit_staged(tmp: &Path, dst: &Path) -> anyhow::Result<()> {
    std::fs::rename(tmp, dst).with_context(|| {
        format!(
            "failed to move restored file to {}",
            dst.to_string_lossy()
        )
    })
}
