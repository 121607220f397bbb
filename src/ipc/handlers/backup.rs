use crate::attendance::AttendanceLog;
use crate::backup;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::helpers::{optional_str, require_workspace};
use crate::ipc::types::{AppState, Request};
use crate::registry::StudentRecord;
use anyhow::anyhow;
use serde_json::json;
use std::collections::HashSet;
use std::path::PathBuf;

/// Restored bytes must load the same way the stores are read at runtime.
fn validate_restored_stores(students: &[u8], attendance: &[u8]) -> anyhow::Result<()> {
    let students: Vec<StudentRecord> = if students.iter().all(u8::is_ascii_whitespace) {
        Vec::new()
    } else {
        serde_json::from_slice(students)
            .map_err(|e| anyhow!("students.json is not a student registry: {e}"))?
    };
    let mut seen = HashSet::new();
    if let Some(dup) = students.iter().find(|s| !seen.insert(s.id.as_str())) {
        return Err(anyhow!("students.json repeats student id {:?}", dup.id));
    }
    let text = std::str::from_utf8(attendance)
        .map_err(|e| anyhow!("attendance.csv is not UTF-8: {e}"))?;
    AttendanceLog::parse(text)
        .map_err(|e| anyhow!("attendance.csv is not an attendance log: {e}"))?;
    Ok(())
}

fn handle_backup_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(out_path) = optional_str(&req.params, "outPath").map(str::to_string) else {
        return err(&req.id, "bad_params", "missing outPath", None);
    };
    let ws = match require_workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };

    let _guard = match ws.lock() {
        Ok(g) => g,
        Err(e) => return fail(&req.id, &e),
    };
    let out = PathBuf::from(&out_path);
    let export =
        match backup::export_workspace_bundle(ws.students_path(), ws.attendance_path(), &out) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "backup export failed");
                return err(
                    &req.id,
                    "io_failed",
                    e.to_string(),
                    Some(json!({ "path": out_path })),
                );
            }
        };
    tracing::info!(path = %out_path, "workspace bundle exported");

    ok(
        &req.id,
        json!({
            "ok": true,
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count
        }),
    )
}

fn handle_backup_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(in_path) = optional_str(&req.params, "inPath").map(str::to_string) else {
        return err(&req.id, "bad_params", "missing inPath", None);
    };
    let ws = match require_workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    let _guard = match ws.lock() {
        Ok(g) => g,
        Err(e) => return fail(&req.id, &e),
    };
    let import = match backup::import_workspace_bundle(
        &src,
        ws.students_path(),
        ws.attendance_path(),
        validate_restored_stores,
    ) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "backup import failed");
            return err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": in_path })),
            );
        }
    };
    tracing::info!(path = %in_path, "workspace bundle imported");

    ok(
        &req.id,
        json!({
            "ok": true,
            "workspacePath": ws.root().to_string_lossy(),
            "bundleFormatDetected": import.bundle_format_detected,
            "studentsBytes": import.students_bytes,
            "attendanceBytes": import.attendance_bytes
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_backup_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_backup_import_workspace_bundle(state, req)),
        _ => None,
    }
}
