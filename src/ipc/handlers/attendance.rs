use crate::attendance::{self, Selection, COLUMNS, DATE_FORMAT};
use crate::error::{Error, Result};
use crate::ipc::error::{fail, ok, warning};
use crate::ipc::helpers::{optional_str, require_workspace, string_set};
use crate::ipc::types::{AppState, Request};
use crate::workspace::Workspace;
use serde_json::json;
use std::path::PathBuf;

pub const EXPORT_FILE_NAME: &str = "attendance.csv";
pub const EXPORT_MIME_TYPE: &str = "text/csv";

fn parse_selection(params: &serde_json::Value) -> Result<Selection> {
    let ids = string_set(params, "presentIds")?;
    let names = string_set(params, "presentNames")?;
    match (ids, names) {
        (Some(_), Some(_)) => Err(Error::bad_params(
            "pass presentIds or presentNames, not both",
        )),
        (Some(ids), None) => Ok(Selection::ById(ids)),
        (None, Some(names)) => Ok(Selection::ByName(names)),
        (None, None) => Ok(Selection::ById(Default::default())),
    }
}

fn attendance_mark(ws: &Workspace, params: &serde_json::Value) -> Result<serde_json::Value> {
    let date = attendance::resolve_date(optional_str(params, "date"))?;
    let selection = parse_selection(params)?;
    let date_key = date.format(DATE_FORMAT).to_string();

    match attendance::mark_attendance(ws, date, &selection) {
        Ok(rows) => {
            let present = rows
                .iter()
                .filter(|r| r.status == attendance::Status::Present)
                .count();
            tracing::info!(
                date = %date_key,
                rows = rows.len(),
                present,
                "attendance marked"
            );
            Ok(json!({
                "date": date_key,
                "rowsAppended": rows.len(),
                "rows": rows,
                "message": "Attendance marked successfully!",
                "warnings": [],
            }))
        }
        Err(e @ Error::EmptyRegistry) => Ok(json!({
            "date": date_key,
            "rowsAppended": 0,
            "rows": [],
            "warnings": [warning(e.code(), &e.to_string())],
        })),
        Err(e) => Err(e),
    }
}

pub(crate) fn attendance_view(ws: &Workspace) -> Result<serde_json::Value> {
    let log = attendance::load_log(ws)?;
    let warnings = if log.is_empty() {
        vec![warning("empty_log", "No attendance records found!")]
    } else {
        Vec::new()
    };
    Ok(json!({
        "columns": COLUMNS,
        "rows": log.rows,
        "summary": log.summary(),
        "warnings": warnings,
    }))
}

fn attendance_export(ws: &Workspace, params: &serde_json::Value) -> Result<serde_json::Value> {
    let export = attendance::export_log(ws)?;
    let csv = String::from_utf8_lossy(&export.bytes).into_owned();
    let warnings = if export.rows == 0 {
        vec![warning("empty_log", "No attendance records found!")]
    } else {
        Vec::new()
    };

    let out_path = optional_str(params, "outPath").map(PathBuf::from);
    if let Some(out) = out_path.as_ref() {
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        std::fs::write(out, &export.bytes).map_err(|e| Error::io(out, e))?;
        tracing::info!(path = %out.display(), rows = export.rows, "attendance exported");
    }

    Ok(json!({
        "fileName": EXPORT_FILE_NAME,
        "mimeType": EXPORT_MIME_TYPE,
        "csv": csv,
        "rowsExported": export.rows,
        "path": out_path.map(|p| p.to_string_lossy().to_string()),
        "warnings": warnings,
    }))
}

fn handle_attendance_mark(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match require_workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    match attendance_mark(ws, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_attendance_view(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match require_workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    match attendance_view(ws) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_attendance_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match require_workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    match attendance_export(ws, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => Some(handle_attendance_mark(state, req)),
        "attendance.view" => Some(handle_attendance_view(state, req)),
        "attendance.export" => Some(handle_attendance_export(state, req)),
        _ => None,
    }
}
