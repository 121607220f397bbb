use crate::attendance::DATE_FORMAT;
use crate::error::{Error, Result};
use crate::ipc::error::{fail, ok, warning};
use crate::ipc::handlers::attendance::attendance_view;
use crate::ipc::handlers::students::students_json;
use crate::ipc::helpers::{required_str, require_workspace};
use crate::ipc::types::{AppState, Request};
use crate::workspace::Workspace;
use serde_json::json;

/// Sidebar entries, in display order.
const VIEWS: [(&str, &str); 3] = [
    ("register", "Register Students"),
    ("mark", "Mark Attendance"),
    ("view", "View Attendance"),
];

fn views_open(ws: &Workspace, params: &serde_json::Value) -> Result<serde_json::Value> {
    let view = required_str(params, "view")?;
    match view.as_str() {
        "register" => Ok(json!({
            "view": "register",
            "title": "Register a New Student",
            "students": students_json(ws)?,
        })),
        "mark" => {
            let students = students_json(ws)?;
            let empty = students.as_array().map(|a| a.is_empty()).unwrap_or(true);
            let warnings = if empty {
                vec![warning("empty_registry", "No students registered yet!")]
            } else {
                Vec::new()
            };
            Ok(json!({
                "view": "mark",
                "title": "Mark Attendance",
                "today": chrono::Local::now().date_naive().format(DATE_FORMAT).to_string(),
                "students": students,
                "warnings": warnings,
            }))
        }
        "view" => {
            let mut model = attendance_view(ws)?;
            model["view"] = json!("view");
            model["title"] = json!("View Attendance Records");
            Ok(model)
        }
        other => Err(Error::bad_params(format!("unknown view: {}", other))),
    }
}

fn handle_views_list(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let views: Vec<serde_json::Value> = VIEWS
        .iter()
        .map(|(key, title)| json!({ "key": key, "title": title }))
        .collect();
    ok(
        &req.id,
        json!({ "title": "Attendance Management System", "views": views }),
    )
}

fn handle_views_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match require_workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    match views_open(ws, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "views.list" => Some(handle_views_list(state, req)),
        "views.open" => Some(handle_views_open(state, req)),
        _ => None,
    }
}
