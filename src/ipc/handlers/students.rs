use crate::error::Result;
use crate::ipc::error::{fail, ok};
use crate::ipc::helpers::{required_str, require_workspace};
use crate::ipc::types::{AppState, Request};
use crate::registry;
use crate::workspace::Workspace;
use serde_json::json;

pub(crate) fn students_json(ws: &Workspace) -> Result<serde_json::Value> {
    let students = registry::list_students(ws)?;
    Ok(serde_json::to_value(students)?)
}

fn students_register(ws: &Workspace, params: &serde_json::Value) -> Result<serde_json::Value> {
    let id = required_str(params, "id")?;
    let name = required_str(params, "name")?;
    let student = registry::register_student(ws, &id, &name)?;
    tracing::info!(student_id = %student.id, "student registered");
    Ok(json!({
        "student": student,
        "message": format!("Student {} registered successfully!", student.name),
        "students": students_json(ws)?,
    }))
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match require_workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    match students_json(ws) {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => fail(&req.id, &e),
    }
}

fn handle_students_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let ws = match require_workspace(state, req) {
        Ok(ws) => ws,
        Err(resp) => return resp,
    };
    match students_register(ws, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => fail(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.register" => Some(handle_students_register(state, req)),
        _ => None,
    }
}
