use crate::error::{Error, Result};
use crate::workspace::{self, Workspace};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
}

pub fn list_students(ws: &Workspace) -> Result<Vec<StudentRecord>> {
    let _guard = ws.lock()?;
    read_students(ws.students_path())
}

/// Append a student unless the id is already taken. Fields are stored as
/// given and ids compare byte for byte; blank fields are rejected.
pub fn register_student(ws: &Workspace, id: &str, name: &str) -> Result<StudentRecord> {
    if id.trim().is_empty() {
        return Err(Error::bad_params("student id must not be empty"));
    }
    if name.trim().is_empty() {
        return Err(Error::bad_params("student name must not be empty"));
    }

    let _guard = ws.lock()?;
    let mut students = read_students(ws.students_path())?;
    if students.iter().any(|s| s.id == id) {
        return Err(Error::DuplicateId { id: id.to_string() });
    }
    let record = StudentRecord {
        id: id.to_string(),
        name: name.to_string(),
    };
    students.push(record.clone());
    write_students(ws.students_path(), &students)?;
    Ok(record)
}

/// Caller must hold the workspace lock.
pub(crate) fn read_students(path: &Path) -> Result<Vec<StudentRecord>> {
    let Some(text) = workspace::read_optional(path)? else {
        return Ok(Vec::new());
    };
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&text).map_err(|e| Error::RegistryFormat {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Caller must hold the workspace lock.
pub(crate) fn write_students(path: &Path, students: &[StudentRecord]) -> Result<()> {
    let text = serde_json::to_string_pretty(students)?;
    workspace::write_atomic(path, text.as_bytes())
}
