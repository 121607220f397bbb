use crate::error::Error;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Error response for a store-level failure.
pub fn fail(id: &str, e: &Error) -> serde_json::Value {
    let details = match e {
        Error::DuplicateId { id } | Error::UnknownStudent { id } => {
            Some(json!({ "studentId": id }))
        }
        Error::LogFormat { line, .. } => Some(json!({ "line": line })),
        Error::RegistryFormat { path, .. } | Error::Io { path, .. } | Error::Lock { path, .. } => {
            Some(json!({ "path": path.to_string_lossy() }))
        }
        _ => None,
    };
    match e {
        Error::DuplicateId { .. } | Error::BadParams(_) | Error::UnknownStudent { .. } => {
            tracing::info!(code = e.code(), error = %e, "request rejected")
        }
        _ => tracing::warn!(code = e.code(), error = %e, "request failed"),
    }
    err(id, e.code(), e.to_string(), details)
}

/// Advisory notice carried inside a successful result.
pub fn warning(code: &str, message: &str) -> serde_json::Value {
    json!({ "code": code, "message": message })
}
