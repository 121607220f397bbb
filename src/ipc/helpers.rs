use crate::error::{Error, Result};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::workspace::Workspace;
use std::collections::HashSet;

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::bad_params(format!("missing {}", key)))
}

pub fn optional_str<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// `params[key]` as a set of strings; absent or null reads as `None`.
pub fn string_set(params: &serde_json::Value, key: &str) -> Result<Option<HashSet<String>>> {
    let Some(v) = params.get(key) else {
        return Ok(None);
    };
    if v.is_null() {
        return Ok(None);
    }
    let Some(items) = v.as_array() else {
        return Err(Error::bad_params(format!("{} must be an array of strings", key)));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.to_string())
                .ok_or_else(|| Error::bad_params(format!("{} must be an array of strings", key)))
        })
        .collect::<Result<HashSet<_>>>()
        .map(Some)
}

pub fn require_workspace<'a>(
    state: &'a AppState,
    req: &Request,
) -> std::result::Result<&'a Workspace, serde_json::Value> {
    state
        .workspace
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}
