use crate::document::{Collection, Document};
use crate::error::ImportError;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::storage::SqliteStorage;
use crate::store::{Mutation, SnapshotStore};
use serde_json::json;
use std::path::{Path, PathBuf};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr::new("bad_params", message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<ImportError> for HandlerErr {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::ConfirmationRequired {
                ref source_label,
                ref target_class,
            } => {
                let details = json!({
                    "sourceClass": source_label,
                    "targetClassId": target_class,
                });
                HandlerErr::new("confirmation_required", e.to_string()).with_details(details)
            }
            ImportError::DuplicateId { collection, ref id } => {
                let details = json!({ "collection": collection, "id": id });
                HandlerErr::new("duplicate_id", e.to_string()).with_details(details)
            }
            ImportError::Read { ref path, .. } => {
                let details = json!({ "path": path });
                HandlerErr::new("io_failed", e.to_string()).with_details(details)
            }
            other => HandlerErr::new("import_failed", other.to_string()),
        }
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn get_required_path(params: &serde_json::Value, key: &str) -> Result<PathBuf, HandlerErr> {
    get_optional_str(params, key)
        .map(PathBuf::from)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_collection(params: &serde_json::Value) -> Result<Collection, HandlerErr> {
    let name = get_required_str(params, "collection")?;
    Collection::parse(&name).ok_or_else(|| {
        HandlerErr::bad_params(format!("unknown collection: {}", name)).with_details(json!({
            "allowed": Collection::ALL.iter().map(|c| c.as_str()).collect::<Vec<_>>()
        }))
    })
}

pub fn store_mut(state: &mut AppState) -> Result<&mut SnapshotStore<SqliteStorage>, HandlerErr> {
    state
        .store
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

/// A rejected write is an error for the caller; the session copy is not reported back.
pub fn committed(m: Mutation) -> Result<Document, HandlerErr> {
    if !m.saved {
        return Err(HandlerErr::new(
            "storage_write_failed",
            "storage rejected the write; previous data kept",
        ));
    }
    Ok(m.document)
}

pub fn write_output(path: &Path, text: &str) -> Result<(), HandlerErr> {
    let io_failed = |e: std::io::Error| {
        HandlerErr::new("io_failed", e.to_string())
            .with_details(json!({ "path": path.to_string_lossy() }))
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_failed)?;
    }
    std::fs::write(path, text).map_err(io_failed)
}

pub fn respond(req: &Request, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => crate::ipc::error::ok(&req.id, v),
        Err(e) => e.response(&req.id),
    }
}
