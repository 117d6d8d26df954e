use crate::config::Config;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{committed, respond, store_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::seed;
use crate::storage::SqliteStorage;
use crate::store::SnapshotStore;
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let config = match Config::load(&path) {
        Ok(c) => c,
        Err(e) => {
            return err(
                &req.id,
                "bad_config",
                e.to_string(),
                Some(json!({ "path": crate::config::config_path(&path).to_string_lossy() })),
            )
        }
    };

    match db::open_db(&path) {
        Ok(conn) => {
            let storage = SqliteStorage::new(conn, config.quota());
            let mut store = SnapshotStore::with_key(storage, config.storage_key.clone());
            let seeded = if config.seed_defaults {
                // A rejected seed write still leaves the workspace usable.
                store.seed_if_empty().map(|m| m.saved).unwrap_or(false)
            } else {
                false
            };
            tracing::info!(workspace = %path.display(), seeded, "workspace selected");

            state.workspace = Some(path.clone());
            state.store = Some(store);
            state.config = config;
            ok(
                &req.id,
                json!({ "workspacePath": path.to_string_lossy(), "seeded": seeded }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn document_get(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let doc = store_mut(state)?.load();
    Ok(json!({
        "document": doc,
        "isDataLoaded": doc.is_data_loaded(),
    }))
}

fn data_reset(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let defaults = req
        .params
        .get("defaults")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let replacement = defaults.then(seed::default_document);
    let doc = committed(store_mut(state)?.reset(replacement))?;
    tracing::info!(defaults, "workspace data reset");
    Ok(json!({ "saved": true, "document": doc }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "document.get" => Some(respond(req, document_get(state))),
        "data.reset" => Some(respond(req, data_reset(state, req))),
        _ => None,
    }
}
