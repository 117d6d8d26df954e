use crate::backup;
use crate::ipc::helpers::{committed, get_required_path, respond, store_mut, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn export_bundle(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let out_path = get_required_path(&req.params, "outPath")?;
    let doc = store_mut(state)?.load();

    let export = backup::export_document_bundle(&doc, &out_path).map_err(|e| {
        HandlerErr::new("io_failed", format!("{e:#}"))
            .with_details(json!({ "path": out_path.to_string_lossy() }))
    })?;
    tracing::info!(path = %out_path.display(), sha256 = %export.document_sha256, "bundle exported");

    Ok(json!({
        "path": out_path.to_string_lossy(),
        "bundleFormat": export.bundle_format,
        "entryCount": export.entry_count,
        "documentSha256": export.document_sha256,
    }))
}

fn import_bundle(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let in_path = get_required_path(&req.params, "inPath")?;
    let store = store_mut(state)?;
    if !in_path.is_file() {
        return Err(HandlerErr::new("not_found", "bundle file not found")
            .with_details(json!({ "path": in_path.to_string_lossy() })));
    }

    let import = backup::import_document_bundle(&in_path).map_err(|e| {
        HandlerErr::new("import_failed", format!("{e:#}"))
            .with_details(json!({ "path": in_path.to_string_lossy() }))
    })?;
    committed(store.reset(Some(import.document)))?;
    tracing::info!(path = %in_path.display(), "bundle restored");

    Ok(json!({
        "saved": true,
        "bundleFormatDetected": import.bundle_format_detected,
        "exportedAt": import.exported_at,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "backup.exportBundle" => export_bundle(state, req),
        "backup.importBundle" => import_bundle(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
