use crate::exchange::{
    collection_to_csv, collection_to_json, document_patch_from_payload, document_to_json,
    export_timestamp, import_from_file, records_from_payload, schedule_to_json, FileFormat,
    ImportPayload, ScheduleImport,
};
use crate::ipc::helpers::{
    committed, get_collection, get_optional_str, get_required_path, respond, store_mut,
    write_output, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{class_by_id, ClassId};
use crate::record::{with_record_type, Record};
use crate::storage::SqliteStorage;
use crate::store::SnapshotStore;
use serde_json::json;
use std::path::Path;

fn serialize_failed(e: serde_json::Error) -> HandlerErr {
    HandlerErr::new("export_failed", e.to_string())
}

/// Parses the whole file before anything is applied.
fn read_payload(state: &mut AppState, path: &Path) -> Result<ImportPayload, HandlerErr> {
    if state.store.is_none() {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    }
    let payload = state
        .runtime
        .block_on(import_from_file(state.files.as_ref(), path))?;
    Ok(payload)
}

fn export_records<R: Record>(
    store: &SnapshotStore<SqliteStorage>,
    format: FileFormat,
) -> Result<(String, usize), HandlerErr> {
    let records = store.collection::<R>();
    let text = match format {
        FileFormat::Csv => collection_to_csv(&records),
        FileFormat::Json => collection_to_json(&records).map_err(serialize_failed)?,
    };
    Ok((text, records.len()))
}

fn import_records<R: Record>(
    store: &mut SnapshotStore<SqliteStorage>,
    payload: ImportPayload,
) -> Result<usize, HandlerErr> {
    let records: Vec<R> = records_from_payload(payload)?;
    let count = records.len();
    committed(store.import_collection(records))?;
    Ok(count)
}

fn export_collection(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let collection = get_collection(&req.params)?;
    let out_path = get_required_path(&req.params, "outPath")?;
    let format = match get_optional_str(&req.params, "format") {
        Some(name) => FileFormat::parse(&name)
            .ok_or_else(|| HandlerErr::bad_params(format!("unsupported format: {}", name)))?,
        None => FileFormat::from_path(&out_path)
            .map_err(|e| HandlerErr::bad_params(e.to_string()))?,
    };

    let store = store_mut(state)?;
    let (text, count) = with_record_type!(collection, R => export_records::<R>(store, format))?;
    write_output(&out_path, &text)?;
    tracing::info!(%collection, count, path = %out_path.display(), "collection exported");
    Ok(json!({ "path": out_path.to_string_lossy(), "count": count }))
}

fn import_collection(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let collection = get_collection(&req.params)?;
    let in_path = get_required_path(&req.params, "inPath")?;
    let payload = read_payload(state, &in_path)?;

    let store = store_mut(state)?;
    let count = with_record_type!(collection, R => import_records::<R>(store, payload))?;
    Ok(json!({ "saved": true, "collection": collection.as_str(), "count": count }))
}

fn export_all(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let out_path = get_required_path(&req.params, "outPath")?;
    let doc = store_mut(state)?.load();
    let export_date = export_timestamp();
    let text = document_to_json(&doc, &export_date).map_err(serialize_failed)?;
    write_output(&out_path, &text)?;
    tracing::info!(path = %out_path.display(), "document exported");
    Ok(json!({ "path": out_path.to_string_lossy(), "exportDate": export_date }))
}

fn import_all(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let in_path = get_required_path(&req.params, "inPath")?;
    let payload = read_payload(state, &in_path)?;
    let patch = document_patch_from_payload(payload)?;
    let provenance = patch.provenance.clone();
    let ignored = patch.ignored_keys.clone();

    committed(store_mut(state)?.import_document(patch))?;
    Ok(json!({
        "saved": true,
        "ignoredKeys": ignored,
        "provenance": provenance,
    }))
}

fn target_class_id(state: &mut AppState, req: &Request) -> Result<Option<ClassId>, HandlerErr> {
    if let Some(id) = get_optional_str(&req.params, "classId") {
        return Ok(Some(ClassId::from(id)));
    }
    Ok(store_mut(state)?.selected_class().map(|c| c.id))
}

fn export_schedule(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let out_path = get_required_path(&req.params, "outPath")?;
    let class_id = target_class_id(state, req)?
        .ok_or_else(|| HandlerErr::bad_params("no classId given and no class selected"))?;
    let doc = store_mut(state)?.load();
    let class = class_by_id(&doc.classes, &class_id).ok_or_else(|| {
        HandlerErr::new("not_found", "class not found").with_details(json!({ "classId": class_id }))
    })?;
    let schedule = doc.schedule.get(&class_id).cloned().unwrap_or_default();

    let text = schedule_to_json(class, &schedule, &export_timestamp()).map_err(serialize_failed)?;
    write_output(&out_path, &text)?;
    Ok(json!({ "path": out_path.to_string_lossy(), "classId": class_id }))
}

fn import_schedule(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let in_path = get_required_path(&req.params, "inPath")?;
    let confirmed = req
        .params
        .get("confirm")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    let payload = read_payload(state, &in_path)?;
    let import = ScheduleImport::from_payload(payload)?;
    let target = target_class_id(state, req)?;
    let class_id = import.resolve_target(target.as_ref(), confirmed)?;

    let count = import.schedule.assignment_count();
    committed(store_mut(state)?.set_schedule(&class_id, import.schedule))?;
    tracing::info!(class = %class_id, from = %import.class_id, count, "schedule imported");
    Ok(json!({
        "saved": true,
        "classId": class_id,
        "sourceClassId": import.class_id,
        "assignmentCount": count,
        "provenance": import.provenance,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "exchange.exportCollection" => export_collection(state, req),
        "exchange.importCollection" => import_collection(state, req),
        "exchange.exportAll" => export_all(state, req),
        "exchange.importAll" => import_all(state, req),
        "exchange.exportSchedule" => export_schedule(state, req),
        "exchange.importSchedule" => import_schedule(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
