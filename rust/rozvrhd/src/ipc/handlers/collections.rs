use crate::document::{Collection, Document};
use crate::error::ImportError;
use crate::ipc::helpers::{
    committed, get_collection, get_optional_str, get_required_str, respond, store_mut, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{
    class_by_id, classroom_type_for_tag, recommended_classrooms, subject_by_id, subject_label,
    teacher_by_id, Blocking, BlockingId, ClassId, ClassroomType, ClassroomTypeId, SubjectCode,
    SubjectId, Teacher, TeacherId,
};
use crate::record::{check_records, with_record_type, Record, TeacherPatch};
use crate::storage::SqliteStorage;
use crate::store::SnapshotStore;
use serde_json::{json, Map, Value};
use uuid::Uuid;

type Store = SnapshotStore<SqliteStorage>;

fn list<R: Record>(doc: &Document) -> Value {
    json!({ "collection": R::COLLECTION.as_str(), "records": R::items(doc) })
}

/// Display names for the references a listed collection holds. Subject codes resolve to
/// subject names and classroom tags to classroom type names; dangling keys map to themselves.
fn reference_labels(collection: Collection, doc: &Document) -> Map<String, Value> {
    let mut labels = Map::new();
    let codes: Vec<&SubjectCode> = match collection {
        Collection::Classes => doc.classes.iter().flat_map(|c| &c.subjects).collect(),
        Collection::Teachers => doc.teachers.iter().flat_map(|t| &t.subjects).collect(),
        Collection::StudyPrograms => doc.study_programs.iter().flat_map(|p| &p.subjects).collect(),
        Collection::Classrooms => {
            for room in &doc.classrooms {
                let label = classroom_type_for_tag(&doc.classroom_types, &room.kind)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| room.kind.to_string());
                labels.insert(room.kind.to_string(), json!(label));
            }
            return labels;
        }
        Collection::Subjects | Collection::ClassroomTypes => return labels,
    };
    for code in codes {
        labels.insert(code.to_string(), json!(subject_label(&doc.subjects, code)));
    }
    labels
}

fn add<R: Record>(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let mut record = match params.get("record") {
        Some(Value::Object(map)) => map.clone(),
        _ => return Err(HandlerErr::bad_params("record must be an object")),
    };
    let has_id = matches!(record.get("id"), Some(Value::String(s)) if !s.trim().is_empty());
    if !has_id {
        record.insert("id".into(), json!(Uuid::new_v4().to_string()));
    }
    // Types created through requests are user-defined unless stated otherwise.
    if R::COLLECTION == Collection::ClassroomTypes && !record.contains_key("isCustom") {
        record.insert("isCustom".into(), json!(true));
    }
    let record: R = serde_json::from_value(Value::Object(record)).map_err(|e| {
        HandlerErr::bad_params(format!("invalid {} record: {}", R::COLLECTION, e))
    })?;
    record.validate().map_err(HandlerErr::bad_params)?;
    if R::items(&store.load()).iter().any(|r| r.id() == record.id()) {
        return Err(HandlerErr::new(
            "duplicate_id",
            format!("id already exists: {}", record.id()),
        ));
    }

    committed(store.add_record(record.clone()))?;
    tracing::debug!(collection = %R::COLLECTION, id = %record.id(), "record added");
    Ok(json!({ "record": record, "saved": true }))
}

fn update<R: Record>(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let id = R::Id::from(get_required_str(params, "id")?);
    let patch: R::Patch = match params.get("patch") {
        Some(v @ Value::Object(_)) => serde_json::from_value(v.clone())
            .map_err(|e| HandlerErr::bad_params(format!("invalid patch: {}", e)))?,
        _ => return Err(HandlerErr::bad_params("patch must be an object")),
    };
    let doc = committed(store.update_record::<R>(&id, patch))?;
    let record = R::items(&doc).iter().find(|r| *r.id() == id);
    Ok(json!({ "saved": true, "found": record.is_some(), "record": record }))
}

fn remove<R: Record>(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let id = R::Id::from(get_required_str(params, "id")?);
    committed(store.remove_record::<R>(&id))?;
    Ok(json!({ "saved": true }))
}

fn replace<R: Record>(store: &mut Store, params: &Value) -> Result<Value, HandlerErr> {
    let records: Vec<R> = match params.get("records") {
        Some(v @ Value::Array(_)) => serde_json::from_value(v.clone()).map_err(|e| {
            HandlerErr::bad_params(format!("invalid {} records: {}", R::COLLECTION, e))
        })?,
        _ => return Err(HandlerErr::bad_params("records must be an array")),
    };
    check_records(&records).map_err(|e| match e {
        ImportError::DuplicateId { .. } => HandlerErr::from(e),
        other => HandlerErr::bad_params(other.to_string()),
    })?;
    let count = records.len();
    committed(store.replace_collection(records))?;
    Ok(json!({ "saved": true, "count": count }))
}

fn collection_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let collection = get_collection(&req.params)?;
    let doc = store_mut(state)?.load();
    let mut result = with_record_type!(collection, R => list::<R>(&doc));
    result["labels"] = Value::Object(reference_labels(collection, &doc));
    Ok(result)
}

fn collection_add(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let collection = get_collection(&req.params)?;
    let store = store_mut(state)?;
    with_record_type!(collection, R => add::<R>(store, &req.params))
}

fn collection_update(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let collection = get_collection(&req.params)?;
    let store = store_mut(state)?;
    with_record_type!(collection, R => update::<R>(store, &req.params))
}

fn collection_remove(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let collection = get_collection(&req.params)?;
    let store = store_mut(state)?;
    if collection == Collection::ClassroomTypes {
        let id = ClassroomTypeId::from(get_required_str(&req.params, "id")?);
        let types = store.collection::<ClassroomType>();
        if let Some(t) = types.iter().find(|t| t.id == id && !t.is_custom) {
            return Err(HandlerErr::new(
                "builtin_protected",
                format!("built-in classroom type cannot be removed: {}", t.name),
            ));
        }
    }
    with_record_type!(collection, R => remove::<R>(store, &req.params))
}

fn collection_replace(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let collection = get_collection(&req.params)?;
    let store = store_mut(state)?;
    with_record_type!(collection, R => replace::<R>(store, &req.params))
}

fn find_teacher(store: &Store, params: &Value) -> Result<Teacher, HandlerErr> {
    let id = TeacherId::from(get_required_str(params, "teacherId")?);
    teacher_by_id(&store.collection::<Teacher>(), &id)
        .cloned()
        .ok_or_else(|| {
            HandlerErr::new("not_found", "teacher not found")
                .with_details(json!({ "teacherId": id }))
        })
}

fn blockings_add(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = store_mut(state)?;
    let teacher = find_teacher(store, &req.params)?;
    let day = get_required_str(&req.params, "day")?;
    let start = get_required_str(&req.params, "startSlot")?;
    let end = get_optional_str(&req.params, "endSlot").unwrap_or_else(|| start.clone());
    let reason = get_optional_str(&req.params, "reason").unwrap_or_default();

    let added = Teacher::blockings_for_range(&day, &start, &end, &reason)
        .map_err(|e| HandlerErr::bad_params(e.to_string()))?;
    let mut blockings = teacher.blockings.clone();
    blockings.extend(added.iter().cloned());
    let patch = TeacherPatch {
        blockings: Some(blockings),
        ..TeacherPatch::default()
    };
    committed(store.update_record::<Teacher>(&teacher.id, patch))?;
    Ok(json!({ "saved": true, "added": added }))
}

fn blockings_remove(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = store_mut(state)?;
    let teacher = find_teacher(store, &req.params)?;
    let blocking_id = BlockingId::from(get_required_str(&req.params, "blockingId")?);
    let blockings: Vec<Blocking> = teacher
        .blockings
        .iter()
        .filter(|b| b.id != blocking_id)
        .cloned()
        .collect();
    let removed = teacher.blockings.len() - blockings.len();
    let patch = TeacherPatch {
        blockings: Some(blockings),
        ..TeacherPatch::default()
    };
    committed(store.update_record::<Teacher>(&teacher.id, patch))?;
    Ok(json!({ "saved": true, "removed": removed }))
}

fn teacher_is_blocked(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = store_mut(state)?;
    let teacher = find_teacher(store, &req.params)?;
    let day = get_required_str(&req.params, "day")?;
    let slot = get_required_str(&req.params, "timeSlot")?;
    Ok(json!({ "blocked": teacher.is_blocked(&day, &slot) }))
}

fn classrooms_recommended(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let doc = store_mut(state)?.load();
    let subject = match get_optional_str(&req.params, "subjectId") {
        Some(id) => Some(
            subject_by_id(&doc.subjects, &SubjectId::from(id))
                .ok_or_else(|| HandlerErr::new("not_found", "subject not found"))?,
        ),
        None => None,
    };
    let recommended = recommended_classrooms(subject, &doc.classrooms);
    let others: Vec<_> = doc
        .classrooms
        .iter()
        .filter(|c| !recommended.iter().any(|r| r.id == c.id))
        .collect();
    Ok(json!({ "recommended": recommended, "others": others }))
}

fn selection_get(state: &mut AppState) -> Result<Value, HandlerErr> {
    let selected = store_mut(state)?.selected_class();
    Ok(json!({ "selectedClass": selected }))
}

fn selection_set(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let store = store_mut(state)?;
    let class = match req.params.get("classId") {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => {
            let classes = store.load().classes;
            let found = class_by_id(&classes, &ClassId::from(id.as_str())).cloned();
            Some(found.ok_or_else(|| {
                HandlerErr::new("not_found", "class not found")
                    .with_details(json!({ "classId": id }))
            })?)
        }
        Some(_) => return Err(HandlerErr::bad_params("classId must be a string or null")),
    };
    let doc = committed(store.set_selected_class(class))?;
    Ok(json!({ "saved": true, "selectedClass": doc.selected_class }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "collection.list" => collection_list(state, req),
        "collection.add" => collection_add(state, req),
        "collection.update" => collection_update(state, req),
        "collection.remove" => collection_remove(state, req),
        "collection.replace" => collection_replace(state, req),
        "teachers.blockings.add" => blockings_add(state, req),
        "teachers.blockings.remove" => blockings_remove(state, req),
        "teachers.isBlocked" => teacher_is_blocked(state, req),
        "classrooms.recommended" => classrooms_recommended(state, req),
        "selection.get" => selection_get(state),
        "selection.set" => selection_set(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
