use crate::grid::build_grid;
use crate::ipc::helpers::{
    committed, get_optional_str, get_required_str, respond, store_mut, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{create_assignment, ClassId, ClassroomId, SubjectId};
use crate::schedule::Schedule;
use serde_json::json;

fn class_id_param(req: &Request) -> Result<ClassId, HandlerErr> {
    get_optional_str(&req.params, "classId")
        .map(ClassId::from)
        .ok_or_else(|| HandlerErr::bad_params("missing classId"))
}

fn schedule_get(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = class_id_param(req)?;
    let schedule = store_mut(state)?.schedule(&class_id);
    Ok(json!({ "classId": class_id, "schedule": schedule }))
}

fn schedule_set(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = class_id_param(req)?;
    let schedule: Schedule = match req.params.get("schedule") {
        Some(v @ serde_json::Value::Object(_)) => serde_json::from_value(v.clone())
            .map_err(|e| HandlerErr::bad_params(format!("invalid schedule: {}", e)))?,
        _ => return Err(HandlerErr::bad_params("schedule must be an object")),
    };
    committed(store_mut(state)?.set_schedule(&class_id, schedule))?;
    Ok(json!({ "saved": true }))
}

fn schedule_assign(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = class_id_param(req)?;
    let day = get_required_str(&req.params, "day")?;
    let slot = get_required_str(&req.params, "timeSlot")?;
    let subject_id = SubjectId::from(get_required_str(&req.params, "subjectId")?);
    let classroom_id = ClassroomId::from(get_required_str(&req.params, "classroomId")?);

    let store = store_mut(state)?;
    let assignment = create_assignment(subject_id, classroom_id);
    let next = store
        .schedule(&class_id)
        .with_assignment(&day, &slot, assignment.clone());
    committed(store.set_schedule(&class_id, next))?;
    Ok(json!({ "saved": true, "assignment": assignment }))
}

fn schedule_unassign(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = class_id_param(req)?;
    let day = get_required_str(&req.params, "day")?;
    let slot = get_required_str(&req.params, "timeSlot")?;
    let index = req
        .params
        .get("index")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| HandlerErr::bad_params("index must be a non-negative integer"))?;
    let index = usize::try_from(index).unwrap_or(usize::MAX);

    let store = store_mut(state)?;
    let current = store.schedule(&class_id);
    let next = current.without_assignment(&day, &slot, index);
    let removed = next != current;
    committed(store.set_schedule(&class_id, next))?;
    Ok(json!({ "saved": true, "removed": removed }))
}

fn schedule_grid(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = class_id_param(req)?;
    let doc = store_mut(state)?.load();
    let schedule = doc.schedule.get(&class_id).cloned().unwrap_or_default();
    let grid = build_grid(&schedule, &doc.subjects, &doc.classrooms);
    Ok(json!({ "classId": class_id, "grid": grid }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "schedule.get" => schedule_get(state, req),
        "schedule.set" => schedule_set(state, req),
        "schedule.assign" => schedule_assign(state, req),
        "schedule.unassign" => schedule_unassign(state, req),
        "schedule.grid" => schedule_grid(state, req),
        _ => return None,
    };
    Some(respond(req, result))
}
