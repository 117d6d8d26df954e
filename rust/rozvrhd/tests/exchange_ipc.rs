mod test_support;

use serde_json::json;
use test_support::{temp_dir, Sidecar};

fn path_str(p: &std::path::Path) -> String {
    p.to_string_lossy().to_string()
}

#[test]
fn subjects_csv_export_and_reimport_is_lossy_but_stable() {
    let workspace = temp_dir("rozvrh-csv");
    let csv = workspace.join("subjects.csv");
    let mut sidecar = Sidecar::spawn();
    sidecar.select_workspace(&workspace);

    let exported = sidecar.request_ok(
        "exchange.exportCollection",
        json!({ "collection": "subjects", "outPath": path_str(&csv) }),
    );
    assert_eq!(exported["count"], 15);
    let text = std::fs::read_to_string(&csv).expect("read csv");
    assert!(text.starts_with("id,name,code,year,recommendedClassrooms\n"));

    let imported = sidecar.request_ok(
        "exchange.importCollection",
        json!({ "collection": "subjects", "inPath": path_str(&csv) }),
    );
    assert_eq!(imported["count"], 15);

    let subjects = sidecar.request_ok("collection.list", json!({ "collection": "subjects" }));
    let physics = subjects["records"]
        .as_array()
        .expect("records")
        .iter()
        .find(|s| s["code"] == "FYZ")
        .cloned()
        .expect("FYZ");
    // "standard,lab" was split by the reader; only the first tag survives.
    assert_eq!(physics["recommendedClassrooms"], json!(["standard"]));
    assert_eq!(physics["year"], 1);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn full_document_export_survives_a_reset() {
    let workspace = temp_dir("rozvrh-all");
    let out = workspace.join("export").join("all.json");
    let mut sidecar = Sidecar::spawn();
    sidecar.select_workspace(&workspace);
    let before = sidecar.request_ok("document.get", json!({}))["document"].clone();

    let exported = sidecar.request_ok("exchange.exportAll", json!({ "outPath": path_str(&out) }));
    let file: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).expect("read export")).expect("json");
    assert_eq!(file["version"], "1.0");
    assert_eq!(file["exportDate"], exported["exportDate"]);

    let reset = sidecar.request_ok("data.reset", json!({}));
    assert_eq!(reset["document"]["classes"], json!([]));

    let imported = sidecar.request_ok("exchange.importAll", json!({ "inPath": path_str(&out) }));
    assert_eq!(imported["ignoredKeys"], json!([]));
    assert_eq!(imported["provenance"]["version"], "1.0");
    let after = sidecar.request_ok("document.get", json!({}))["document"].clone();
    assert_eq!(after, before);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn keyed_import_leaves_absent_keys_and_drops_unknown_ones() {
    let workspace = temp_dir("rozvrh-keyed");
    let partial = workspace.join("partial.json");
    std::fs::write(
        &partial,
        json!({ "teachers": [], "colour": "blue" }).to_string(),
    )
    .expect("write partial");
    let mut sidecar = Sidecar::spawn();
    sidecar.select_workspace(&workspace);

    let imported =
        sidecar.request_ok("exchange.importAll", json!({ "inPath": path_str(&partial) }));
    assert_eq!(imported["ignoredKeys"], json!(["colour"]));

    let doc = sidecar.request_ok("document.get", json!({}))["document"].clone();
    assert_eq!(doc["teachers"], json!([]));
    assert_eq!(doc["classes"].as_array().map(Vec::len), Some(4));
    assert!(doc.get("colour").is_none());
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn imports_reject_repeated_ids_and_invalid_records() {
    let workspace = temp_dir("rozvrh-import-dup");
    let dup_json = workspace.join("classes.json");
    std::fs::write(
        &dup_json,
        r#"[{"id":"dup","name":"1.A"},{"id":"dup","name":"1.B"}]"#,
    )
    .expect("write");
    let dup_csv = workspace.join("classes.csv");
    std::fs::write(&dup_csv, "id,name,year\n\"x\",\"1.A\",\"1\"\n\"x\",\"1.B\",\"2\"")
        .expect("write");
    let dup_all = workspace.join("all.json");
    std::fs::write(
        &dup_all,
        r#"{"teachers":[{"id":"t","name":"Jan"},{"id":"t","name":"Eva"}]}"#,
    )
    .expect("write");
    let zero_room = workspace.join("rooms.json");
    std::fs::write(
        &zero_room,
        r#"{"classrooms":[{"id":"r","name":"Closet","capacity":0}]}"#,
    )
    .expect("write");

    let mut sidecar = Sidecar::spawn();
    sidecar.select_workspace(&workspace);
    let before = sidecar.request_ok("document.get", json!({}));

    for path in [&dup_json, &dup_csv] {
        assert_eq!(
            sidecar.request_err(
                "exchange.importCollection",
                json!({ "collection": "classes", "inPath": path_str(path) }),
            ),
            "duplicate_id"
        );
    }
    assert_eq!(
        sidecar.request_err("exchange.importAll", json!({ "inPath": path_str(&dup_all) })),
        "duplicate_id"
    );
    assert_eq!(
        sidecar.request_err("exchange.importAll", json!({ "inPath": path_str(&zero_room) })),
        "import_failed"
    );
    assert_eq!(sidecar.request_ok("document.get", json!({})), before);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn csv_without_numeric_columns_imports_with_defaults() {
    let workspace = temp_dir("rozvrh-csv-defaults");
    let classes = workspace.join("classes.csv");
    std::fs::write(&classes, "id,name,subjects\n\"c1\",\"1.A\",\"MAT\"").expect("write");

    let mut sidecar = Sidecar::spawn();
    sidecar.select_workspace(&workspace);
    let imported = sidecar.request_ok(
        "exchange.importCollection",
        json!({ "collection": "classes", "inPath": path_str(&classes) }),
    );
    assert_eq!(imported["count"], 1);
    let listed = sidecar.request_ok("collection.list", json!({ "collection": "classes" }));
    assert_eq!(listed["records"][0]["id"], "c1");
    assert_eq!(listed["records"][0]["year"], 1);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn failed_imports_do_not_touch_the_document() {
    let workspace = temp_dir("rozvrh-bad-import");
    let malformed = workspace.join("broken.json");
    std::fs::write(&malformed, "{\"classes\": [").expect("write");
    let wrong_shape = workspace.join("shape.json");
    std::fs::write(&wrong_shape, "{\"classes\": \"none\"}").expect("write");
    let xlsx = workspace.join("teachers.xlsx");
    std::fs::write(&xlsx, "binary").expect("write");

    let mut sidecar = Sidecar::spawn();
    sidecar.select_workspace(&workspace);
    let before = sidecar.request_ok("document.get", json!({}));

    for path in [&malformed, &wrong_shape] {
        assert_eq!(
            sidecar.request_err("exchange.importAll", json!({ "inPath": path_str(path) })),
            "import_failed"
        );
    }
    assert_eq!(
        sidecar.request_err(
            "exchange.importCollection",
            json!({ "collection": "teachers", "inPath": path_str(&xlsx) }),
        ),
        "import_failed"
    );
    assert_eq!(
        sidecar.request_err(
            "exchange.importCollection",
            json!({ "collection": "teachers", "inPath": path_str(&workspace.join("missing.csv")) }),
        ),
        "io_failed"
    );
    assert_eq!(sidecar.request_ok("document.get", json!({})), before);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn schedule_import_into_another_class_needs_confirmation() {
    let workspace = temp_dir("rozvrh-schedule-io");
    let out = workspace.join("1a.json");
    let mut sidecar = Sidecar::spawn();
    sidecar.select_workspace(&workspace);

    let classes = sidecar.request_ok("collection.list", json!({ "collection": "classes" }));
    let a = classes["records"][0]["id"].clone();
    let b = classes["records"][1]["id"].clone();
    let subject = sidecar.request_ok("collection.list", json!({ "collection": "subjects" }))
        ["records"][0]["id"]
        .clone();
    sidecar.request_ok(
        "schedule.assign",
        json!({ "classId": a, "day": "Friday", "timeSlot": "15:30-16:15", "subjectId": subject, "classroomId": "r" }),
    );

    let exported = sidecar.request_ok(
        "exchange.exportSchedule",
        json!({ "classId": a, "outPath": path_str(&out) }),
    );
    assert_eq!(exported["classId"], a);
    let file: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).expect("read")).expect("json");
    assert_eq!(file["className"], classes["records"][0]["name"]);
    assert_eq!(file["version"], "1.0");

    sidecar.request_ok("selection.set", json!({ "classId": b }));
    assert_eq!(
        sidecar.request_err("exchange.importSchedule", json!({ "inPath": path_str(&out) })),
        "confirmation_required"
    );
    assert_eq!(
        sidecar.request_ok("schedule.get", json!({ "classId": b }))["schedule"],
        json!({})
    );

    let imported = sidecar.request_ok(
        "exchange.importSchedule",
        json!({ "inPath": path_str(&out), "confirm": true }),
    );
    assert_eq!(imported["classId"], b);
    assert_eq!(imported["sourceClassId"], a);
    assert_eq!(imported["assignmentCount"], 1);
    let copied = sidecar.request_ok("schedule.get", json!({ "classId": b }));
    assert_eq!(copied["schedule"]["Friday"]["15:30-16:15"][0]["subjectId"], subject);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn schedule_file_without_schedule_is_rejected() {
    let workspace = temp_dir("rozvrh-schedule-missing");
    let file = workspace.join("s.json");
    std::fs::write(&file, json!({ "classId": "c1", "className": "1.A" }).to_string())
        .expect("write");
    let mut sidecar = Sidecar::spawn();
    sidecar.select_workspace(&workspace);
    assert_eq!(
        sidecar.request_err(
            "exchange.importSchedule",
            json!({ "inPath": path_str(&file), "classId": "c1" }),
        ),
        "import_failed"
    );
    let _ = std::fs::remove_dir_all(workspace);
}
