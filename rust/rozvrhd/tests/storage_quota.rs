mod test_support;

use serde_json::json;
use test_support::{temp_dir, Sidecar};

#[test]
fn rejected_writes_keep_the_previous_document() {
    let workspace = temp_dir("rozvrh-quota");
    let mut sidecar = Sidecar::spawn_with_env(&[("ROZVRH_MAX_DOCUMENT_BYTES", "400")]);

    // The seed data does not fit; the workspace still opens.
    let selected = sidecar.select_workspace(&workspace);
    assert_eq!(selected["seeded"], false);

    sidecar.request_ok(
        "collection.add",
        json!({ "collection": "classes", "record": { "name": "1.A", "year": 1 } }),
    );
    let big_name = "x".repeat(500);
    assert_eq!(
        sidecar.request_err(
            "collection.add",
            json!({ "collection": "classes", "record": { "name": big_name, "year": 1 } }),
        ),
        "storage_write_failed"
    );

    let classes = sidecar.request_ok("collection.list", json!({ "collection": "classes" }));
    let names: Vec<&str> = classes["records"]
        .as_array()
        .expect("records")
        .iter()
        .filter_map(|c| c["name"].as_str())
        .collect();
    assert_eq!(names, vec!["1.A"]);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn document_persists_across_restarts() {
    let workspace = temp_dir("rozvrh-persist");
    {
        let mut sidecar = Sidecar::spawn();
        sidecar.select_workspace(&workspace);
        sidecar.request_ok("data.reset", json!({}));
        sidecar.request_ok(
            "collection.add",
            json!({ "collection": "classes", "record": { "id": "c1", "name": "3.C", "year": 3 } }),
        );
    }
    let mut sidecar = Sidecar::spawn();
    assert_eq!(sidecar.select_workspace(&workspace)["seeded"], false);
    let doc = sidecar.request_ok("document.get", json!({}));
    assert_eq!(doc["document"]["classes"][0]["name"], "3.C");
    assert_eq!(doc["document"]["teachers"], json!([]));
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn study_programs_alone_do_not_count_as_loaded_data() {
    let workspace = temp_dir("rozvrh-reseed");
    {
        let mut sidecar = Sidecar::spawn();
        sidecar.select_workspace(&workspace);
        sidecar.request_ok("data.reset", json!({}));
        sidecar.request_ok(
            "collection.add",
            json!({ "collection": "studyPrograms", "record": { "id": "p1", "name": "Design", "years": 3 } }),
        );
    }
    let mut sidecar = Sidecar::spawn();
    assert_eq!(sidecar.select_workspace(&workspace)["seeded"], true);
    let doc = sidecar.request_ok("document.get", json!({}));
    assert_eq!(doc["document"]["classes"].as_array().map(Vec::len), Some(4));
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn custom_storage_key_is_isolated() {
    let workspace = temp_dir("rozvrh-key");
    {
        let mut sidecar = Sidecar::spawn();
        sidecar.select_workspace(&workspace);
    }
    let mut sidecar = Sidecar::spawn_with_env(&[
        ("ROZVRH_STORAGE_KEY", "scratch"),
        ("ROZVRH_SEED_DEFAULTS", "false"),
    ]);
    sidecar.select_workspace(&workspace);
    let doc = sidecar.request_ok("document.get", json!({}));
    assert_eq!(doc["isDataLoaded"], false);
    let _ = std::fs::remove_dir_all(workspace);
}
