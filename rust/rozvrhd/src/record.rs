//! Per-entity plumbing shared by the generic repository operations: where each kind lives in
//! the document, how a partial update applies, and how it flattens to and from CSV rows.

use crate::document::{Collection, Document};
use crate::error::{ImportError, ModelError};
use crate::exchange::csv::CsvRow;
use crate::model::{
    create_classroom, Blocking, Class, ClassId, Classroom, ClassroomId, ClassroomType,
    ClassroomTypeId, ClassroomTypeTag, StudyProgram, StudyProgramId, Subject, SubjectCode,
    SubjectId, Teacher, TeacherId, DEFAULT_CAPACITY, DEFAULT_CLASSROOM_TAG, DEFAULT_YEAR,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::fmt;

pub trait Record: Clone + PartialEq + Serialize + DeserializeOwned {
    type Id: Clone + PartialEq + fmt::Display + From<String>;
    type Patch: Default + DeserializeOwned;

    const COLLECTION: Collection;

    fn id(&self) -> &Self::Id;

    /// Shallow merge: fields set in `patch` win, everything else is retained.
    fn apply_patch(&mut self, patch: Self::Patch);

    fn items(doc: &Document) -> &[Self];

    fn items_mut(doc: &mut Document) -> &mut Vec<Self>;

    /// Export shape for CSV: list fields comma-joined, nested values as JSON text.
    fn to_flat_row(&self) -> Map<String, Value>;

    fn from_csv_row(row: &CsvRow) -> Result<Self, String>;

    /// Checks that decoding alone cannot express.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// First id that occurs more than once.
pub fn duplicate_id<R: Record>(records: &[R]) -> Option<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .map(|r| r.id().to_string())
        .find(|id| !seen.insert(id.clone()))
}

/// Gate for every incoming record list: each record validates and no id repeats.
pub fn check_records<R: Record>(records: &[R]) -> Result<(), ImportError> {
    for record in records {
        record
            .validate()
            .map_err(|reason| ImportError::InvalidField {
                key: R::COLLECTION.to_string(),
                reason,
            })?;
    }
    match duplicate_id(records) {
        Some(id) => Err(ImportError::DuplicateId {
            collection: R::COLLECTION.as_str(),
            id,
        }),
        None => Ok(()),
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *target = v;
    }
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn row_id<T: From<String>>(row: &CsvRow, generate: fn() -> T) -> T {
    match row.get("id").map(str::trim) {
        Some(id) if !id.is_empty() => T::from(id.to_string()),
        _ => generate(),
    }
}

fn flat(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPatch {
    pub name: Option<String>,
    pub code: Option<SubjectCode>,
    pub recommended_classrooms: Option<Vec<ClassroomTypeTag>>,
    pub year: Option<i64>,
}

impl Record for Subject {
    type Id = SubjectId;
    type Patch = SubjectPatch;

    const COLLECTION: Collection = Collection::Subjects;

    fn id(&self) -> &SubjectId {
        &self.id
    }

    fn apply_patch(&mut self, patch: SubjectPatch) {
        set(&mut self.name, patch.name);
        set(&mut self.code, patch.code);
        set(&mut self.recommended_classrooms, patch.recommended_classrooms);
        set(&mut self.year, patch.year);
    }

    fn items(doc: &Document) -> &[Self] {
        &doc.subjects
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.subjects
    }

    fn to_flat_row(&self) -> Map<String, Value> {
        flat(json!({
            "id": self.id,
            "name": self.name,
            "code": self.code,
            "year": self.year,
            "recommendedClassrooms": join(&self.recommended_classrooms),
        }))
    }

    fn from_csv_row(row: &CsvRow) -> Result<Self, String> {
        Ok(Subject {
            id: row_id(row, SubjectId::generate),
            name: row.text("name"),
            code: SubjectCode::from(row.text("code")),
            recommended_classrooms: row
                .list("recommendedClassrooms")
                .into_iter()
                .map(ClassroomTypeTag::from)
                .collect(),
            year: row.integer_or("year", DEFAULT_YEAR)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomPatch {
    pub name: Option<String>,
    pub capacity: Option<u32>,
    #[serde(rename = "type")]
    pub kind: Option<ClassroomTypeTag>,
}

impl Record for Classroom {
    type Id = ClassroomId;
    type Patch = ClassroomPatch;

    const COLLECTION: Collection = Collection::Classrooms;

    fn id(&self) -> &ClassroomId {
        &self.id
    }

    fn apply_patch(&mut self, patch: ClassroomPatch) {
        set(&mut self.name, patch.name);
        set(&mut self.capacity, patch.capacity.filter(|c| *c > 0));
        set(&mut self.kind, patch.kind);
    }

    fn items(doc: &Document) -> &[Self] {
        &doc.classrooms
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.classrooms
    }

    fn to_flat_row(&self) -> Map<String, Value> {
        flat(json!({
            "id": self.id,
            "name": self.name,
            "capacity": self.capacity,
            "type": self.kind,
        }))
    }

    fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err(ModelError::ZeroCapacity.to_string());
        }
        Ok(())
    }

    fn from_csv_row(row: &CsvRow) -> Result<Self, String> {
        let capacity = row.integer_or("capacity", i64::from(DEFAULT_CAPACITY))?;
        let capacity = u32::try_from(capacity)
            .map_err(|_| format!("'capacity' must be a positive integer: {capacity}"))?;
        let kind = match row.text("type").trim() {
            "" => ClassroomTypeTag::from(DEFAULT_CLASSROOM_TAG),
            tag => ClassroomTypeTag::from(tag),
        };
        let mut room = create_classroom(row.text("name"), capacity, kind)
            .map_err(|e| e.to_string())?;
        room.id = row_id(row, ClassroomId::generate);
        Ok(room)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomTypePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl Record for ClassroomType {
    type Id = ClassroomTypeId;
    type Patch = ClassroomTypePatch;

    const COLLECTION: Collection = Collection::ClassroomTypes;

    fn id(&self) -> &ClassroomTypeId {
        &self.id
    }

    // `isCustom` is fixed at creation.
    fn apply_patch(&mut self, patch: ClassroomTypePatch) {
        set(&mut self.name, patch.name);
        set(&mut self.description, patch.description);
        set(&mut self.color, patch.color);
        set(&mut self.icon, patch.icon);
    }

    fn items(doc: &Document) -> &[Self] {
        &doc.classroom_types
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.classroom_types
    }

    fn to_flat_row(&self) -> Map<String, Value> {
        flat(json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "color": self.color,
            "icon": self.icon,
            "isCustom": self.is_custom,
        }))
    }

    fn from_csv_row(row: &CsvRow) -> Result<Self, String> {
        Ok(ClassroomType {
            id: row_id(row, ClassroomTypeId::generate),
            name: row.text("name"),
            description: row.text("description"),
            color: row.text("color"),
            icon: row.text("icon"),
            is_custom: row.flag("isCustom"),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub subjects: Option<Vec<SubjectCode>>,
    pub blockings: Option<Vec<Blocking>>,
}

impl Record for Teacher {
    type Id = TeacherId;
    type Patch = TeacherPatch;

    const COLLECTION: Collection = Collection::Teachers;

    fn id(&self) -> &TeacherId {
        &self.id
    }

    fn apply_patch(&mut self, patch: TeacherPatch) {
        set(&mut self.name, patch.name);
        set(&mut self.email, patch.email);
        set(&mut self.subjects, patch.subjects);
        set(&mut self.blockings, patch.blockings);
    }

    fn items(doc: &Document) -> &[Self] {
        &doc.teachers
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.teachers
    }

    fn to_flat_row(&self) -> Map<String, Value> {
        let blockings =
            serde_json::to_string(&self.blockings).unwrap_or_else(|_| "[]".to_string());
        flat(json!({
            "id": self.id,
            "name": self.name,
            "email": self.email,
            "subjects": join(&self.subjects),
            "blockings": blockings,
        }))
    }

    // The blockings cell rarely survives the CSV reader intact; when it does not parse the
    // teacher comes back without blockings.
    fn from_csv_row(row: &CsvRow) -> Result<Self, String> {
        let blockings = match row.get("blockings").map(str::trim) {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "dropping unreadable blockings cell");
                Vec::new()
            }),
        };
        Ok(Teacher {
            id: row_id(row, TeacherId::generate),
            name: row.text("name"),
            email: row.text("email"),
            subjects: row.list("subjects").into_iter().map(SubjectCode::from).collect(),
            blockings,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPatch {
    pub name: Option<String>,
    pub year: Option<i64>,
    pub subjects: Option<Vec<SubjectCode>>,
}

impl Record for Class {
    type Id = ClassId;
    type Patch = ClassPatch;

    const COLLECTION: Collection = Collection::Classes;

    fn id(&self) -> &ClassId {
        &self.id
    }

    fn apply_patch(&mut self, patch: ClassPatch) {
        set(&mut self.name, patch.name);
        set(&mut self.year, patch.year);
        set(&mut self.subjects, patch.subjects);
    }

    fn items(doc: &Document) -> &[Self] {
        &doc.classes
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.classes
    }

    fn to_flat_row(&self) -> Map<String, Value> {
        flat(json!({
            "id": self.id,
            "name": self.name,
            "year": self.year,
            "subjects": join(&self.subjects),
        }))
    }

    fn from_csv_row(row: &CsvRow) -> Result<Self, String> {
        Ok(Class {
            id: row_id(row, ClassId::generate),
            name: row.text("name"),
            year: row.integer_or("year", DEFAULT_YEAR)?,
            subjects: row.list("subjects").into_iter().map(SubjectCode::from).collect(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProgramPatch {
    pub name: Option<String>,
    pub years: Option<i64>,
    pub subjects: Option<Vec<SubjectCode>>,
}

impl Record for StudyProgram {
    type Id = StudyProgramId;
    type Patch = StudyProgramPatch;

    const COLLECTION: Collection = Collection::StudyPrograms;

    fn id(&self) -> &StudyProgramId {
        &self.id
    }

    fn apply_patch(&mut self, patch: StudyProgramPatch) {
        set(&mut self.name, patch.name);
        set(&mut self.years, patch.years);
        set(&mut self.subjects, patch.subjects);
    }

    fn items(doc: &Document) -> &[Self] {
        &doc.study_programs
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.study_programs
    }

    fn to_flat_row(&self) -> Map<String, Value> {
        flat(json!({
            "id": self.id,
            "name": self.name,
            "years": self.years,
            "subjects": join(&self.subjects),
        }))
    }

    fn from_csv_row(row: &CsvRow) -> Result<Self, String> {
        Ok(StudyProgram {
            id: row_id(row, StudyProgramId::generate),
            name: row.text("name"),
            years: row.integer_or("years", DEFAULT_YEAR)?,
            subjects: row.list("subjects").into_iter().map(SubjectCode::from).collect(),
        })
    }
}

/// Runs `$body` with `$ty` bound to the record type stored under `$collection`.
macro_rules! with_record_type {
    ($collection:expr, $ty:ident => $body:expr) => {
        match $collection {
            $crate::document::Collection::Classes => {
                type $ty = $crate::model::Class;
                $body
            }
            $crate::document::Collection::Teachers => {
                type $ty = $crate::model::Teacher;
                $body
            }
            $crate::document::Collection::Subjects => {
                type $ty = $crate::model::Subject;
                $body
            }
            $crate::document::Collection::Classrooms => {
                type $ty = $crate::model::Classroom;
                $body
            }
            $crate::document::Collection::ClassroomTypes => {
                type $ty = $crate::model::ClassroomType;
                $body
            }
            $crate::document::Collection::StudyPrograms => {
                type $ty = $crate::model::StudyProgram;
                $body
            }
        }
    };
}

pub(crate) use with_record_type;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{codes, create_class, create_classroom, create_subject, create_teacher};

    #[test]
    fn patch_changes_only_named_fields() {
        let mut class = create_class("1.A", 1, codes(["MAT", "CJ"]));
        let before = class.clone();
        let patch: ClassPatch =
            serde_json::from_value(serde_json::json!({ "name": "1.B" })).expect("patch");
        class.apply_patch(patch);
        assert_eq!(class.name, "1.B");
        assert_eq!(class.id, before.id);
        assert_eq!(class.year, before.year);
        assert_eq!(class.subjects, before.subjects);
    }

    #[test]
    fn patch_ignores_id_and_unknown_fields() {
        let mut teacher = create_teacher("Jan", "jan@example.org", codes(["MAT"]));
        let id = teacher.id.clone();
        let patch: TeacherPatch = serde_json::from_value(serde_json::json!({
            "id": "other",
            "colour": "red",
            "email": "novak@example.org"
        }))
        .expect("patch");
        teacher.apply_patch(patch);
        assert_eq!(teacher.id, id);
        assert_eq!(teacher.email, "novak@example.org");
    }

    #[test]
    fn classroom_patch_refuses_zero_capacity() {
        let mut room = create_classroom("101", 30, "standard").expect("room");
        room.apply_patch(ClassroomPatch {
            capacity: Some(0),
            ..ClassroomPatch::default()
        });
        assert_eq!(room.capacity, 30);
    }

    #[test]
    fn flat_rows_join_lists() {
        let subject = create_subject("Physics", "FYZ", vec!["standard".into(), "lab".into()], 1);
        let row = subject.to_flat_row();
        let keys: Vec<&String> = row.keys().collect();
        assert_eq!(keys, ["id", "name", "code", "year", "recommendedClassrooms"]);
        assert_eq!(row["recommendedClassrooms"], "standard,lab");

        let teacher = create_teacher("Jan", "jan@example.org", codes(["MAT", "FYZ"]));
        let row = teacher.to_flat_row();
        assert_eq!(row["subjects"], "MAT,FYZ");
        assert_eq!(row["blockings"], "[]");
    }

    #[test]
    fn csv_row_without_id_gets_a_fresh_one() {
        let row: CsvRow = [("name", "2.C"), ("year", "2"), ("subjects", "MAT")]
            .into_iter()
            .collect();
        let a = Class::from_csv_row(&row).expect("class");
        let b = Class::from_csv_row(&row).expect("class");
        assert!(!a.id.as_str().is_empty());
        assert_ne!(a.id, b.id);
        assert_eq!(a.subjects, codes(["MAT"]));
    }

    #[test]
    fn csv_row_with_bad_number_is_rejected() {
        let row: CsvRow = [("id", "r1"), ("name", "Gym"), ("capacity", "lots")]
            .into_iter()
            .collect();
        assert!(Classroom::from_csv_row(&row).is_err());
        let row: CsvRow = [("id", "r1"), ("name", "Gym"), ("capacity", "0")]
            .into_iter()
            .collect();
        assert!(Classroom::from_csv_row(&row).is_err());
    }

    #[test]
    fn blank_or_missing_numbers_take_defaults() {
        let row: CsvRow = [("id", "c1"), ("name", "1.A"), ("subjects", "MAT")]
            .into_iter()
            .collect();
        let class = Class::from_csv_row(&row).expect("class without year");
        assert_eq!(class.year, DEFAULT_YEAR);

        let row: CsvRow = [("id", "p"), ("name", "Prep"), ("years", ""), ("subjects", "")]
            .into_iter()
            .collect();
        assert_eq!(StudyProgram::from_csv_row(&row).expect("program").years, DEFAULT_YEAR);

        let row: CsvRow = [("id", "r1"), ("name", "Gym")].into_iter().collect();
        let room = Classroom::from_csv_row(&row).expect("room without capacity");
        assert_eq!(room.capacity, DEFAULT_CAPACITY);
        assert_eq!(room.kind, ClassroomTypeTag::from(DEFAULT_CLASSROOM_TAG));
        assert_eq!(room.id, ClassroomId::from("r1"));
    }

    #[test]
    fn repeated_ids_are_reported() {
        let mut a = create_class("1.A", 1, vec![]);
        let mut b = create_class("1.B", 1, vec![]);
        assert_eq!(duplicate_id(&[a.clone(), b.clone()]), None);
        a.id = ClassId::from("dup");
        b.id = ClassId::from("dup");
        let err = check_records(&[a, b]).expect_err("duplicate");
        assert!(matches!(
            err,
            ImportError::DuplicateId { collection: "classes", ref id } if id == "dup"
        ));
    }

    #[test]
    fn check_records_runs_validation() {
        let mut room = create_classroom("101", 30, "standard").expect("room");
        room.capacity = 0;
        let err = check_records(&[room]).expect_err("zero capacity");
        assert!(matches!(err, ImportError::InvalidField { ref key, .. } if key == "classrooms"));
    }

    #[test]
    fn zero_capacity_classroom_fails_validation() {
        let mut room = create_classroom("101", 30, "standard").expect("room");
        assert!(room.validate().is_ok());
        room.capacity = 0;
        assert!(room.validate().is_err());
    }

    #[test]
    fn dispatch_macro_selects_record_type() {
        let names: Vec<&str> = Collection::ALL
            .into_iter()
            .map(|c| with_record_type!(c, R => R::COLLECTION.as_str()))
            .collect();
        assert_eq!(
            names,
            ["classes", "teachers", "subjects", "classrooms", "classroomTypes", "studyPrograms"]
        );
    }
}
