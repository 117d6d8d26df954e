//! The persisted root document and its typed partial form used by imports.

use crate::error::ImportError;
use crate::model::{Class, ClassId, Classroom, ClassroomType, StudyProgram, Subject, Teacher};
use crate::record::check_records;
use crate::schedule::Schedule;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// The whole workspace. Every mutation rewrites it in full.
///
/// Missing top-level keys decode to their empty defaults, so callers never null-check a
/// collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Document {
    pub classes: Vec<Class>,
    pub teachers: Vec<Teacher>,
    pub subjects: Vec<Subject>,
    pub classrooms: Vec<Classroom>,
    pub classroom_types: Vec<ClassroomType>,
    pub study_programs: Vec<StudyProgram>,
    /// Keys may name classes that no longer exist.
    pub schedule: BTreeMap<ClassId, Schedule>,
    pub selected_class: Option<Class>,
}

impl Document {
    /// True once any of classes, teachers or subjects holds a record.
    pub fn is_data_loaded(&self) -> bool {
        !self.classes.is_empty() || !self.teachers.is_empty() || !self.subjects.is_empty()
    }
}

/// The named entity lists of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Classes,
    Teachers,
    Subjects,
    Classrooms,
    ClassroomTypes,
    StudyPrograms,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Classes,
        Collection::Teachers,
        Collection::Subjects,
        Collection::Classrooms,
        Collection::ClassroomTypes,
        Collection::StudyPrograms,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Classes => "classes",
            Collection::Teachers => "teachers",
            Collection::Subjects => "subjects",
            Collection::Classrooms => "classrooms",
            Collection::ClassroomTypes => "classroomTypes",
            Collection::StudyPrograms => "studyPrograms",
        }
    }

    pub fn parse(name: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Export metadata carried by full-document files. Kept as found, never validated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub export_date: Option<Value>,
    pub version: Option<Value>,
}

/// Recognized top-level fields found in an imported object.
///
/// Only the closed set of document keys is decoded; anything else lands in `ignored_keys`
/// and is never written to the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentPatch {
    pub classes: Option<Vec<Class>>,
    pub teachers: Option<Vec<Teacher>>,
    pub subjects: Option<Vec<Subject>>,
    pub classrooms: Option<Vec<Classroom>>,
    pub classroom_types: Option<Vec<ClassroomType>>,
    pub study_programs: Option<Vec<StudyProgram>>,
    pub schedule: Option<BTreeMap<ClassId, Schedule>>,
    pub selected_class: Option<Option<Class>>,
    pub provenance: Provenance,
    pub ignored_keys: Vec<String>,
}

impl DocumentPatch {
    /// Strict decoding for imports: a recognized key with a value of the wrong shape, an
    /// invalid record or a repeated id fails the whole import.
    pub fn from_object(map: Map<String, Value>) -> Result<Self, ImportError> {
        let mut patch = DocumentPatch::default();
        for (key, value) in map {
            match patch.set_field(&key, value) {
                Ok(true) => {}
                Ok(false) => patch.ignored_keys.push(key),
                Err(reason) => return Err(ImportError::InvalidField { key, reason }),
            }
        }
        patch.check_collections()?;
        Ok(patch)
    }

    fn check_collections(&self) -> Result<(), ImportError> {
        if let Some(v) = &self.classes {
            check_records(v)?;
        }
        if let Some(v) = &self.teachers {
            check_records(v)?;
        }
        if let Some(v) = &self.subjects {
            check_records(v)?;
        }
        if let Some(v) = &self.classrooms {
            check_records(v)?;
        }
        if let Some(v) = &self.classroom_types {
            check_records(v)?;
        }
        if let Some(v) = &self.study_programs {
            check_records(v)?;
        }
        Ok(())
    }

    /// Lenient decoding for stored blobs: a damaged key falls back to its default instead of
    /// discarding the rest of the document.
    pub fn from_stored_object(map: Map<String, Value>) -> Self {
        let mut patch = DocumentPatch::default();
        for (key, value) in map {
            match patch.set_field(&key, value) {
                Ok(true) => {}
                Ok(false) => patch.ignored_keys.push(key),
                Err(reason) => {
                    tracing::warn!(
                        key = %key,
                        %reason,
                        "stored document key is damaged, using default"
                    );
                }
            }
        }
        patch
    }

    fn set_field(&mut self, key: &str, value: Value) -> Result<bool, String> {
        match key {
            "classes" => self.classes = Some(decode(value)?),
            "teachers" => self.teachers = Some(decode(value)?),
            "subjects" => self.subjects = Some(decode(value)?),
            "classrooms" => self.classrooms = Some(decode(value)?),
            "classroomTypes" => self.classroom_types = Some(decode(value)?),
            "studyPrograms" => self.study_programs = Some(decode(value)?),
            "schedule" => self.schedule = Some(decode(value)?),
            "selectedClass" => self.selected_class = Some(decode(value)?),
            "exportDate" => self.provenance.export_date = Some(value),
            "version" => self.provenance.version = Some(value),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Overwrites each present key wholesale and returns the keys that were applied.
    pub fn apply_to(self, doc: &mut Document) -> Vec<&'static str> {
        let mut applied = Vec::new();
        if let Some(v) = self.classes {
            doc.classes = v;
            applied.push("classes");
        }
        if let Some(v) = self.teachers {
            doc.teachers = v;
            applied.push("teachers");
        }
        if let Some(v) = self.subjects {
            doc.subjects = v;
            applied.push("subjects");
        }
        if let Some(v) = self.classrooms {
            doc.classrooms = v;
            applied.push("classrooms");
        }
        if let Some(v) = self.classroom_types {
            doc.classroom_types = v;
            applied.push("classroomTypes");
        }
        if let Some(v) = self.study_programs {
            doc.study_programs = v;
            applied.push("studyPrograms");
        }
        if let Some(v) = self.schedule {
            doc.schedule = v;
            applied.push("schedule");
        }
        if let Some(v) = self.selected_class {
            doc.selected_class = v;
            applied.push("selectedClass");
        }
        applied
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, String> {
    serde_json::from_value(value).map_err(|e| e.to_string())
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
