//! Timetable entities, their identifiers and lookup helpers.
//!
//! Every identifier kind has its own newtype so that a `ClassroomId` cannot be passed where a
//! `SubjectId` is expected. Subjects are additionally referenced by their human-facing
//! [`SubjectCode`], which is what classes, teachers and study programs store.

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Canonical weekdays shown by the grid. The store itself accepts any day string.
pub const DAYS: [&str; 5] = ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// Year (or length in years) assumed when a record leaves it out.
pub const DEFAULT_YEAR: i64 = 1;

/// Seats assumed when an imported classroom leaves capacity out.
pub const DEFAULT_CAPACITY: u32 = 30;

pub const DEFAULT_CLASSROOM_TAG: &str = "standard";

/// Canonical lesson slots shown by the grid. The store itself accepts any slot string.
pub const TIME_SLOTS: [&str; 10] = [
    "7:10-7:55",
    "8:00-8:45",
    "8:55-9:40",
    "10:00-10:45",
    "10:55-11:40",
    "11:50-12:35",
    "12:45-13:30",
    "13:40-14:25",
    "14:35-15:20",
    "15:30-16:15",
];

macro_rules! string_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

macro_rules! generated_id {
    ($(#[$meta:meta])* $name:ident) => {
        string_key!($(#[$meta])* $name);

        impl $name {
            /// Fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }
        }
    };
}

generated_id!(SubjectId);
generated_id!(ClassroomId);
generated_id!(ClassroomTypeId);
generated_id!(TeacherId);
generated_id!(ClassId);
generated_id!(StudyProgramId);
generated_id!(BlockingId);
generated_id!(
    /// Identifier of one entry inside a schedule cell.
    AssignmentId
);

string_key!(
    /// Short human-facing subject key such as `MAT`. Not enforced unique.
    SubjectCode
);
string_key!(
    /// Classroom kind: either a classroom type id or a built-in tag such as `standard`.
    ClassroomTypeTag
);

impl AssignmentId {
    /// Assignment ids are prefixed with the subject they were created for.
    pub fn for_subject(subject: &SubjectId) -> Self {
        Self(format!("{}-{}", subject, Uuid::new_v4().simple()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub code: SubjectCode,
    #[serde(default)]
    pub recommended_classrooms: Vec<ClassroomTypeTag>,
    #[serde(default = "default_year")]
    pub year: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classroom {
    pub id: ClassroomId,
    pub name: String,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    #[serde(rename = "type", default = "default_classroom_tag")]
    pub kind: ClassroomTypeTag,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomType {
    pub id: ClassroomTypeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_color")]
    pub color: String,
    #[serde(default = "default_icon")]
    pub icon: String,
    #[serde(default)]
    pub is_custom: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blocking {
    pub id: BlockingId,
    pub day: String,
    pub time_slot: String,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subjects: Vec<SubjectCode>,
    #[serde(default)]
    pub blockings: Vec<Blocking>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    #[serde(default = "default_year")]
    pub year: i64,
    #[serde(default)]
    pub subjects: Vec<SubjectCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProgram {
    pub id: StudyProgramId,
    pub name: String,
    #[serde(default = "default_year")]
    pub years: i64,
    #[serde(default)]
    pub subjects: Vec<SubjectCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleAssignment {
    pub id: AssignmentId,
    pub subject_id: SubjectId,
    pub classroom_id: ClassroomId,
}

fn default_year() -> i64 {
    DEFAULT_YEAR
}

fn default_capacity() -> u32 {
    DEFAULT_CAPACITY
}

fn default_classroom_tag() -> ClassroomTypeTag {
    ClassroomTypeTag::from(DEFAULT_CLASSROOM_TAG)
}

fn default_color() -> String {
    "#3b82f6".to_string()
}

fn default_icon() -> String {
    "🏫".to_string()
}

pub fn create_subject(
    name: impl Into<String>,
    code: impl Into<SubjectCode>,
    recommended_classrooms: Vec<ClassroomTypeTag>,
    year: i64,
) -> Subject {
    Subject {
        id: SubjectId::generate(),
        name: name.into(),
        code: code.into(),
        recommended_classrooms,
        year,
    }
}

pub fn create_classroom(
    name: impl Into<String>,
    capacity: u32,
    kind: impl Into<ClassroomTypeTag>,
) -> Result<Classroom, ModelError> {
    if capacity == 0 {
        return Err(ModelError::ZeroCapacity);
    }
    Ok(Classroom {
        id: ClassroomId::generate(),
        name: name.into(),
        capacity,
        kind: kind.into(),
    })
}

/// Built-in classroom types ship with the workspace and cannot be deleted by users.
pub fn create_builtin_classroom_type(
    name: impl Into<String>,
    description: impl Into<String>,
    color: impl Into<String>,
    icon: impl Into<String>,
) -> ClassroomType {
    ClassroomType {
        id: ClassroomTypeId::generate(),
        name: name.into(),
        description: description.into(),
        color: color.into(),
        icon: icon.into(),
        is_custom: false,
    }
}

pub fn create_teacher(
    name: impl Into<String>,
    email: impl Into<String>,
    subjects: Vec<SubjectCode>,
) -> Teacher {
    Teacher {
        id: TeacherId::generate(),
        name: name.into(),
        email: email.into(),
        subjects,
        blockings: Vec::new(),
    }
}

pub fn create_class(name: impl Into<String>, year: i64, subjects: Vec<SubjectCode>) -> Class {
    Class {
        id: ClassId::generate(),
        name: name.into(),
        year,
        subjects,
    }
}

pub fn create_study_program(
    name: impl Into<String>,
    years: i64,
    subjects: Vec<SubjectCode>,
) -> StudyProgram {
    StudyProgram {
        id: StudyProgramId::generate(),
        name: name.into(),
        years,
        subjects,
    }
}

pub fn create_assignment(subject_id: SubjectId, classroom_id: ClassroomId) -> ScheduleAssignment {
    ScheduleAssignment {
        id: AssignmentId::for_subject(&subject_id),
        subject_id,
        classroom_id,
    }
}

pub fn codes<I, S>(values: I) -> Vec<SubjectCode>
where
    I: IntoIterator<Item = S>,
    S: Into<SubjectCode>,
{
    values.into_iter().map(Into::into).collect()
}

impl Teacher {
    /// Blockings are informational; nothing checks them against the schedule.
    pub fn is_blocked(&self, day: &str, time_slot: &str) -> bool {
        self.blockings
            .iter()
            .any(|b| b.day == day && b.time_slot == time_slot)
    }

    /// Builds one blocking per canonical slot in `start_slot..=end_slot`.
    pub fn blockings_for_range(
        day: &str,
        start_slot: &str,
        end_slot: &str,
        reason: &str,
    ) -> Result<Vec<Blocking>, ModelError> {
        let start = TIME_SLOTS.iter().position(|s| *s == start_slot);
        let end = TIME_SLOTS.iter().position(|s| *s == end_slot);
        let (Some(start), Some(end)) = (start, end) else {
            return Err(ModelError::InvalidSlotRange {
                start: start_slot.to_string(),
                end: end_slot.to_string(),
            });
        };
        if start > end {
            return Err(ModelError::InvalidSlotRange {
                start: start_slot.to_string(),
                end: end_slot.to_string(),
            });
        }
        Ok(TIME_SLOTS[start..=end]
            .iter()
            .map(|slot| Blocking {
                id: BlockingId::generate(),
                day: day.to_string(),
                time_slot: (*slot).to_string(),
                reason: reason.to_string(),
            })
            .collect())
    }
}

// Lookups. A dangling reference resolves to `None`, never to an error.

pub fn subject_by_id<'a>(subjects: &'a [Subject], id: &SubjectId) -> Option<&'a Subject> {
    subjects.iter().find(|s| &s.id == id)
}

pub fn subject_by_code<'a>(subjects: &'a [Subject], code: &SubjectCode) -> Option<&'a Subject> {
    subjects.iter().find(|s| &s.code == code)
}

pub fn classroom_by_id<'a>(classrooms: &'a [Classroom], id: &ClassroomId) -> Option<&'a Classroom> {
    classrooms.iter().find(|c| &c.id == id)
}

pub fn teacher_by_id<'a>(teachers: &'a [Teacher], id: &TeacherId) -> Option<&'a Teacher> {
    teachers.iter().find(|t| &t.id == id)
}

pub fn class_by_id<'a>(classes: &'a [Class], id: &ClassId) -> Option<&'a Class> {
    classes.iter().find(|c| &c.id == id)
}

/// Resolves a classroom tag against type ids first, then type names.
pub fn classroom_type_for_tag<'a>(
    types: &'a [ClassroomType],
    tag: &ClassroomTypeTag,
) -> Option<&'a ClassroomType> {
    types
        .iter()
        .find(|t| t.id.as_str() == tag.as_str())
        .or_else(|| types.iter().find(|t| t.name == tag.as_str()))
}

/// Subject name for a code, or the raw code when the subject no longer exists.
pub fn subject_label(subjects: &[Subject], code: &SubjectCode) -> String {
    subject_by_code(subjects, code)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| code.to_string())
}

/// Classrooms whose type is recommended for `subject`. Without a subject every classroom
/// qualifies.
pub fn recommended_classrooms<'a>(
    subject: Option<&Subject>,
    classrooms: &'a [Classroom],
) -> Vec<&'a Classroom> {
    match subject {
        None => classrooms.iter().collect(),
        Some(subject) => classrooms
            .iter()
            .filter(|c| subject.recommended_classrooms.contains(&c.kind))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factories_stamp_distinct_ids() {
        let a = create_subject("Mathematics", "MAT", vec![], 1);
        let b = create_subject("Mathematics", "MAT", vec![], 1);
        assert_ne!(a.id, b.id);
        assert_eq!(a.code, SubjectCode::from("MAT"));
    }

    #[test]
    fn classroom_capacity_must_be_positive() {
        assert!(matches!(
            create_classroom("Room 0", 0, "standard"),
            Err(ModelError::ZeroCapacity)
        ));
        let room = create_classroom("Room 101", 30, "standard").expect("classroom");
        assert_eq!(room.capacity, 30);
    }

    #[test]
    fn entities_use_camel_case_wire_names() {
        let room = create_classroom("Lab", 15, "lab").expect("classroom");
        let v = serde_json::to_value(&room).expect("serialize");
        assert_eq!(v["type"], "lab");

        let subject = create_subject("Physics", "FYZ", vec!["standard".into(), "lab".into()], 2);
        let v = serde_json::to_value(&subject).expect("serialize");
        assert_eq!(v["recommendedClassrooms"], serde_json::json!(["standard", "lab"]));

        let custom = ClassroomType {
            is_custom: true,
            ..create_builtin_classroom_type("Studio", "", "#000", "🎨")
        };
        let v = serde_json::to_value(&custom).expect("serialize");
        assert_eq!(v["isCustom"], true);
    }

    #[test]
    fn missing_optional_fields_take_defaults() {
        let t: ClassroomType =
            serde_json::from_value(serde_json::json!({ "id": "t1", "name": "standard" }))
                .expect("decode");
        assert!(!t.is_custom);
        assert_eq!(t.description, "");

        let teacher: Teacher =
            serde_json::from_value(serde_json::json!({ "id": "x", "name": "Jan" }))
                .expect("decode");
        assert!(teacher.subjects.is_empty());
        assert!(teacher.blockings.is_empty());
    }

    #[test]
    fn blocking_range_covers_inclusive_slots() {
        let b = Teacher::blockings_for_range("Monday", "8:00-8:45", "10:00-10:45", "meeting")
            .expect("range");
        let slots: Vec<&str> = b.iter().map(|x| x.time_slot.as_str()).collect();
        assert_eq!(slots, vec!["8:00-8:45", "8:55-9:40", "10:00-10:45"]);
        assert!(b.iter().all(|x| x.day == "Monday" && x.reason == "meeting"));
    }

    #[test]
    fn blocking_range_rejects_reversed_or_unknown_slots() {
        assert!(Teacher::blockings_for_range("Monday", "10:00-10:45", "8:00-8:45", "").is_err());
        assert!(Teacher::blockings_for_range("Monday", "6:00-6:45", "8:00-8:45", "").is_err());
    }

    #[test]
    fn is_blocked_matches_day_and_slot() {
        let mut t = create_teacher("Jan", "jan@example.org", codes(["MAT"]));
        t.blockings = Teacher::blockings_for_range("Friday", "7:10-7:55", "7:10-7:55", "")
            .expect("range");
        assert!(t.is_blocked("Friday", "7:10-7:55"));
        assert!(!t.is_blocked("Friday", "8:00-8:45"));
        assert!(!t.is_blocked("Monday", "7:10-7:55"));
    }

    #[test]
    fn subject_label_falls_back_to_code() {
        let subjects = vec![create_subject("Mathematics", "MAT", vec![], 1)];
        assert_eq!(subject_label(&subjects, &"MAT".into()), "Mathematics");
        assert_eq!(subject_label(&subjects, &"XYZ".into()), "XYZ");
    }

    #[test]
    fn recommended_classrooms_filters_by_type() {
        let rooms = vec![
            create_classroom("101", 30, "standard").expect("room"),
            create_classroom("Lab", 15, "lab").expect("room"),
        ];
        let physics = create_subject("Physics", "FYZ", vec!["lab".into()], 1);
        let rec = recommended_classrooms(Some(&physics), &rooms);
        assert_eq!(rec.len(), 1);
        assert_eq!(rec[0].name, "Lab");
        assert_eq!(recommended_classrooms(None, &rooms).len(), 2);
    }

    #[test]
    fn classroom_tag_resolves_by_id_or_name() {
        let types = vec![create_builtin_classroom_type("lab", "", "#f59e0b", "🔬")];
        let by_name = classroom_type_for_tag(&types, &"lab".into()).expect("by name");
        let by_id =
            classroom_type_for_tag(&types, &ClassroomTypeTag::from(types[0].id.as_str()))
                .expect("by id");
        assert_eq!(by_name.id, by_id.id);
        assert!(classroom_type_for_tag(&types, &"gym".into()).is_none());
    }
}
