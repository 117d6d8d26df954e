//! Timetable view: the canonical days × slots with subject and classroom labels resolved.

use crate::model::{
    classroom_by_id, subject_by_id, AssignmentId, Classroom, ClassroomId, Subject, SubjectCode,
    SubjectId, DAYS, TIME_SLOTS,
};
use crate::schedule::Schedule;
use serde::Serialize;

pub const UNKNOWN_SUBJECT: &str = "Unknown subject";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridEntry {
    /// Position inside the cell, as accepted by `schedule.unassign`.
    pub index: usize,
    pub assignment_id: AssignmentId,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub subject_code: Option<SubjectCode>,
    pub classroom_id: ClassroomId,
    /// `None` when the classroom no longer exists.
    pub classroom_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    pub day: &'static str,
    pub entries: Vec<GridEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub time_slot: &'static str,
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grid {
    pub days: Vec<&'static str>,
    pub rows: Vec<GridRow>,
    /// Assignments stored under a day or slot outside the canonical set.
    pub hidden_assignments: usize,
}

pub fn build_grid(schedule: &Schedule, subjects: &[Subject], classrooms: &[Classroom]) -> Grid {
    let mut shown = 0;
    let rows = TIME_SLOTS
        .iter()
        .map(|&time_slot| GridRow {
            time_slot,
            cells: DAYS
                .iter()
                .map(|&day| {
                    let entries: Vec<GridEntry> = schedule
                        .cell(day, time_slot)
                        .iter()
                        .enumerate()
                        .map(|(index, a)| {
                            let subject = subject_by_id(subjects, &a.subject_id);
                            GridEntry {
                                index,
                                assignment_id: a.id.clone(),
                                subject_id: a.subject_id.clone(),
                                subject_name: subject
                                    .map(|s| s.name.clone())
                                    .unwrap_or_else(|| UNKNOWN_SUBJECT.to_string()),
                                subject_code: subject.map(|s| s.code.clone()),
                                classroom_id: a.classroom_id.clone(),
                                classroom_name: classroom_by_id(classrooms, &a.classroom_id)
                                    .map(|c| c.name.clone()),
                            }
                        })
                        .collect();
                    shown += entries.len();
                    GridCell { day, entries }
                })
                .collect(),
        })
        .collect();

    Grid {
        days: DAYS.to_vec(),
        rows,
        hidden_assignments: schedule.assignment_count() - shown,
    }
}
