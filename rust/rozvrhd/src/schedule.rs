use crate::model::ScheduleAssignment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type DaySchedule = BTreeMap<String, Vec<ScheduleAssignment>>;

/// One class's timetable: day → time slot → ordered assignments.
///
/// Values are edited copy-on-write: the helpers return a new schedule and the caller hands it
/// to the store as a whole (`SnapshotStore::set_schedule`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule(BTreeMap<String, DaySchedule>);

impl Schedule {
    pub fn cell(&self, day: &str, time_slot: &str) -> &[ScheduleAssignment] {
        self.0
            .get(day)
            .and_then(|d| d.get(time_slot))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn assignment_count(&self) -> usize {
        self.0.values().flat_map(|d| d.values()).map(Vec::len).sum()
    }

    pub fn with_assignment(
        &self,
        day: &str,
        time_slot: &str,
        assignment: ScheduleAssignment,
    ) -> Schedule {
        let mut next = self.clone();
        next.0
            .entry(day.to_string())
            .or_default()
            .entry(time_slot.to_string())
            .or_default()
            .push(assignment);
        next
    }

    /// Removes the entry at `index`. Missing cells and out-of-range indexes leave the
    /// schedule unchanged.
    pub fn without_assignment(&self, day: &str, time_slot: &str, index: usize) -> Schedule {
        let mut next = self.clone();
        if let Some(list) = next.0.get_mut(day).and_then(|d| d.get_mut(time_slot)) {
            if index < list.len() {
                list.remove(index);
            }
        }
        next
    }
}
