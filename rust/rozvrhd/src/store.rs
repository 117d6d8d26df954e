//! The snapshot store: one document, persisted whole under one key.
//!
//! Referential integrity: none enforced. Removing a subject, classroom or class never touches
//! the records or schedules that point at it; those references simply stop resolving.
//!
//! Every mutating call is a read-modify-write of the full document with no revision check.
//! Two writers sharing one storage would silently overwrite each other (last write wins).

use crate::document::{Document, DocumentPatch};
use crate::model::{Class, ClassId};
use crate::record::Record;
use crate::schedule::Schedule;
use crate::seed;
use crate::storage::Storage;

pub const DEFAULT_STORAGE_KEY: &str = "rozvrh-data";

/// Result of a mutating call: the document as it now stands in this session, and whether it
/// also reached storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub document: Document,
    pub saved: bool,
}

pub struct SnapshotStore<S: Storage> {
    storage: S,
    key: String,
}

impl<S: Storage> SnapshotStore<S> {
    #[cfg(test)]
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, DEFAULT_STORAGE_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    #[cfg(test)]
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Absent or unreadable blobs load as the empty document; missing keys are backfilled.
    pub fn load(&self) -> Document {
        let Some(raw) = self.storage.get(&self.key) else {
            return Document::default();
        };
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(serde_json::Value::Object(map)) => {
                let mut doc = Document::default();
                DocumentPatch::from_stored_object(map).apply_to(&mut doc);
                doc
            }
            Ok(_) => {
                tracing::warn!(key = %self.key, "stored document is not an object, using defaults");
                Document::default()
            }
            Err(e) => {
                tracing::warn!(
                    key = %self.key,
                    error = %e,
                    "stored document is malformed, using defaults"
                );
                Document::default()
            }
        }
    }

    /// Returns false when the write was rejected; the previous blob stays in place.
    pub fn save(&mut self, doc: &Document) -> bool {
        let text = match serde_json::to_string(doc) {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize document");
                return false;
            }
        };
        match self.storage.set(&self.key, &text) {
            Ok(()) => {
                tracing::debug!(key = %self.key, bytes = text.len(), "document saved");
                true
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "document write rejected");
                false
            }
        }
    }

    pub fn reset(&mut self, replacement: Option<Document>) -> Mutation {
        let document = replacement.unwrap_or_default();
        self.commit(document)
    }

    fn commit(&mut self, document: Document) -> Mutation {
        let saved = self.save(&document);
        Mutation { document, saved }
    }

    fn mutate(&mut self, f: impl FnOnce(&mut Document)) -> Mutation {
        let mut document = self.load();
        f(&mut document);
        self.commit(document)
    }

    pub fn collection<R: Record>(&self) -> Vec<R> {
        R::items(&self.load()).to_vec()
    }

    pub fn add_record<R: Record>(&mut self, record: R) -> Mutation {
        tracing::debug!(collection = %R::COLLECTION, id = %record.id(), "add record");
        self.mutate(|doc| R::items_mut(doc).push(record))
    }

    /// Unknown ids leave the collection as it was.
    pub fn update_record<R: Record>(&mut self, id: &R::Id, patch: R::Patch) -> Mutation {
        tracing::debug!(collection = %R::COLLECTION, %id, "update record");
        self.mutate(|doc| {
            if let Some(record) = R::items_mut(doc).iter_mut().find(|r| r.id() == id) {
                record.apply_patch(patch);
            }
        })
    }

    /// Unknown ids leave the collection as it was.
    pub fn remove_record<R: Record>(&mut self, id: &R::Id) -> Mutation {
        tracing::debug!(collection = %R::COLLECTION, %id, "remove record");
        self.mutate(|doc| R::items_mut(doc).retain(|r| r.id() != id))
    }

    pub fn replace_collection<R: Record>(&mut self, records: Vec<R>) -> Mutation {
        tracing::debug!(collection = %R::COLLECTION, count = records.len(), "replace collection");
        self.mutate(|doc| *R::items_mut(doc) = records)
    }

    pub fn schedule(&self, class_id: &ClassId) -> Schedule {
        self.load()
            .schedule
            .get(class_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the class's schedule as a whole; nothing is merged.
    pub fn set_schedule(&mut self, class_id: &ClassId, schedule: Schedule) -> Mutation {
        tracing::debug!(%class_id, assignments = schedule.assignment_count(), "set schedule");
        self.mutate(|doc| {
            doc.schedule.insert(class_id.clone(), schedule);
        })
    }

    pub fn selected_class(&self) -> Option<Class> {
        self.load().selected_class
    }

    pub fn set_selected_class(&mut self, class: Option<Class>) -> Mutation {
        self.mutate(|doc| doc.selected_class = class)
    }

    /// Overwrites each top-level key present in `patch`; other keys are left alone.
    pub fn import_document(&mut self, patch: DocumentPatch) -> Mutation {
        if !patch.ignored_keys.is_empty() {
            tracing::warn!(keys = ?patch.ignored_keys, "ignoring unrecognized import keys");
        }
        self.mutate(|doc| {
            let applied = patch.apply_to(doc);
            tracing::info!(keys = ?applied, "imported document keys");
        })
    }

    pub fn import_collection<R: Record>(&mut self, records: Vec<R>) -> Mutation {
        tracing::info!(collection = %R::COLLECTION, count = records.len(), "imported collection");
        self.replace_collection(records)
    }

    pub fn is_data_loaded(&self) -> bool {
        self.load().is_data_loaded()
    }

    /// Writes the default school data when classes, teachers and subjects are all empty.
    pub fn seed_if_empty(&mut self) -> Option<Mutation> {
        if self.is_data_loaded() {
            return None;
        }
        tracing::info!("workspace is empty, seeding default data");
        Some(self.commit(seed::default_document()))
    }
}
