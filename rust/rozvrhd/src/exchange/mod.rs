//! File import and export.
//!
//! Imports are parse-then-apply: a payload is read and fully converted into typed values
//! before anything touches the store, so a failure never leaves a half-applied document.

pub mod csv;

use crate::document::{value_kind, Document, DocumentPatch, Provenance};
use crate::error::ImportError;
use crate::model::{Class, ClassId};
use crate::record::{check_records, Record};
use crate::schedule::Schedule;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

use self::csv::{parse_csv, write_csv, CsvRow};

pub const EXPORT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Json,
}

impl FileFormat {
    pub fn parse(name: &str) -> Option<FileFormat> {
        match name.to_ascii_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "json" => Some(FileFormat::Json),
            _ => None,
        }
    }

    /// The extension decides the parser.
    pub fn from_path(path: &Path) -> Result<FileFormat, ImportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        FileFormat::parse(ext).ok_or_else(|| ImportError::UnsupportedFormat(ext.to_string()))
    }
}

/// Reads a whole file as text. Each call resolves exactly once and cannot be cancelled.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}

pub struct TokioFileSource;

#[async_trait]
impl FileSource for TokioFileSource {
    async fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportPayload {
    Rows(Vec<CsvRow>),
    Json(Value),
}

impl ImportPayload {
    pub fn parse(format: FileFormat, text: &str) -> Result<ImportPayload, ImportError> {
        match format {
            FileFormat::Csv => Ok(ImportPayload::Rows(parse_csv(text))),
            FileFormat::Json => Ok(ImportPayload::Json(serde_json::from_str(text)?)),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ImportPayload::Rows(_) => "CSV rows",
            ImportPayload::Json(v) => value_kind(v),
        }
    }
}

pub async fn import_from_file(
    source: &dyn FileSource,
    path: &Path,
) -> Result<ImportPayload, ImportError> {
    let format = FileFormat::from_path(path)?;
    let text = source
        .read_to_string(path)
        .await
        .map_err(|e| ImportError::Read {
            path: path.to_string_lossy().to_string(),
            reason: e.to_string(),
        })?;
    ImportPayload::parse(format, &text)
}

/// Converts a payload into records of one collection. CSV rows go through the lossy
/// per-entity conversion; JSON must be an array of records.
pub fn records_from_payload<R: Record>(payload: ImportPayload) -> Result<Vec<R>, ImportError> {
    let records: Vec<R> = match payload {
        ImportPayload::Rows(rows) => rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                // +2: one for the header line, one for 1-based numbering.
                R::from_csv_row(row).map_err(|message| ImportError::InvalidRow {
                    row: i + 2,
                    message,
                })
            })
            .collect::<Result<_, _>>()?,
        ImportPayload::Json(value @ Value::Array(_)) => {
            serde_json::from_value(value).map_err(|e| ImportError::InvalidField {
                key: R::COLLECTION.to_string(),
                reason: e.to_string(),
            })?
        }
        other => {
            return Err(ImportError::WrongShape {
                expected: "an array of records",
                found: other.kind(),
            })
        }
    };
    check_records(&records)?;
    Ok(records)
}

pub fn document_patch_from_payload(payload: ImportPayload) -> Result<DocumentPatch, ImportError> {
    match payload {
        ImportPayload::Json(Value::Object(map)) => DocumentPatch::from_object(map),
        other => Err(ImportError::WrongShape {
            expected: "a JSON object",
            found: other.kind(),
        }),
    }
}

/// A parsed single-class schedule file.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleImport {
    pub class_id: ClassId,
    pub class_name: Option<String>,
    pub schedule: Schedule,
    pub provenance: Provenance,
}

impl ScheduleImport {
    pub fn from_payload(payload: ImportPayload) -> Result<ScheduleImport, ImportError> {
        let mut map = match payload {
            ImportPayload::Json(Value::Object(map)) => map,
            other => {
                return Err(ImportError::WrongShape {
                    expected: "a JSON object",
                    found: other.kind(),
                })
            }
        };

        let class_id = match map.remove("classId") {
            None | Some(Value::Null) => return Err(ImportError::MissingField("classId")),
            Some(Value::String(s)) if s.is_empty() => {
                return Err(ImportError::MissingField("classId"))
            }
            Some(Value::String(s)) => ClassId::from(s),
            Some(other) => {
                return Err(ImportError::InvalidField {
                    key: "classId".to_string(),
                    reason: format!("expected a string, found {}", value_kind(&other)),
                })
            }
        };
        let schedule = match map.remove("schedule") {
            None | Some(Value::Null) => return Err(ImportError::MissingField("schedule")),
            Some(v) => serde_json::from_value(v).map_err(|e| ImportError::InvalidField {
                key: "schedule".to_string(),
                reason: e.to_string(),
            })?,
        };

        Ok(ScheduleImport {
            class_id,
            class_name: map
                .get("className")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            schedule,
            provenance: Provenance {
                export_date: map.remove("exportDate"),
                version: map.remove("version"),
            },
        })
    }

    /// The class the schedule will be written to. A file exported for another class needs an
    /// explicit confirmation.
    pub fn resolve_target(
        &self,
        target: Option<&ClassId>,
        confirmed: bool,
    ) -> Result<ClassId, ImportError> {
        let Some(target) = target else {
            return Err(ImportError::NoTargetClass);
        };
        if *target != self.class_id && !confirmed {
            return Err(ImportError::ConfirmationRequired {
                source_label: self
                    .class_name
                    .clone()
                    .unwrap_or_else(|| self.class_id.to_string()),
                target_class: target.to_string(),
            });
        }
        Ok(target.clone())
    }
}

pub fn export_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn collection_to_csv<R: Record>(records: &[R]) -> String {
    let rows: Vec<_> = records.iter().map(Record::to_flat_row).collect();
    write_csv(&rows)
}

pub fn collection_to_json<R: Record>(records: &[R]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(records)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentExport<'a> {
    #[serde(flatten)]
    document: &'a Document,
    export_date: &'a str,
    version: &'static str,
}

pub fn document_to_json(doc: &Document, export_date: &str) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&DocumentExport {
        document: doc,
        export_date,
        version: EXPORT_VERSION,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleExport<'a> {
    class_id: &'a ClassId,
    class_name: &'a str,
    year: i64,
    schedule: &'a Schedule,
    export_date: &'a str,
    version: &'static str,
}

pub fn schedule_to_json(
    class: &Class,
    schedule: &Schedule,
    export_date: &str,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&ScheduleExport {
        class_id: &class.id,
        class_name: &class.name,
        year: class.year,
        schedule,
        export_date,
        version: EXPORT_VERSION,
    })
}
