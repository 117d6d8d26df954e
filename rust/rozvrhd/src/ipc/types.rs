use crate::config::Config;
use crate::exchange::{FileSource, TokioFileSource};
use crate::storage::SqliteStorage;
use crate::store::SnapshotStore;
use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<SnapshotStore<SqliteStorage>>,
    pub config: Config,
    pub files: Box<dyn FileSource>,
    /// Drives file reads; requests themselves are handled one at a time on the main thread.
    pub runtime: tokio::runtime::Runtime,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .context("failed to start file reader runtime")?;
        Ok(AppState {
            workspace: None,
            store: None,
            config: Config::default(),
            files: Box::new(TokioFileSource),
            runtime,
        })
    }
}
