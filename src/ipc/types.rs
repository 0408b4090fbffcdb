use std::path::{Path, PathBuf};

use rusqlite::Connection;
use serde::Deserialize;

use crate::db;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The open workspace, if any. One connection serves every request.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    /// File name used when a workspace is opened.
    pub db_file: String,
}

impl AppState {
    pub fn new(db_file: impl Into<String>) -> Self {
        Self {
            workspace: None,
            db: None,
            db_file: db_file.into(),
        }
    }

    /// Opens (or creates) the database under `path` and makes it current. The
    /// previous workspace stays selected when this fails.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        let conn = db::open_db(path, &self.db_file)?;
        self.workspace = Some(path.to_path_buf());
        self.db = Some(conn);
        Ok(())
    }
}
