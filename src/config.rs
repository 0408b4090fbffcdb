//! Start-up settings, read from `MARKSHEETD_*` environment variables after an
//! optional `.env` file is loaded.

use serde::Deserialize;
use std::path::PathBuf;

const ENV_PREFIX: &str = "MARKSHEETD";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// `tracing` filter directive.
    pub log: String,
    /// Workspace opened before the first request, if set.
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    /// SQLite file name inside the workspace.
    pub db_file: String,
}

impl Settings {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: config::Environment) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .set_default("log", "info")?
            .set_default("db_file", "marksheet.sqlite3")?
            .add_source(env)
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn defaults_apply_without_environment() {
        let s = Settings::from_env(env_from(&[])).expect("load");
        assert_eq!(s.log, "info");
        assert_eq!(s.db_file, "marksheet.sqlite3");
        assert!(s.workspace.is_none());
    }

    #[test]
    fn prefixed_variables_override_defaults() {
        let s = Settings::from_env(env_from(&[
            ("MARKSHEETD_LOG", "debug"),
            ("MARKSHEETD_WORKSPACE", "/tmp/school"),
            ("MARKSHEETD_DB_FILE", "term.sqlite3"),
        ]))
        .expect("load");
        assert_eq!(s.log, "debug");
        assert_eq!(s.workspace, Some(PathBuf::from("/tmp/school")));
        assert_eq!(s.db_file, "term.sqlite3");
    }
}
