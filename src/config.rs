use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "attendd.toml";
const CONFIG_PATH_ENV: &str = "ATTENDD_CONFIG";
const ENV_PREFIX: &str = "ATTENDD_";

/// Sidecar configuration.
///
/// Sources, later ones winning: defaults, the TOML file named by
/// `ATTENDD_CONFIG` (or `attendd.toml` in the working directory), then
/// `ATTENDD_*` environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Workspace opened at startup. Without it the front-end must call
    /// `workspace.select` first.
    pub workspace: Option<PathBuf>,
    pub students_file: String,
    pub attendance_file: String,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            students_file: "students.json".to_string(),
            attendance_file: "attendance.csv".to_string(),
            log_filter: "attendd=info".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = std::env::var_os(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Self::load_from(Figment::new().merge(Toml::file(path)).merge(Env::prefixed(ENV_PREFIX)))
    }

    fn load_from(sources: Figment) -> Result<Self> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(sources)
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for (key, name) in [
            ("students_file", &self.students_file),
            ("attendance_file", &self.attendance_file),
        ] {
            let t = name.trim();
            if t.is_empty() {
                return Err(Error::ConfigValidation {
                    message: format!("{key} must not be empty"),
                });
            }
            if t.contains('/') || t.contains('\\') {
                return Err(Error::ConfigValidation {
                    message: format!("{key} must be a plain file name, got {t:?}"),
                });
            }
        }
        if self.students_file.trim() == self.attendance_file.trim() {
            return Err(Error::ConfigValidation {
                message: "students_file and attendance_file must differ".to_string(),
            });
        }
        Ok(())
    }
}
