// Cycle settings
// Loaded from an explicit path, $VMASTER_CONFIG, ./vmaster.toml, or
// ~/.config/vmaster/config.toml; first hit wins. Loaded once per process
// and passed into components by value; nothing here is a global cache.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "VMASTER_CONFIG";
pub const GRC_TOKEN_ENV: &str = "VMASTER_GRC_TOKEN";
pub const STORAGE_TOKEN_ENV: &str = "VMASTER_STORAGE_TOKEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Actor recorded on every merge row this process submits.
    pub changed_by: String,
    pub databases: DatabaseSettings,
    pub grc: GrcSettings,
    pub mapping: MappingSettings,
    pub storage: StorageSettings,
    pub upload: UploadSettings,
    pub export: ExportSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            changed_by: "vmaster-cycle".to_string(),
            databases: DatabaseSettings::default(),
            grc: GrcSettings::default(),
            mapping: MappingSettings::default(),
            storage: StorageSettings::default(),
            upload: UploadSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// ERP mirror (read-only for us).
    pub erp: PathBuf,
    /// Staging database holding the vendor mapping table.
    pub staging: PathBuf,
    /// Master database the merge writes to.
    pub master: PathBuf,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GrcSettings {
    pub base_url: String,
    pub workflow_id: String,
    pub step_id: String,
    /// Bearer token; falls back to $VMASTER_GRC_TOKEN.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MappingSettings {
    /// Directory checked for a fresh mapping workbook. Empty = staging only.
    pub inbox_dir: Option<PathBuf>,
    /// Worksheet holding the mapping rows.
    pub sheet: String,
}

impl Default for MappingSettings {
    fn default() -> Self {
        Self {
            inbox_dir: None,
            sheet: "Vendor Mapping".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub endpoint: String,
    pub container: String,
    /// Bearer token; falls back to $VMASTER_STORAGE_TOKEN.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadSettings {
    pub attempts: u32,
    pub delay_secs: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub dir: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("out"),
        }
    }
}

impl Settings {
    /// Load settings: explicit path > $VMASTER_CONFIG > ./vmaster.toml >
    /// ~/.config/vmaster/config.toml.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut searched = Vec::new();

        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(path) = explicit {
            candidates.push(path.to_path_buf());
        } else {
            if let Ok(env_path) = std::env::var(CONFIG_ENV) {
                candidates.push(PathBuf::from(env_path));
            }
            candidates.push(PathBuf::from("vmaster.toml"));
            if let Some(config_dir) = dirs::config_dir() {
                candidates.push(config_dir.join("vmaster").join("config.toml"));
            }
        }

        for path in candidates {
            if path.is_file() {
                return Self::load_file(&path);
            }
            searched.push(path);
        }

        Err(ConfigError::NotFound { searched })
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Everything a cycle needs before it is allowed to touch any source.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.databases.erp.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("databases.erp is not set".into()));
        }
        if self.databases.staging.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("databases.staging is not set".into()));
        }
        if self.databases.master.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("databases.master is not set".into()));
        }
        if self.grc.base_url.is_empty() {
            return Err(ConfigError::Invalid("grc.base_url is not set".into()));
        }
        if self.grc.workflow_id.is_empty() || self.grc.step_id.is_empty() {
            return Err(ConfigError::Invalid(
                "grc.workflow_id and grc.step_id are both required".into(),
            ));
        }
        if self.upload.attempts == 0 {
            return Err(ConfigError::Invalid("upload.attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// GRC API token: settings file > environment > error.
    pub fn grc_token(&self) -> Result<String, ConfigError> {
        resolve_token(self.grc.token.as_deref(), "GRC API", GRC_TOKEN_ENV)
    }

    /// Remote storage token: settings file > environment > error.
    pub fn storage_token(&self) -> Result<String, ConfigError> {
        resolve_token(self.storage.token.as_deref(), "storage", STORAGE_TOKEN_ENV)
    }
}

fn resolve_token(
    from_file: Option<&str>,
    which: &'static str,
    env: &'static str,
) -> Result<String, ConfigError> {
    if let Some(token) = from_file {
        if !token.is_empty() {
            return Ok(token.to_string());
        }
    }
    match std::env::var(env) {
        Ok(token) if !token.is_empty() => Ok(token),
        _ => Err(ConfigError::MissingToken { which, env }),
    }
}
