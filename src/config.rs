use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::MetavizError;

pub const CONFIG_FILE_NAME: &str = "metaviz.json";
pub const DEFAULT_ENTREZ_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub entrez: Option<EntrezEntry>,
    #[serde(default)]
    pub catalog_dir: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EntrezEntry {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Operator identity and access token sent with every Entrez request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrezConfig {
    pub email: Option<String>,
    pub api_key: Option<String>,
    pub tool: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for EntrezConfig {
    fn default() -> Self {
        Self {
            email: None,
            api_key: None,
            tool: "metaviz".to_string(),
            base_url: DEFAULT_ENTREZ_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub entrez: EntrezConfig,
    pub catalog_dir: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, MetavizError> {
        let config = match Self::locate(path) {
            Some(config_path) => {
                debug!(path = %config_path.display(), "loading config");
                let content = fs::read_to_string(&config_path)
                    .map_err(|_| MetavizError::ConfigRead(config_path.clone()))?;
                serde_json::from_str(&content)
                    .map_err(|err| MetavizError::ConfigParse(err.to_string()))?
            }
            None => Config::default(),
        };

        let mut resolved = Self::resolve_config(config)?;
        apply_env_overrides(&mut resolved.entrez, |key| std::env::var(key).ok());
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, MetavizError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(MetavizError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let defaults = EntrezConfig::default();
        let entrez = match config.entrez {
            Some(entry) => EntrezConfig {
                email: entry.email,
                api_key: entry.api_key,
                tool: entry.tool.unwrap_or(defaults.tool),
                base_url: entry.base_url.unwrap_or(defaults.base_url),
                timeout_secs: entry.timeout_secs.unwrap_or(defaults.timeout_secs),
            },
            None => defaults,
        };

        Ok(ResolvedConfig {
            schema_version,
            entrez,
            catalog_dir: Utf8PathBuf::from(config.catalog_dir.unwrap_or_else(|| "data".to_string())),
        })
    }

    /// Explicit path, then the working directory, then the user config dir.
    fn locate(path: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = path {
            return Some(PathBuf::from(path));
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("org", "metaviz", "metaviz")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|candidate| candidate.exists())
    }
}

/// `NCBI_API_KEY` and `NCBI_EMAIL` win over file values when set.
pub fn apply_env_overrides<F>(entrez: &mut EntrezConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(api_key) = lookup("NCBI_API_KEY").filter(|v| !v.trim().is_empty()) {
        entrez.api_key = Some(api_key.trim().to_string());
    }
    if let Some(email) = lookup("NCBI_EMAIL").filter(|v| !v.trim().is_empty()) {
        entrez.email = Some(email.trim().to_string());
    }
}
