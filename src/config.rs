// ⚙️ Configuration - defaults ← .cvm-fichas.json ← CVM_FICHAS_* env vars
// CLI flags are applied on top by the binaries.

use crate::error::{FichaError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".cvm-fichas.json";

pub const DEFAULT_REGISTRY_URL: &str =
    "https://dados.cvm.gov.br/dados/FI/CAD/DADOS/registro_fundo_classe.zip";
pub const DEFAULT_TEMPLATE_PATH: &str = "models/FICHA_FUNDO.docx";
pub const DEFAULT_OUTPUT_PATH: &str = "fichas_fundos.zip";
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

pub const ENV_REGISTRY_URL: &str = "CVM_FICHAS_REGISTRY_URL";
pub const ENV_REGISTRY_FILE: &str = "CVM_FICHAS_REGISTRY_FILE";
pub const ENV_TEMPLATE: &str = "CVM_FICHAS_TEMPLATE";
pub const ENV_OUTPUT: &str = "CVM_FICHAS_OUTPUT";
pub const ENV_LOG: &str = "CVM_FICHAS_LOG";
pub const ENV_SERVER_ADDR: &str = "CVM_FICHAS_ADDR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where the CVM registry archive is downloaded from
    pub registry_url: String,

    /// Local copy of the archive; when set, no download happens
    pub registry_file: Option<PathBuf>,

    pub template_path: PathBuf,

    /// Where generated fichas are saved
    pub output_path: PathBuf,

    /// tracing EnvFilter directive
    pub log_filter: String,

    /// Bind address of the API server
    pub server_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            registry_file: None,
            template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            log_filter: "info".to_string(),
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
        }
    }
}

impl Config {
    /// Defaults, then ./.cvm-fichas.json if present, then environment
    pub fn load() -> Result<Self> {
        let config = Self::load_from(Path::new(CONFIG_FILE))?;
        Ok(config.with_env(|key| std::env::var(key).ok()))
    }

    /// Read a JSON config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| FichaError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from an environment lookup
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_REGISTRY_URL) {
            self.registry_url = url;
        }
        if let Some(file) = lookup(ENV_REGISTRY_FILE) {
            self.registry_file = Some(PathBuf::from(file));
        }
        if let Some(template) = lookup(ENV_TEMPLATE) {
            self.template_path = PathBuf::from(template);
        }
        if let Some(output) = lookup(ENV_OUTPUT) {
            self.output_path = PathBuf::from(output);
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        if let Some(addr) = lookup(ENV_SERVER_ADDR) {
            self.server_addr = addr;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
        assert_eq!(config.template_path, PathBuf::from("models/FICHA_FUNDO.docx"));
        assert_eq!(config.output_path, PathBuf::from("fichas_fundos.zip"));
        assert!(config.registry_file.is_none());
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"registry_file": "cache/registro.zip", "log_filter": "debug"}"#)
            .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.registry_file, Some(PathBuf::from("cache/registro.zip")));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
    }

    #[test]
    fn test_load_from_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, FichaError::Config { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_TEMPLATE, "/srv/FICHA.docx"),
            (ENV_OUTPUT, "/tmp/out.zip"),
            (ENV_SERVER_ADDR, "127.0.0.1:8080"),
        ]
        .into_iter()
        .collect();

        let config = Config::default().with_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.template_path, PathBuf::from("/srv/FICHA.docx"));
        assert_eq!(config.output_path, PathBuf::from("/tmp/out.zip"));
        assert_eq!(config.server_addr, "127.0.0.1:8080");
        assert_eq!(config.registry_url, DEFAULT_REGISTRY_URL);
    }
}
