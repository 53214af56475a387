// ⚠️ Error types - registry load, template and render failures
// Per-item lookup failures live in resolver::LookupError and never reach here.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FichaError>;

/// Whole-registry / whole-template / whole-archive failures
#[derive(Debug, Error)]
pub enum FichaError {
    #[error("Template não encontrado: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("invalid ficha template: {0}")]
    InvalidTemplate(String),

    #[error("failed to render ficha {key}: {source}")]
    Render {
        key: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("registry unavailable: failed to download {url}: {source}")]
    RegistryFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("registry unavailable: invalid archive: {0}")]
    RegistryArchive(#[from] zip::result::ZipError),

    #[error("registry unavailable: failed to read {what}: {source}")]
    RegistryRead {
        what: String,
        #[source]
        source: std::io::Error,
    },

    #[error("registry unavailable: {0} missing from archive")]
    MissingMember(String),

    #[error("registry unavailable: column {column} missing from {table}")]
    MissingColumn { table: String, column: String },

    #[error("registry unavailable: failed to parse {member}: {source}")]
    Csv {
        member: String,
        #[source]
        source: csv::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl FichaError {
    /// True when the error means the registry tables could not be built
    pub fn is_registry_unavailable(&self) -> bool {
        matches!(
            self,
            FichaError::RegistryFetch { .. }
                | FichaError::RegistryRead { .. }
                | FichaError::RegistryArchive(_)
                | FichaError::MissingMember(_)
                | FichaError::MissingColumn { .. }
                | FichaError::Csv { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_not_found_message() {
        let err = FichaError::TemplateNotFound(PathBuf::from("models/FICHA_FUNDO.docx"));
        assert_eq!(err.to_string(), "Template não encontrado: models/FICHA_FUNDO.docx");
        assert!(!err.is_registry_unavailable());
    }

    #[test]
    fn test_missing_member_is_registry_unavailable() {
        let err = FichaError::MissingMember("registro_fundo.csv".to_string());
        assert!(err.is_registry_unavailable());
        assert!(err.to_string().starts_with("registry unavailable"));
    }

    #[test]
    fn test_registry_read_is_registry_unavailable() {
        let err = FichaError::RegistryRead {
            what: "registro_fundo.csv".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, "Invalid checksum"),
        };
        assert!(err.is_registry_unavailable());
        assert_eq!(
            err.to_string(),
            "registry unavailable: failed to read registro_fundo.csv: Invalid checksum"
        );
    }
}
