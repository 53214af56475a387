// CVM Fichas - Core Library
// Fund lookup by CNPJ over the CVM registry + ficha (docx) generation.
// Used by the CLI/TUI, the API server, and tests.

pub mod batch;
pub mod cnpj;
pub mod config;
pub mod error;
pub mod ficha;
pub mod registry;
pub mod resolver;
pub mod session;

#[cfg(test)]
mod fixtures;

// Re-export commonly used types
pub use batch::{resolve_batch, split_identifiers, BatchResult, ResultTable};
pub use cnpj::{digits_only, format_cnpj, format_tax_id, PersonType, TaxIdFormat};
pub use config::Config;
pub use error::{FichaError, Result};
pub use ficha::{fill_placeholders, ficha_entry_name, render, FichaData, FichaRecords, Template};
pub use registry::{Registry, RegistryRow, RegistryTable};
pub use resolver::{resolve, ExclusiveStatus, FundRecord, LookupError, FIELD_ORDER};
pub use session::Session;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
