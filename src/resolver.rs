// 🔎 Record Resolver - one CNPJ → one FundRecord
//
// Scans registro_fundo comparing the digit projection of CNPJ_Fundo.
// The projection is recomputed on every call; nothing is cached.

use crate::cnpj::{digits_only, format_cnpj, format_tax_id, PersonType};
use crate::registry::{Registry, CODE_COLUMN, CONSTITUTION_DATE_COLUMN};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// COLUMNS
// ============================================================================

pub const FUND_CNPJ_COLUMN: &str = "CNPJ_Fundo";
pub const NAME_COLUMN: &str = "Denominacao_Social";
pub const ADMIN_COLUMN: &str = "Administrador";
pub const ADMIN_CNPJ_COLUMN: &str = "CNPJ_Administrador";
pub const MANAGER_COLUMN: &str = "Gestor";
pub const MANAGER_TYPE_COLUMN: &str = "Tipo_Pessoa_Gestor";
pub const MANAGER_ID_COLUMN: &str = "CPF_CNPJ_Gestor";
pub const EXCLUSIVE_FIELD: &str = "Exclusivo";

/// Output columns, in display order. Also the ficha placeholder names.
pub const FIELD_ORDER: [&str; 9] = [
    CODE_COLUMN,
    NAME_COLUMN,
    CONSTITUTION_DATE_COLUMN,
    FUND_CNPJ_COLUMN,
    ADMIN_COLUMN,
    ADMIN_CNPJ_COLUMN,
    MANAGER_COLUMN,
    MANAGER_ID_COLUMN,
    EXCLUSIVE_FIELD,
];

// ============================================================================
// TYPES
// ============================================================================

/// Exclusive-fund flag.
///
/// registro_subclasse looks like the source for it, but the join has never
/// been specified, so the value is not computed and keeps the legacy `???`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusiveStatus {
    #[default]
    #[serde(rename = "???")]
    NotComputed,
}

impl ExclusiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExclusiveStatus::NotComputed => "???",
        }
    }
}

/// Resolved fund, one per looked-up CNPJ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    #[serde(rename = "Codigo_CVM")]
    pub codigo_cvm: String,

    #[serde(rename = "Denominacao_Social")]
    pub denominacao_social: String,

    /// DD/MM/YYYY, empty when the registry date was unusable
    #[serde(rename = "Data_Constituicao")]
    pub data_constituicao: String,

    #[serde(rename = "CNPJ_Fundo")]
    pub cnpj_fundo: String,

    #[serde(rename = "Administrador")]
    pub administrador: String,

    #[serde(rename = "CNPJ_Administrador")]
    pub cnpj_administrador: String,

    #[serde(rename = "Gestor")]
    pub gestor: String,

    /// CPF or CNPJ depending on Tipo_Pessoa_Gestor
    #[serde(rename = "CPF_CNPJ_Gestor")]
    pub cpf_cnpj_gestor: String,

    #[serde(rename = "Exclusivo")]
    pub exclusivo: ExclusiveStatus,
}

impl FundRecord {
    /// (column, value) pairs in FIELD_ORDER
    pub fn fields(&self) -> [(&'static str, &str); 9] {
        [
            (CODE_COLUMN, self.codigo_cvm.as_str()),
            (NAME_COLUMN, self.denominacao_social.as_str()),
            (CONSTITUTION_DATE_COLUMN, self.data_constituicao.as_str()),
            (FUND_CNPJ_COLUMN, self.cnpj_fundo.as_str()),
            (ADMIN_COLUMN, self.administrador.as_str()),
            (ADMIN_CNPJ_COLUMN, self.cnpj_administrador.as_str()),
            (MANAGER_COLUMN, self.gestor.as_str()),
            (MANAGER_ID_COLUMN, self.cpf_cnpj_gestor.as_str()),
            (EXCLUSIVE_FIELD, self.exclusivo.as_str()),
        ]
    }

    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields()
            .into_iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }
}

/// Why a single lookup produced no record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("CNPJ inválido: informe 14 dígitos.")]
    InvalidLength,

    #[error("CNPJ não encontrado em registro_classe.")]
    NotFound,
}

// ============================================================================
// RESOLVE
// ============================================================================

/// Look up one fund by CNPJ (punctuation allowed, 14 digits required)
pub fn resolve(registry: &Registry, identifier: &str) -> Result<FundRecord, LookupError> {
    let digits = digits_only(identifier);
    if digits.len() != 14 {
        return Err(LookupError::InvalidLength);
    }

    let row = registry
        .fundo
        .rows()
        .iter()
        .find(|row| digits_only(row.get_or_empty(FUND_CNPJ_COLUMN)) == digits)
        .ok_or(LookupError::NotFound)?;

    let manager_type = PersonType::from_code(row.get_or_empty(MANAGER_TYPE_COLUMN));

    Ok(FundRecord {
        codigo_cvm: row.get_or_empty(CODE_COLUMN).to_string(),
        denominacao_social: row.get_or_empty(NAME_COLUMN).to_string(),
        data_constituicao: row.get_or_empty(CONSTITUTION_DATE_COLUMN).to_string(),
        cnpj_fundo: format_cnpj(&digits),
        administrador: row.get_or_empty(ADMIN_COLUMN).to_string(),
        cnpj_administrador: format_cnpj(row.get_or_empty(ADMIN_CNPJ_COLUMN)),
        gestor: row.get_or_empty(MANAGER_COLUMN).to_string(),
        cpf_cnpj_gestor: format_tax_id(row.get_or_empty(MANAGER_ID_COLUMN), manager_type)
            .into_string(),
        exclusivo: ExclusiveStatus::NotComputed,
    })
}

// ============================================================================
// TESTS
// ============================================================================
