// 📋 Batch Resolver - free text with many CNPJs → BatchResult
//
// Nothing here fails: malformed pieces and unknown CNPJs are reported as data.

use crate::cnpj::{digits_only, format_cnpj};
use crate::ficha::{FichaData, FichaRecords};
use crate::registry::Registry;
use crate::resolver::{resolve, FundRecord, FIELD_ORDER};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

static SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,;\n]+").expect("separator pattern is valid"));

// ============================================================================
// RESULT TABLE
// ============================================================================

/// Resolved funds in input order, keyed by formatted CNPJ_Fundo
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<FundRecord>,
}

impl ResultTable {
    pub fn columns(&self) -> &'static [&'static str] {
        &FIELD_ORDER
    }

    pub fn records(&self) -> &[FundRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index column (formatted CNPJ_Fundo) in row order
    pub fn index(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.cnpj_fundo.as_str()).collect()
    }

    pub fn get(&self, cnpj_fundo: &str) -> Option<&FundRecord> {
        self.rows.iter().find(|r| r.cnpj_fundo == cnpj_fundo)
    }

    fn push(&mut self, record: FundRecord) {
        self.rows.push(record);
    }
}

// ============================================================================
// BATCH RESULT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(rename = "resultados")]
    pub records: ResultTable,

    /// Trimmed input pieces that did not reduce to 14 digits
    #[serde(rename = "invalidos")]
    pub malformed: Vec<String>,

    /// "<formatted CNPJ>: <reason>" for well-formed CNPJs that failed
    #[serde(rename = "erros")]
    pub errors: Vec<String>,
}

impl BatchResult {
    /// Renderer input: formatted CNPJ_Fundo → placeholder values, in table
    /// order. Empty values become None.
    pub fn ficha_data(&self) -> FichaRecords {
        self.records
            .records()
            .iter()
            .map(|record| {
                let data: FichaData = record
                    .fields()
                    .iter()
                    .map(|(name, value)| {
                        let value = if value.is_empty() {
                            None
                        } else {
                            Some(value.to_string())
                        };
                        (name.to_string(), value)
                    })
                    .collect();
                (record.cnpj_fundo.clone(), data)
            })
            .collect()
    }
}

// ============================================================================
// FUNCTIONS
// ============================================================================

/// Split on runs of ',', ';' or newline; trim; drop empty pieces
pub fn split_identifiers(raw: &str) -> Vec<&str> {
    SEPARATORS
        .split(raw.trim())
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}

/// Resolve every CNPJ found in `raw_text`.
///
/// Repeats (same digits) are dropped silently, keeping first-seen order.
pub fn resolve_batch(registry: &Registry, raw_text: &str) -> BatchResult {
    let mut result = BatchResult::default();
    let mut candidates = Vec::new();

    for piece in split_identifiers(raw_text) {
        let digits = digits_only(piece);
        if digits.len() == 14 {
            candidates.push(digits);
        } else {
            result.malformed.push(piece.to_string());
        }
    }

    let mut seen = HashSet::new();
    for digits in candidates {
        if !seen.insert(digits.clone()) {
            continue;
        }

        match resolve(registry, &digits) {
            Ok(record) => result.records.push(record),
            Err(err) => result.errors.push(format!("{}: {}", format_cnpj(&digits), err)),
        }
    }

    info!(
        resolved = result.records.len(),
        malformed = result.malformed.len(),
        errors = result.errors.len(),
        "batch resolved"
    );

    result
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_split_identifiers_mixed_separators() {
        let pieces = split_identifiers(" 11.111.111/0001-91 ,;\n 22222222000122;\n\n33 ");
        assert_eq!(pieces, vec!["11.111.111/0001-91", "22222222000122", "33"]);
    }

    #[test]
    fn test_split_identifiers_empty() {
        assert!(split_identifiers("").is_empty());
        assert!(split_identifiers(" ,;\n ").is_empty());
    }

    #[test]
    fn test_duplicates_resolved_once() {
        let registry = fixtures::sample_registry();
        let result = resolve_batch(&registry, "11111111000199, 11111111000199");

        assert_eq!(result.records.len() + result.errors.len(), 1);
        assert!(result.malformed.is_empty());
    }

    #[test]
    fn test_duplicates_across_punctuation() {
        let registry = fixtures::sample_registry();
        let result = resolve_batch(&registry, "12.345.678/0001-90\n12345678000190");

        assert_eq!(result.records.len(), 1);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_malformed_never_resolved() {
        let registry = fixtures::sample_registry();
        let result = resolve_batch(&registry, "123; abc");

        assert_eq!(result.malformed, vec!["123".to_string(), "abc".to_string()]);
        assert!(result.records.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_not_found_reported_as_error() {
        let registry = fixtures::sample_registry();
        let result = resolve_batch(&registry, "00000000000000");

        assert!(result.records.is_empty());
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("00.000.000/0000-00: "));
        assert!(result.errors[0].contains("não encontrado"));
    }

    #[test]
    fn test_mixed_batch_keeps_input_order() {
        let registry = fixtures::sample_registry();
        let result = resolve_batch(
            &registry,
            "98765432000110, 123, 12.345.678/0001-90; 00000000000000",
        );

        assert_eq!(result.records.index(), vec!["98.765.432/0001-10", "12.345.678/0001-90"]);
        assert_eq!(result.malformed, vec!["123".to_string()]);
        assert_eq!(result.errors.len(), 1);

        let record = result.records.get("12.345.678/0001-90").unwrap();
        assert_eq!(record.codigo_cvm, "100");
        assert_eq!(result.records.columns(), &FIELD_ORDER);
    }

    #[test]
    fn test_ficha_data_keys_and_empty_values() {
        let registry = fixtures::sample_registry();
        let result = resolve_batch(&registry, "11111111000191");
        let data = result.ficha_data();

        assert_eq!(data.len(), 1);
        let (key, fields) = &data[0];
        assert_eq!(key, "11.111.111/0001-91");
        assert_eq!(fields.len(), FIELD_ORDER.len());
        assert_eq!(fields["Codigo_CVM"], Some("300".to_string()));
        assert_eq!(fields["Data_Constituicao"], None);
        assert_eq!(fields["Exclusivo"], Some("???".to_string()));
    }

    #[test]
    fn test_ficha_data_keeps_table_order() {
        let registry = fixtures::sample_registry();
        let result = resolve_batch(&registry, "98765432000110\n12345678000190");
        let data = result.ficha_data();
        let keys: Vec<&str> = data.iter().map(|(k, _)| k.as_str()).collect();

        assert_eq!(keys, result.records.index());
        assert_eq!(keys, vec!["98.765.432/0001-10", "12.345.678/0001-90"]);
    }

    #[test]
    fn test_batch_result_json_names() {
        let registry = fixtures::sample_registry();
        let result = resolve_batch(&registry, "12345678000190, 1");
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["resultados"][0]["CNPJ_Fundo"], "12.345.678/0001-90");
        assert_eq!(json["invalidos"][0], "1");
        assert!(json["erros"].as_array().unwrap().is_empty());
    }
}
