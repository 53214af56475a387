// 🔢 Identifier Normalizer - CNPJ / CPF digits and punctuation
//
// CNPJ = 14 digits (entity)     → DD.DDD.DDD/DDDD-DD
// CPF  = 11 digits (individual) → DDD.DDD.DDD-DD

use serde::{Deserialize, Serialize};

// ============================================================================
// PERSON TYPE
// ============================================================================

/// Which tax-ID layout applies to a value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PersonType {
    /// Pessoa física (CPF)
    Individual,

    /// Pessoa jurídica (CNPJ) - also used when the registry says nothing
    #[default]
    Entity,
}

impl PersonType {
    /// Parse the registry's `Tipo_Pessoa_Gestor` code.
    /// Only `PF` selects the individual layout; anything else is an entity.
    pub fn from_code(code: &str) -> Self {
        if code.trim() == "PF" {
            PersonType::Individual
        } else {
            PersonType::Entity
        }
    }
}

// ============================================================================
// FORMAT RESULT
// ============================================================================

/// Outcome of `format_tax_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxIdFormat {
    /// Punctuated canonical form
    Formatted(String),

    /// Wrong digit count for a CPF - original input returned untouched
    Unchanged(String),
}

impl TaxIdFormat {
    pub fn is_formatted(&self) -> bool {
        matches!(self, TaxIdFormat::Formatted(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaxIdFormat::Formatted(s) | TaxIdFormat::Unchanged(s) => s,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            TaxIdFormat::Formatted(s) | TaxIdFormat::Unchanged(s) => s,
        }
    }
}

// ============================================================================
// FUNCTIONS
// ============================================================================

/// Keep only ASCII decimal digits. Empty input gives an empty string.
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Format a raw tax ID according to `person_type`.
///
/// Individual: keeps the last 11 digits, declines (returns the input) when
/// fewer than 11 remain.
/// Entity: truncates to the first 14 digits or left-pads with zeros, so it
/// always succeeds.
pub fn format_tax_id(value: &str, person_type: PersonType) -> TaxIdFormat {
    let num = digits_only(value);

    match person_type {
        PersonType::Individual => {
            let num = if num.len() > 11 {
                &num[num.len() - 11..]
            } else {
                num.as_str()
            };

            if num.len() == 11 {
                TaxIdFormat::Formatted(format!(
                    "{}.{}.{}-{}",
                    &num[..3],
                    &num[3..6],
                    &num[6..9],
                    &num[9..]
                ))
            } else {
                TaxIdFormat::Unchanged(value.to_string())
            }
        }
        PersonType::Entity => {
            let mut num = num;
            num.truncate(14);
            let num = format!("{:0>14}", num);

            TaxIdFormat::Formatted(format!(
                "{}.{}.{}/{}-{}",
                &num[..2],
                &num[2..5],
                &num[5..8],
                &num[8..12],
                &num[12..]
            ))
        }
    }
}

/// Entity-path shortcut: always a punctuated 14-digit CNPJ
pub fn format_cnpj(value: &str) -> String {
    format_tax_id(value, PersonType::Entity).into_string()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_only_strips_punctuation() {
        assert_eq!(digits_only("12.345.678/0001-90"), "12345678000190");
        assert_eq!(digits_only(" a1b2 "), "12");
    }

    #[test]
    fn test_digits_only_empty() {
        assert_eq!(digits_only(""), "");
        assert_eq!(digits_only("n/a"), "");
    }

    #[test]
    fn test_format_cnpj_round_trip() {
        for d in ["12345678000190", "00000000000000", "99999999999999"] {
            let formatted = format_cnpj(d);
            assert_eq!(digits_only(&formatted), d);
        }
        assert_eq!(format_cnpj("12345678000190"), "12.345.678/0001-90");
    }

    #[test]
    fn test_format_cpf_round_trip() {
        let result = format_tax_id("12345678901", PersonType::Individual);
        assert!(result.is_formatted());
        assert_eq!(result.as_str(), "123.456.789-01");
        assert_eq!(digits_only(result.as_str()), "12345678901");
    }

    #[test]
    fn test_format_cnpj_pads_short_input() {
        assert_eq!(format_cnpj("123"), "00.000.000/0001-23");
        assert_eq!(format_cnpj(""), "00.000.000/0000-00");
    }

    #[test]
    fn test_format_cnpj_truncates_long_input() {
        let formatted = format_cnpj("1234567800019099");
        assert_eq!(formatted, "12.345.678/0001-90");
        assert_eq!(digits_only(&formatted).len(), 14);
    }

    #[test]
    fn test_format_cpf_keeps_last_eleven() {
        let result = format_tax_id("00012345678901", PersonType::Individual);
        assert_eq!(result, TaxIdFormat::Formatted("123.456.789-01".to_string()));
    }

    #[test]
    fn test_format_cpf_declines_short_input() {
        let result = format_tax_id("123.456", PersonType::Individual);
        assert_eq!(result, TaxIdFormat::Unchanged("123.456".to_string()));
        assert!(!result.is_formatted());
    }

    #[test]
    fn test_person_type_from_code() {
        assert_eq!(PersonType::from_code("PF"), PersonType::Individual);
        assert_eq!(PersonType::from_code(" PF "), PersonType::Individual);
        assert_eq!(PersonType::from_code("PJ"), PersonType::Entity);
        assert_eq!(PersonType::from_code(""), PersonType::Entity);
    }
}
