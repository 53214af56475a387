// 🗂️ Registry Loader - CVM registro_fundo_classe.zip → three tables
//
// Pipeline per CSV member:
//   latin-1 bytes → text → ';' CSV (strict, then tolerant) → dedup by Codigo_CVM
//
// The resulting Registry is built once and only read afterwards.

use crate::error::{FichaError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zip::ZipArchive;

// ============================================================================
// CONSTANTS
// ============================================================================

pub const FUNDO_MEMBER: &str = "registro_fundo.csv";
pub const CLASSE_MEMBER: &str = "registro_classe.csv";
pub const SUBCLASSE_MEMBER: &str = "registro_subclasse.csv";

/// Join key shared by the three tables
pub const CODE_COLUMN: &str = "Codigo_CVM";
pub const CONSTITUTION_DATE_COLUMN: &str = "Data_Constituicao";

const DELIMITER: u8 = b';';

// ============================================================================
// TABLE TYPES
// ============================================================================

/// One CSV row; values are addressed by column name
#[derive(Debug, Clone)]
pub struct RegistryRow {
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl RegistryRow {
    /// Raw value of `column`, None when the table has no such column
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.values.get(idx).map(String::as_str)
    }

    /// Like `get`, but a missing column reads as an empty string
    pub fn get_or_empty(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

/// Ordered rows of one registry CSV
#[derive(Debug, Clone)]
pub struct RegistryTable {
    name: String,
    headers: Arc<[String]>,
    rows: Vec<RegistryRow>,
}

impl RegistryTable {
    fn new(name: &str, headers: Vec<String>, raw_rows: Vec<Vec<String>>) -> Self {
        let headers: Arc<[String]> = headers.into();
        let rows = raw_rows
            .into_iter()
            .map(|values| RegistryRow {
                headers: Arc::clone(&headers),
                values,
            })
            .collect();

        RegistryTable {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[RegistryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| FichaError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    /// Keep the first row for each `Codigo_CVM`, drop later ones
    pub fn dedup_by_code(mut self) -> Result<Self> {
        let idx = self.require_column(CODE_COLUMN)?;
        let before = self.rows.len();

        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.values[idx].clone()));

        let dropped = before - self.rows.len();
        if dropped > 0 {
            debug!(table = %self.name, dropped, "dropped duplicate registration codes");
        }

        Ok(self)
    }

    /// Rewrite a date column as DD/MM/YYYY; unparseable values become empty
    pub fn normalize_date_column(&mut self, column: &str) -> Result<()> {
        let idx = self.require_column(column)?;
        let mut coerced = 0usize;

        for row in &mut self.rows {
            let value = &mut row.values[idx];
            match parse_registry_date(value) {
                Some(date) => *value = date.format("%d/%m/%Y").to_string(),
                None => {
                    if !value.trim().is_empty() {
                        coerced += 1;
                    }
                    value.clear();
                }
            }
        }

        if coerced > 0 {
            warn!(table = %self.name, column, coerced, "unparseable dates cleared");
        }

        Ok(())
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

/// The three CVM tables, immutable after construction
#[derive(Debug, Clone)]
pub struct Registry {
    pub fundo: RegistryTable,
    pub classe: RegistryTable,
    pub subclasse: RegistryTable,
}

impl Registry {
    /// Build the registry from the raw bytes of the CVM zip archive
    pub fn from_archive(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut tables: HashMap<String, RegistryTable> = HashMap::new();

        for i in 0..archive.len() {
            let mut member = archive.by_index(i)?;
            let name = member.name().to_string();
            if !name.to_lowercase().ends_with(".csv") {
                continue;
            }

            let mut raw = Vec::new();
            member
                .read_to_end(&mut raw)
                .map_err(|source| FichaError::RegistryRead {
                    what: name.clone(),
                    source,
                })?;

            let file_name = name.rsplit('/').next().unwrap_or(&name).to_string();
            let table = parse_csv(&file_name, &decode_latin1(&raw))?;
            info!(member = %file_name, rows = table.len(), "loaded registry member");
            tables.insert(file_name, table);
        }

        let mut fundo = take_member(&mut tables, FUNDO_MEMBER)?.dedup_by_code()?;
        let classe = take_member(&mut tables, CLASSE_MEMBER)?.dedup_by_code()?;
        let subclasse = take_member(&mut tables, SUBCLASSE_MEMBER)?.dedup_by_code()?;

        fundo.normalize_date_column(CONSTITUTION_DATE_COLUMN)?;

        Ok(Registry {
            fundo,
            classe,
            subclasse,
        })
    }

    /// Read a previously downloaded archive from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "reading registry archive");
        let bytes = std::fs::read(path).map_err(|source| FichaError::RegistryRead {
            what: path.display().to_string(),
            source,
        })?;
        Self::from_archive(&bytes)
    }

    /// Download the archive (single GET, no retry) and build the registry
    pub fn fetch(url: &str) -> Result<Self> {
        info!(url, "downloading registry archive");

        let bytes = reqwest::blocking::get(url)
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.bytes())
            .map_err(|source| FichaError::RegistryFetch {
                url: url.to_string(),
                source,
            })?;

        info!(bytes = bytes.len(), "registry archive downloaded");
        Self::from_archive(&bytes)
    }
}

fn take_member(tables: &mut HashMap<String, RegistryTable>, name: &str) -> Result<RegistryTable> {
    tables
        .remove(name)
        .ok_or_else(|| FichaError::MissingMember(name.to_string()))
}

// ============================================================================
// DECODING + PARSING
// ============================================================================

/// Latin-1: every byte maps to the code point of the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Parse a ';'-delimited CSV.
///
/// Strict pass first: a row with more fields than the header is an error.
/// On failure, a tolerant pass with '\\' escapes skips the bad rows instead.
/// Short rows are padded with empty values in both passes.
pub fn parse_csv(name: &str, text: &str) -> Result<RegistryTable> {
    match read_rows(name, text, false) {
        Ok(table) => Ok(table),
        Err(err) => {
            warn!(member = name, error = %err, "strict parse failed, retrying in tolerant mode");
            read_rows(name, text, true)
        }
    }
}

fn read_rows(name: &str, text: &str, tolerant: bool) -> Result<RegistryTable> {
    let mut builder = ReaderBuilder::new();
    builder.delimiter(DELIMITER).has_headers(true).flexible(true);
    if tolerant {
        builder.escape(Some(b'\\'));
    }
    let mut reader = builder.from_reader(text.as_bytes());

    let csv_err = |source: csv::Error| FichaError::Csv {
        member: name.to_string(),
        source,
    };

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (line_num, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(err) if tolerant => {
                debug!(member = name, line = line_num + 2, error = %err, "skipping malformed row");
                skipped += 1;
                continue;
            }
            Err(err) => return Err(csv_err(err)),
        };

        if record.len() > headers.len() {
            if tolerant {
                skipped += 1;
                continue;
            }
            return Err(FichaError::Csv {
                member: name.to_string(),
                source: csv::Error::from(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!(
                        "line {}: expected {} fields, saw {}",
                        line_num + 2,
                        headers.len(),
                        record.len()
                    ),
                )),
            });
        }

        let mut values: Vec<String> = record.iter().map(str::to_string).collect();
        values.resize(headers.len(), String::new());
        rows.push(values);
    }

    if skipped > 0 {
        warn!(member = name, skipped, "dropped unparseable rows");
    }

    Ok(RegistryTable::new(name, headers, rows))
}

/// Dates as published by CVM (ISO), with or without time, or already DD/MM/YYYY
fn parse_registry_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

// ============================================================================
// TESTS
// ============================================================================
