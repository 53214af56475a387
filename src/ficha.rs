// 📝 Ficha Renderer - FICHA_FUNDO.docx template × records → zip of fichas
//
// Substitution is a plain text replace of `{{Field}}` inside each <w:t> run
// of word/document.xml (body paragraphs and table cells). A placeholder that
// Word split across several runs is left as-is.

use crate::cnpj::digits_only;
use crate::error::{FichaError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// Part of the .docx package holding the document body
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Placeholder name → value (None renders as empty)
pub type FichaData = BTreeMap<String, Option<String>>;

/// Record key → placeholder values, in the order the fichas are packed
pub type FichaRecords = Vec<(String, FichaData)>;

static TEXT_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(<w:t(?:\s[^>]*)?>)([^<]*)(</w:t>)").expect("text run pattern is valid"));

// ============================================================================
// TEMPLATE
// ============================================================================

/// The ficha template, read once at startup
#[derive(Debug, Clone)]
pub struct Template {
    bytes: Vec<u8>,
}

impl Template {
    /// Read the template from disk. A missing file is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FichaError::TemplateNotFound(path.to_path_buf()));
        }

        let bytes = std::fs::read(path)?;
        info!(path = %path.display(), bytes = bytes.len(), "loaded ficha template");
        Self::from_bytes(bytes)
    }

    /// Accepts any zip package that carries word/document.xml
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        {
            let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice()))
                .map_err(|e| FichaError::InvalidTemplate(e.to_string()))?;
            archive
                .by_name(DOCUMENT_PART)
                .map_err(|_| FichaError::InvalidTemplate(format!("{} not found", DOCUMENT_PART)))?;
        }

        Ok(Template { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Fresh copy of the template with placeholders replaced
    pub fn fill(&self, key: &str, data: &FichaData) -> Result<Vec<u8>> {
        let zip_err = |source: zip::result::ZipError| FichaError::Render {
            key: key.to_string(),
            source,
        };

        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice())).map_err(zip_err)?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        for i in 0..archive.len() {
            let mut part = archive.by_index(i).map_err(zip_err)?;

            if part.name() == DOCUMENT_PART {
                let mut xml = String::new();
                part.read_to_string(&mut xml)?;
                let filled = fill_placeholders(&xml, data);

                writer.start_file(DOCUMENT_PART, entry_options()).map_err(zip_err)?;
                writer.write_all(filled.as_bytes())?;
            } else {
                writer.raw_copy_file(part).map_err(zip_err)?;
            }
        }

        Ok(writer.finish().map_err(zip_err)?.into_inner())
    }
}

// ============================================================================
// PLACEHOLDERS
// ============================================================================

/// Replace `{{key}}` tokens inside every <w:t> run of a document.xml
pub fn fill_placeholders(document_xml: &str, data: &FichaData) -> String {
    TEXT_RUN
        .replace_all(document_xml, |caps: &Captures| {
            format!("{}{}{}", &caps[1], replace_tokens(&caps[2], data), &caps[3])
        })
        .into_owned()
}

fn replace_tokens(text: &str, data: &FichaData) -> String {
    let mut out = text.to_string();

    for (key, value) in data {
        let token = format!("{{{{{}}}}}", key);
        if out.contains(&token) {
            out = out.replace(&token, &escape_xml(value.as_deref().unwrap_or("")));
        }
    }

    out
}

fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ============================================================================
// RENDER
// ============================================================================

/// Zip entry name for a record key: digits only
pub fn ficha_entry_name(key: &str) -> String {
    format!("FICHA_FUNDO_{}.docx", digits_only(key))
}

/// Fixed timestamp so identical input gives identical bytes
fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
}

/// One filled ficha per record, all packed in a single deflated zip.
/// Entries follow the order of `records`.
pub fn render(template: &Template, records: &[(String, FichaData)]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

    for (key, data) in records {
        let docx = template.fill(key, data)?;
        let name = ficha_entry_name(key);
        debug!(entry = %name, bytes = docx.len(), "ficha filled");

        writer
            .start_file(name, entry_options())
            .map_err(|source| FichaError::Render {
                key: key.clone(),
                source,
            })?;
        writer.write_all(&docx)?;
    }

    let bytes = writer
        .finish()
        .map_err(|source| FichaError::Render {
            key: String::new(),
            source,
        })?
        .into_inner();

    info!(fichas = records.len(), bytes = bytes.len(), "ficha archive rendered");
    Ok(bytes)
}

// ============================================================================
// TESTS
// ============================================================================
