// 🧾 Session - state carried between "consultar" and "gerar fichas"
//
// Owned by the caller (TUI app, CLI run). The pipeline never stores it.

use crate::batch::{resolve_batch, BatchResult};
use crate::error::Result;
use crate::ficha::{render, Template};
use crate::registry::Registry;

#[derive(Debug, Default)]
pub struct Session {
    batch: Option<BatchResult>,
    archive: Option<Vec<u8>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run a batch lookup, replacing the previous one.
    /// Any archive generated from the old batch is discarded.
    pub fn consult(&mut self, registry: &Registry, raw_text: &str) -> &BatchResult {
        self.archive = None;
        self.batch.insert(resolve_batch(registry, raw_text))
    }

    /// Render fichas for the held batch.
    /// Returns None when there is nothing to render.
    pub fn generate(&mut self, template: &Template) -> Result<Option<&[u8]>> {
        let records = match &self.batch {
            Some(batch) if !batch.records.is_empty() => batch.ficha_data(),
            _ => return Ok(None),
        };

        let bytes = render(template, &records)?;
        Ok(Some(self.archive.insert(bytes).as_slice()))
    }

    pub fn batch(&self) -> Option<&BatchResult> {
        self.batch.as_ref()
    }

    pub fn archive(&self) -> Option<&[u8]> {
        self.archive.as_deref()
    }

    pub fn clear(&mut self) {
        self.batch = None;
        self.archive = None;
    }
}
