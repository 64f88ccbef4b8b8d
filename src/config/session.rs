use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{InvoiceError, Result};
use crate::invoice::{ChangeSink, DocumentOptions, InvoiceChanges, InvoiceDocument};

/// Working documents, one JSON file per template under `<config>/sessions`
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(config_dir: &Path) -> Self {
        Self {
            dir: config_dir.join("sessions"),
        }
    }

    fn path(&self, template_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(template_id)))
    }

    /// Load the session for `template_id`, if one was ever saved
    pub fn try_load(
        &self,
        template_id: &str,
        options: &DocumentOptions,
    ) -> Result<Option<InvoiceDocument>> {
        let path = self.path(template_id);
        if !path.exists() {
            return Ok(None);
        }
        read_document(&path, options).map(Some)
    }

    pub fn load(&self, template_id: &str, options: &DocumentOptions) -> Result<InvoiceDocument> {
        self.try_load(template_id, options)?
            .ok_or_else(|| InvoiceError::SessionNotFound(template_id.to_string()))
    }

    pub fn save(&self, template_id: &str, doc: &InvoiceDocument) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(template_id);
        let content = serde_json::to_string_pretty(doc).map_err(|e| {
            InvoiceError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })?;
        fs::write(&path, content)?;
        debug!(path = %path.display(), "session saved");
        Ok(())
    }

    /// All saved sessions, ordered by template id
    pub fn list(&self, options: &DocumentOptions) -> Result<Vec<InvoiceDocument>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".json") && !n.ends_with(".changes.json"))
            })
            .collect();
        paths.sort();

        paths
            .iter()
            .map(|path| read_document(path, options))
            .collect()
    }

    /// Sink that records saved edits next to the session file
    pub fn change_sink(&self, template_id: &str) -> ChangesFile {
        ChangesFile {
            path: self
                .dir
                .join(format!("{}.changes.json", file_stem(template_id))),
        }
    }
}

fn read_document(path: &Path, options: &DocumentOptions) -> Result<InvoiceDocument> {
    let content = fs::read_to_string(path)?;
    let doc: InvoiceDocument =
        serde_json::from_str(&content).map_err(|e| InvoiceError::SessionParse {
            path: path.to_path_buf(),
            source: e,
        })?;
    Ok(doc.with_options(options.clone()))
}

/// Keep template ids usable as file names
fn file_stem(template_id: &str) -> String {
    template_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Writes the latest saved changes of one invoice as JSON
pub struct ChangesFile {
    path: PathBuf,
}

impl ChangesFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ChangeSink for ChangesFile {
    fn save(&mut self, changes: &InvoiceChanges) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(changes).map_err(|e| {
            InvoiceError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                e.to_string(),
            ))
        })?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}
