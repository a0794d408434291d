//! Tier documents handed over by the content generator as JSON files.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use quire_core::document::{PublishDocument, Tier};

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid document file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `{title, subtitle?, markdown, send_email?, section_id?}`
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSource {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub markdown: String,
    #[serde(default)]
    pub send_email: Option<bool>,
    #[serde(default)]
    pub section_id: Option<i64>,
}

impl DocumentSource {
    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| SourceError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse the markdown and address the document to `tier`'s audience.
    pub fn into_document(self, tier: Tier) -> PublishDocument {
        let mut doc = PublishDocument::from_markdown(self.title, &self.markdown, tier.audience());
        if let Some(subtitle) = self.subtitle.filter(|s| !s.trim().is_empty()) {
            doc = doc.with_subtitle(subtitle);
        }
        if let Some(send_email) = self.send_email {
            doc = doc.with_send_email(send_email);
        }
        if let Some(section_id) = self.section_id {
            doc = doc.with_section_id(section_id);
        }
        doc
    }
}
