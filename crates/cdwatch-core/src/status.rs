//! Status-document parsing for URL-watched targets.
//!
//! A status document is exactly two newline-separated lines: the artifact
//! archive URL, then the deploy-script URL. It is republished in full
//! whenever either changes.

use thiserror::Error;

/// Parsed status document for one URL target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusDocument {
    /// Download URL of the artifact archive.
    pub artifact_url: String,
    /// Download URL of the deploy script.
    pub deployer_url: String,
}

impl StatusDocument {
    /// Parse the raw document body.
    pub fn parse(body: &str) -> Result<Self, StatusDocumentError> {
        let mut lines = body.lines().map(str::trim);
        let artifact_url = lines.next().ok_or(StatusDocumentError::MissingLines)?;
        let deployer_url = lines.next().ok_or(StatusDocumentError::MissingLines)?;
        if artifact_url.is_empty() {
            return Err(StatusDocumentError::EmptyLine(1));
        }
        if deployer_url.is_empty() {
            return Err(StatusDocumentError::EmptyLine(2));
        }
        Ok(Self {
            artifact_url: artifact_url.to_string(),
            deployer_url: deployer_url.to_string(),
        })
    }
}

/// Errors from a malformed status document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatusDocumentError {
    /// Fewer than two lines were present.
    #[error("status document must contain two lines (artifact URL, deploy-script URL)")]
    MissingLines,

    /// A required line was blank.
    #[error("status document line {0} is empty")]
    EmptyLine(usize),
}
