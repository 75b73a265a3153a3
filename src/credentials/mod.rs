//! Credential store backends for Mozilla profiles.
//!
//! The same logical login record exists in two on-disk encodings: the
//! current `logins.json` document and the legacy `signons.sqlite`
//! database. Both yield records through one trait so the decryption
//! pipeline never cares which format the profile uses.

pub mod json;
pub mod sqlite;

pub use json::JsonCredentials;
pub use sqlite::SqliteCredentials;

use std::path::Path;

use crate::error::{Error, Result};

/// One stored login as it appears on disk. Username and password are still
/// encrypted (base64-framed) whenever `enc_type` is non-zero.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub enc_type: i64,
}

/// Uniform reader over one credential store file.
pub trait CredentialSource {
    /// All records, in on-disk storage order. No reordering, deduplication
    /// or validation beyond the mandatory fields.
    fn records(&mut self) -> Result<Vec<CredentialRecord>>;

    /// Release any file or database handles. Called exactly once after the
    /// records have been consumed.
    fn done(&mut self);
}

/// Probe the profile for a credential store. The JSON document supersedes
/// the legacy SQLite database when both exist.
pub fn open_source(profile: &Path) -> Result<Box<dyn CredentialSource>> {
    match JsonCredentials::open(profile) {
        Ok(source) => return Ok(Box::new(source)),
        Err(Error::SourceNotFound(_)) => {}
        Err(e) => return Err(e),
    }
    match SqliteCredentials::open(profile) {
        Ok(source) => Ok(Box::new(source)),
        Err(Error::SourceNotFound(_)) => Err(Error::MissingSecrets(profile.to_path_buf())),
        Err(e) => Err(e),
    }
}
