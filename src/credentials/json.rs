//! `logins.json` credential store (current Firefox format).

use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::credentials::{CredentialRecord, CredentialSource};
use crate::error::{Error, Result};

pub struct JsonCredentials {
    db: PathBuf,
}

impl JsonCredentials {
    pub fn open(profile: &Path) -> Result<Self> {
        let db = profile.join("logins.json");
        debug!("Database location: {:?}", db);
        if !db.is_file() {
            return Err(Error::SourceNotFound(db));
        }
        info!("Using {:?} for credentials", db);
        Ok(JsonCredentials { db })
    }
}

impl CredentialSource for JsonCredentials {
    fn records(&mut self) -> Result<Vec<CredentialRecord>> {
        debug!("Reading password database in JSON format");
        let content = std::fs::read_to_string(&self.db)?;
        let data: serde_json::Value = serde_json::from_str(&content)
            .map_err(|_| Error::CorruptSecrets(self.db.clone()))?;

        let logins = match data.get("logins").and_then(|v| v.as_array()) {
            Some(logins) => logins,
            None => {
                error!("Unrecognized format in {:?}", self.db);
                return Err(Error::CorruptSecrets(self.db.clone()));
            }
        };

        let mut records = Vec::new();
        for entry in logins {
            let hostname = entry.get("hostname").and_then(|v| v.as_str());
            let username = entry.get("encryptedUsername").and_then(|v| v.as_str());
            let password = entry.get("encryptedPassword").and_then(|v| v.as_str());

            match (hostname, username, password) {
                (Some(hostname), Some(username), Some(password)) => {
                    records.push(CredentialRecord {
                        hostname: hostname.to_string(),
                        username: username.to_string(),
                        password: password.to_string(),
                        enc_type: entry.get("encType").and_then(|v| v.as_i64()).unwrap_or(1),
                    });
                }
                _ => {
                    // In-place deletions leave partial tombstone entries
                    // behind; they carry no recoverable credential.
                    info!("Skipped record {} due to missing fields", entry);
                }
            }
        }
        Ok(records)
    }

    fn done(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_store(dir: &Path, content: &str) {
        fs::write(dir.join("logins.json"), content).unwrap();
    }

    #[test]
    fn open_fails_when_file_is_absent() {
        let tmp = tempfile::tempdir().unwrap();
        match JsonCredentials::open(tmp.path()) {
            Err(Error::SourceNotFound(path)) => {
                assert_eq!(path, tmp.path().join("logins.json"))
            }
            other => panic!("expected SourceNotFound, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn records_come_back_in_document_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_store(
            tmp.path(),
            r#"{"logins": [
                {"hostname": "https://a.example", "encryptedUsername": "AAA", "encryptedPassword": "BBB", "encType": 1},
                {"hostname": "https://b.example", "encryptedUsername": "u", "encryptedPassword": "p", "encType": 0}
            ]}"#,
        );

        let mut source = JsonCredentials::open(tmp.path()).unwrap();
        let records = source.records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].hostname, "https://a.example");
        assert_eq!(records[0].enc_type, 1);
        assert_eq!(records[1].hostname, "https://b.example");
        assert_eq!(records[1].enc_type, 0);
    }

    #[test]
    fn entries_missing_mandatory_fields_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write_store(
            tmp.path(),
            r#"{"logins": [
                {"hostname": "https://kept.example", "encryptedUsername": "AAA", "encryptedPassword": "BBB", "encType": 1},
                {"hostname": "https://tombstone.example", "encryptedUsername": "AAA", "encType": 1},
                {"id": 3}
            ]}"#,
        );

        let mut source = JsonCredentials::open(tmp.path()).unwrap();
        let records = source.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hostname, "https://kept.example");
    }

    #[test]
    fn missing_logins_key_is_corrupt_not_empty() {
        let tmp = tempfile::tempdir().unwrap();
        write_store(tmp.path(), r#"{"nextId": 7}"#);

        let mut source = JsonCredentials::open(tmp.path()).unwrap();
        match source.records() {
            Err(Error::CorruptSecrets(path)) => {
                assert_eq!(path, tmp.path().join("logins.json"))
            }
            other => panic!("expected CorruptSecrets, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unparseable_document_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        write_store(tmp.path(), "not json at all");

        let mut source = JsonCredentials::open(tmp.path()).unwrap();
        assert!(matches!(
            source.records(),
            Err(Error::CorruptSecrets(_))
        ));
    }
}
