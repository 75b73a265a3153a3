//! `signons.sqlite` credential store (legacy Firefox format).

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::credentials::{CredentialRecord, CredentialSource};
use crate::error::{Error, Result};

pub struct SqliteCredentials {
    db: PathBuf,
    conn: Option<Connection>,
}

impl SqliteCredentials {
    pub fn open(profile: &Path) -> Result<Self> {
        let db = profile.join("signons.sqlite");
        debug!("Database location: {:?}", db);
        if !db.is_file() {
            return Err(Error::SourceNotFound(db));
        }
        info!("Using {:?} for credentials", db);

        let conn = Connection::open(&db)?;
        Ok(SqliteCredentials {
            db,
            conn: Some(conn),
        })
    }
}

impl CredentialSource for SqliteCredentials {
    fn records(&mut self) -> Result<Vec<CredentialRecord>> {
        debug!("Reading password database in SQLite format");
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| Error::SourceNotFound(self.db.clone()))?;

        let mut stmt = conn.prepare(
            "SELECT hostname, encryptedUsername, encryptedPassword, encType FROM moz_logins",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CredentialRecord {
                hostname: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                enc_type: row.get(3)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    fn done(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err((_, e)) = conn.close() {
                warn!("Failed to close credential database {:?}: {}", self.db, e);
            }
        }
    }
}
