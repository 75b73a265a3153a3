//! Feeds credential records through the NSS decrypt call.
//!
//! Failure isolation is per record: one damaged entry yields sentinel
//! values but never aborts the rest of the batch.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::credentials::CredentialSource;
use crate::error::{Error, Result};

/// Substituted for both fields of a record that could not be recovered.
pub const DECRYPTION_FAILED: &str = "*** decryption failed ***";

/// Final output unit: plaintext credentials for one site, or the failure
/// sentinel where recovery failed.
#[derive(Debug, Clone, Serialize)]
pub struct DecryptedEntry {
    pub url: String,
    pub username: String,
    pub password: String,
}

/// Anything that can turn one base64-framed ciphertext into text. The NSS
/// context is the real implementation; tests substitute fakes.
pub trait Decryptor {
    fn decrypt_one(&self, data64: &str) -> Result<String>;
}

impl Decryptor for crate::nss::NssContext {
    fn decrypt_one(&self, data64: &str) -> Result<String> {
        crate::nss::NssContext::decrypt_one(self, data64)
    }
}

/// Decrypt every record from `source`. The source is closed exactly once,
/// whether the run completes or aborts.
pub fn run(
    source: &mut dyn CredentialSource,
    decryptor: &dyn Decryptor,
) -> Result<Vec<DecryptedEntry>> {
    info!("Decrypting credentials");

    let records = match source.records() {
        Ok(records) => records,
        Err(e) => {
            source.done();
            return Err(e);
        }
    };

    let mut entries = Vec::new();
    for record in records {
        // A zero encType marks fields that are already plaintext.
        let (username, password) = if record.enc_type != 0 {
            debug!("Decrypting username data '{}'", record.username);
            let attempt = decryptor.decrypt_one(&record.username).and_then(|username| {
                debug!("Decrypting password data '{}'", record.password);
                decryptor
                    .decrypt_one(&record.password)
                    .map(|password| (username, password))
            });
            match attempt {
                Ok(pair) => pair,
                Err(Error::BadRecord(reason)) => {
                    warn!(
                        "Failed to decode username or password for entry from URL {}: {}",
                        record.hostname, reason
                    );
                    (DECRYPTION_FAILED.to_string(), DECRYPTION_FAILED.to_string())
                }
                Err(e) => {
                    source.done();
                    return Err(e);
                }
            }
        } else {
            (record.username, record.password)
        };

        debug!(
            "Decoded username '{}' and password '{}' for website '{}'",
            username, password, record.hostname
        );
        entries.push(DecryptedEntry {
            url: record.hostname,
            username,
            password,
        });
    }

    if entries.is_empty() {
        warn!("No passwords found in selected profile");
    }

    source.done();
    Ok(entries)
}
