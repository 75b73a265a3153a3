//! Error taxonomy for profile processing.
//!
//! Every fatal variant is scoped to a single profile cycle; the driver
//! reports the profile as invalid and moves on to the next one.

use std::path::PathBuf;
use thiserror::Error;

/// One failed load attempt recorded during NSS discovery.
#[derive(Debug, Clone)]
pub struct LoadAttempt {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum Error {
    /// The NSS library could not be found or loaded from any candidate
    /// location. Carries every (path, loader message) pair attempted.
    #[error("could not find or load '{library}' in any known location")]
    Discovery {
        library: String,
        attempts: Vec<LoadAttempt>,
    },

    /// The library loaded but is missing an expected entry point, which
    /// means an incompatible NSS build.
    #[error("NSS library is missing entry point '{symbol}'")]
    Bind {
        symbol: &'static str,
        #[source]
        source: libloading::Error,
    },

    #[error("couldn't initialize NSS, maybe '{}' is not a valid profile", .0.display())]
    Initialization(PathBuf),

    #[error("failed to retrieve internal key slot")]
    KeySlot,

    #[error("primary password is not correct")]
    WrongPassword,

    /// Fatal decryption failure (strict mode only).
    #[error("username/password decryption failed; credentials damaged or cert/key file mismatch")]
    Decryption,

    /// Recoverable per-record failure; the pipeline substitutes a sentinel
    /// and continues with the next record.
    #[error("could not decode credential field: {0}")]
    BadRecord(String),

    /// A single credential store file is absent.
    #[error("{} not found", .0.display())]
    SourceNotFound(PathBuf),

    /// Neither known credential store format exists in the profile.
    #[error("no password database found in profile {}", .0.display())]
    MissingSecrets(PathBuf),

    /// A credential store file exists but its container structure is not
    /// recognized.
    #[error("unrecognized format in {}", .0.display())]
    CorruptSecrets(PathBuf),

    #[error("couldn't shut down current NSS profile")]
    Shutdown,

    #[error("profiles.ini not found in {}", .0.display())]
    ProfilesIniMissing(PathBuf),

    #[error("malformed profiles.ini: {0}")]
    BadProfilesIni(String),

    #[error("profile location '{}' is not a directory", .0.display())]
    BadProfile(PathBuf),

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
