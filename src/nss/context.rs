//! One initialized NSS session bound to one profile directory.
//!
//! The session walks initialize -> authenticate -> decrypt* -> shutdown.
//! NSS state is process-global, so exactly one context may be live at a
//! time; profiles are processed sequentially, one full cycle each.

use std::ffi::CString;
use std::os::raw::c_uint;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use libloading::Library;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::nss::ffi::{self, FunctionTable, Pk11SlotInfo, SecItem};
use crate::nss::locate;
use crate::prompt;

/// Whether a failed decrypt call aborts the whole profile or is reported
/// per record by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionMode {
    Strict,
    Lenient,
}

pub struct NssContext {
    functions: FunctionTable,
    // Keeps every pointer in `functions` valid for the context's lifetime.
    _library: Library,
    library_path: PathBuf,
    profile: PathBuf,
    mode: DecryptionMode,
    shut_down: bool,
}

impl NssContext {
    /// Locate and bind NSS, then initialize it against the given profile
    /// directory. A non-zero status from NSS_Init is fatal: by this point
    /// the directory exists, so the profile itself is unusable.
    pub fn initialize(profile: &Path, mode: DecryptionMode) -> Result<Self> {
        let (library, library_path) =
            locate::locate(&locate::candidate_directories(), locate::library_name())?;
        let functions = FunctionTable::bind(&library)?;

        // The sql: prefix keeps both the Berkeley DB (cert8) and SQLite
        // (cert9) profile formats working; NSS auto-detects from there.
        let tagged = format!("sql:{}", profile.display());
        debug!("Initializing NSS with profile '{}'", tagged);
        let c_profile =
            CString::new(tagged).map_err(|_| Error::Initialization(profile.to_path_buf()))?;
        let status = unsafe { (functions.nss_init)(c_profile.as_ptr()) };
        debug!("NSS_Init returned {}", status);
        if status != 0 {
            info!(
                "Couldn't initialize NSS, maybe {:?} is not a valid profile?",
                profile
            );
            return Err(Error::Initialization(profile.to_path_buf()));
        }

        Ok(NssContext {
            functions,
            _library: library,
            library_path,
            profile: profile.to_path_buf(),
            mode,
            shut_down: false,
        })
    }

    pub fn library_path(&self) -> &Path {
        &self.library_path
    }

    /// Unlock the credential store, prompting for the primary password only
    /// when the store reports that one is set.
    pub fn authenticate(&self, interactive: bool) -> Result<()> {
        debug!("Retrieving internal key slot");
        let slot = unsafe { (self.functions.get_internal_key_slot)() };
        if slot.is_null() {
            self.report_library_error("PK11_GetInternalKeySlot");
            return Err(Error::KeySlot);
        }

        // The slot must be freed on every path from here on.
        let result = self.check_login(slot, interactive);
        unsafe { (self.functions.free_slot)(slot) };
        result
    }

    fn check_login(&self, slot: *mut Pk11SlotInfo, interactive: bool) -> Result<()> {
        if unsafe { (self.functions.need_login)(slot) } == 0 {
            info!("No primary password set - no authentication needed");
            return Ok(());
        }

        let password = prompt::ask_primary_password(&self.profile, interactive)?;
        let c_password = CString::new(password).map_err(|_| Error::WrongPassword)?;

        let status = unsafe { (self.functions.check_user_password)(slot, c_password.as_ptr()) };
        debug!("PK11_CheckUserPassword returned {}", status);
        if status != 0 {
            self.report_library_error("PK11_CheckUserPassword");
            return Err(Error::WrongPassword);
        }
        Ok(())
    }

    /// Decrypt one base64-framed ciphertext into text.
    ///
    /// In lenient mode a failed decrypt comes back as a recoverable
    /// [`Error::BadRecord`] for the pipeline to substitute a sentinel; in
    /// strict mode it is fatal for the profile. Base64 framing errors are
    /// recoverable in both modes.
    pub fn decrypt_one(&self, data64: &str) -> Result<String> {
        let mut data = STANDARD
            .decode(data64)
            .map_err(|e| Error::BadRecord(format!("invalid base64 ciphertext: {e}")))?;

        let mut input = SecItem {
            kind: 0,
            data: data.as_mut_ptr(),
            len: data.len() as c_uint,
        };
        let mut output = SecItem::empty();

        let status = unsafe {
            (self.functions.sdr_decrypt)(&mut input, &mut output, std::ptr::null_mut())
        };
        debug!("PK11SDR_Decrypt returned {}", status);

        // -1 means the key check failed; other non-zero codes are unknown.
        let result = if status != 0 {
            match self.mode {
                DecryptionMode::Strict => {
                    self.report_library_error("PK11SDR_Decrypt");
                    Err(Error::Decryption)
                }
                DecryptionMode::Lenient => Err(Error::BadRecord(
                    "username/password decryption failed; credentials damaged or cert/key file mismatch"
                        .into(),
                )),
            }
        } else {
            String::from_utf8(unsafe { output.bytes() })
                .map_err(|e| Error::BadRecord(format!("decrypted data is not valid UTF-8: {e}")))
        };

        // The output buffer belongs to NSS; free it on success and failure
        // alike once the bytes are copied out.
        unsafe { (self.functions.zfree_item)(&mut output, 0) };

        result
    }

    /// Release the NSS session. Consumes the context: decryption after
    /// shutdown is unrepresentable.
    pub fn shutdown(mut self) -> Result<()> {
        self.shut_down = true;
        let status = unsafe { (self.functions.nss_shutdown)() };
        debug!("NSS_Shutdown returned {}", status);
        if status != 0 {
            self.report_library_error("NSS_Shutdown");
            return Err(Error::Shutdown);
        }
        Ok(())
    }

    /// Read the library's last error and log its code, symbolic name, and
    /// human-readable message before the caller returns a typed error.
    fn report_library_error(&self, operation: &str) {
        let code = unsafe { (self.functions.get_error)() };
        let name = unsafe { ffi::text_from((self.functions.error_to_name)(code)) };
        // 0 selects the default language.
        let text = unsafe { ffi::text_from((self.functions.error_to_string)(code, 0)) };
        error!(
            "{} failed: {} ({}): {}",
            operation,
            code,
            name.as_deref().unwrap_or("NULL"),
            text.as_deref().unwrap_or("")
        );
    }
}

impl Drop for NssContext {
    fn drop(&mut self) {
        if !self.shut_down {
            self.shut_down = true;
            let status = unsafe { (self.functions.nss_shutdown)() };
            if status != 0 {
                warn!("NSS_Shutdown returned {} while dropping the session", status);
            }
        }
    }
}
