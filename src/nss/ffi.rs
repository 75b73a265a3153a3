//! Typed bindings to the NSS entry points used for credential decryption.
//!
//! Binding is purely structural: symbols are resolved and given fixed
//! signatures, no library calls happen here. Struct layouts must
//! byte-match the NSS ABI.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_uchar, c_uint, c_void};

use libloading::Library;

use crate::error::{Error, Result};

/// The typed byte buffer NSS passes across the decrypt call (SECItem).
/// Field order and widths are an external ABI contract.
#[repr(C)]
pub struct SecItem {
    pub kind: c_uint,
    pub data: *mut c_uchar,
    pub len: c_uint,
}

impl SecItem {
    /// A zeroed item for NSS to fill with an output buffer it owns.
    pub fn empty() -> Self {
        SecItem {
            kind: 0,
            data: std::ptr::null_mut(),
            len: 0,
        }
    }

    /// Copy the buffer out.
    ///
    /// # Safety
    /// `data`/`len` must describe a live buffer, as filled in by NSS.
    pub unsafe fn bytes(&self) -> Vec<u8> {
        if self.data.is_null() {
            return Vec::new();
        }
        std::slice::from_raw_parts(self.data, self.len as usize).to_vec()
    }
}

/// Opaque handle to the library's internal key slot for a profile.
#[repr(C)]
pub struct Pk11SlotInfo {
    _opaque: [u8; 0],
}

type NssInitFn = unsafe extern "C" fn(*const c_char) -> c_int;
type NssShutdownFn = unsafe extern "C" fn() -> c_int;
type GetInternalKeySlotFn = unsafe extern "C" fn() -> *mut Pk11SlotInfo;
type FreeSlotFn = unsafe extern "C" fn(*mut Pk11SlotInfo);
type NeedLoginFn = unsafe extern "C" fn(*mut Pk11SlotInfo) -> c_int;
type CheckUserPasswordFn = unsafe extern "C" fn(*mut Pk11SlotInfo, *const c_char) -> c_int;
type SdrDecryptFn = unsafe extern "C" fn(*mut SecItem, *mut SecItem, *mut c_void) -> c_int;
type ZfreeItemFn = unsafe extern "C" fn(*mut SecItem, c_int);
type GetErrorFn = unsafe extern "C" fn() -> c_int;
type ErrorToNameFn = unsafe extern "C" fn(c_int) -> *const c_char;
type ErrorToStringFn = unsafe extern "C" fn(c_int, u32) -> *const c_char;

/// Every NSS entry point this tool uses, bound once per loaded library.
///
/// Plain function pointers; the owning context keeps the `Library` alive
/// for as long as the table exists.
pub struct FunctionTable {
    pub nss_init: NssInitFn,
    pub nss_shutdown: NssShutdownFn,
    pub get_internal_key_slot: GetInternalKeySlotFn,
    pub free_slot: FreeSlotFn,
    pub need_login: NeedLoginFn,
    pub check_user_password: CheckUserPasswordFn,
    pub sdr_decrypt: SdrDecryptFn,
    pub zfree_item: ZfreeItemFn,
    pub get_error: GetErrorFn,
    pub error_to_name: ErrorToNameFn,
    pub error_to_string: ErrorToStringFn,
}

impl FunctionTable {
    /// Resolve all required symbols. A missing symbol means the library at
    /// hand is an incompatible NSS build and is a fatal bind error.
    pub fn bind(library: &Library) -> Result<Self> {
        unsafe {
            Ok(FunctionTable {
                nss_init: resolve(library, "NSS_Init")?,
                nss_shutdown: resolve(library, "NSS_Shutdown")?,
                get_internal_key_slot: resolve(library, "PK11_GetInternalKeySlot")?,
                free_slot: resolve(library, "PK11_FreeSlot")?,
                need_login: resolve(library, "PK11_NeedLogin")?,
                check_user_password: resolve(library, "PK11_CheckUserPassword")?,
                sdr_decrypt: resolve(library, "PK11SDR_Decrypt")?,
                zfree_item: resolve(library, "SECITEM_ZfreeItem")?,
                get_error: resolve(library, "PORT_GetError")?,
                error_to_name: resolve(library, "PR_ErrorToName")?,
                error_to_string: resolve(library, "PR_ErrorToString")?,
            })
        }
    }
}

unsafe fn resolve<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    let symbol: libloading::Symbol<T> = library
        .get(name.as_bytes())
        .map_err(|source| Error::Bind {
            symbol: name,
            source,
        })?;
    Ok(*symbol)
}

/// Decode a NUL-terminated C string returned by NSS as UTF-8 text. A null
/// pointer is valid here (unknown error code) and maps to `None`.
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated string.
pub unsafe fn text_from(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;
    use std::mem;

    #[test]
    fn secitem_layout_matches_nss_abi() {
        // type, data, len: each slot pointer-aligned on every supported
        // target, matching the SECItem declaration in the NSS headers.
        let word = mem::size_of::<usize>();
        assert_eq!(mem::offset_of!(SecItem, kind), 0);
        assert_eq!(mem::offset_of!(SecItem, data), word);
        assert_eq!(mem::offset_of!(SecItem, len), 2 * word);
        assert_eq!(mem::size_of::<SecItem>(), 3 * word);
    }

    #[test]
    fn text_from_tolerates_null() {
        assert_eq!(unsafe { text_from(std::ptr::null()) }, None);

        let s = CString::new("SEC_ERROR_BAD_PASSWORD").unwrap();
        assert_eq!(
            unsafe { text_from(s.as_ptr()) },
            Some("SEC_ERROR_BAD_PASSWORD".to_string())
        );
    }

    #[test]
    fn empty_item_is_zeroed() {
        let item = SecItem::empty();
        assert_eq!(item.kind, 0);
        assert!(item.data.is_null());
        assert_eq!(item.len, 0);
        assert!(unsafe { item.bytes() }.is_empty());
    }
}
