//! Handle errors and the C-side error slot
//!
//! Rust callers get [`AbiError`] through `Result`. C callers get a `bool` or
//! sentinel return and read the message from a thread-local slot:
//!
//! ```ignore
//! if !tandem_handle_copy(dst, src) {
//!     let msg = tandem_take_error();
//!     // report msg...
//! }
//! ```

use std::cell::RefCell;
use std::ffi::{CString, c_char};
use std::ptr;

use thiserror::Error;

use crate::handle::{discipline_name, kind_name};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// The handle's refcount discipline is not the destination's.
    ///
    /// The only error the raw reconstructor raises; the destination is left
    /// untouched.
    #[error(
        "refcount discipline mismatch: expected {}, handle holds {}",
        discipline_name(*expected),
        discipline_name(*found)
    )]
    DisciplineMismatch { expected: u32, found: u32 },

    /// Checked reconstruct into a different structural kind
    #[error(
        "structural kind mismatch: expected {}, handle holds {}",
        kind_name(*expected),
        kind_name(*found)
    )]
    KindMismatch { expected: u32, found: u32 },

    #[error("handle is empty")]
    EmptyHandle,

    #[error("handle is already occupied")]
    HandleOccupied,

    /// Header tags outside the known ranges
    #[error("invalid handle header: kind {kind}, discipline {discipline}")]
    InvalidHeader { kind: u32, discipline: u32 },

    #[error("null handle pointer passed to {0}")]
    NullHandle(&'static str),
}

thread_local! {
    /// Last error raised by a C entry point on this thread
    static LAST_ERROR: RefCell<Option<AbiError>> = const { RefCell::new(None) };

    /// Message handed out by `tandem_get_error` / `tandem_take_error`
    static ERROR_CSTRING: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Record an error for the C side
///
/// Drops the cached message so no stale pointer outlives it.
pub fn set_abi_error(err: AbiError) {
    ERROR_CSTRING.with(|cs| *cs.borrow_mut() = None);
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(err));
}

pub fn take_abi_error() -> Option<AbiError> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

pub fn has_abi_error() -> bool {
    LAST_ERROR.with(|e| e.borrow().is_some())
}

pub fn clear_abi_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
    ERROR_CSTRING.with(|cs| *cs.borrow_mut() = None);
}

/// Cache `err`'s message as a C string and return a pointer into the cache
fn cache_message(err: &AbiError) -> *const c_char {
    // messages are built from tags and literals, so interior NULs never occur
    let cstring = CString::new(err.to_string()).unwrap_or_default();
    ERROR_CSTRING.with(|cs| {
        let ptr = cstring.as_ptr();
        *cs.borrow_mut() = Some(cstring);
        ptr
    })
}

// FFI-safe error access

#[unsafe(no_mangle)]
pub extern "C" fn tandem_has_error() -> bool {
    has_abi_error()
}

/// Last error message as a C string, or null if none is pending.
///
/// # Pointer lifetime
/// Valid until the next `tandem_get_error`, `tandem_take_error`,
/// `tandem_clear_error` or failing call on this thread. Copy it to keep it.
#[unsafe(no_mangle)]
pub extern "C" fn tandem_get_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(err) => cache_message(err),
        None => ptr::null(),
    })
}

/// Take (and clear) the last error as a C string, or null if none is pending.
///
/// Same pointer lifetime as [`tandem_get_error`].
#[unsafe(no_mangle)]
pub extern "C" fn tandem_take_error() -> *const c_char {
    match take_abi_error() {
        Some(err) => cache_message(&err),
        None => ptr::null(),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn tandem_clear_error() {
    clear_abi_error();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    #[test]
    fn test_set_and_take_error() {
        clear_abi_error();
        assert!(!has_abi_error());

        set_abi_error(AbiError::EmptyHandle);
        assert!(has_abi_error());
        assert_eq!(take_abi_error(), Some(AbiError::EmptyHandle));
        assert!(!has_abi_error());
    }

    #[test]
    fn test_messages_name_both_tags() {
        let err = AbiError::DisciplineMismatch {
            expected: 0,
            found: 1,
        };
        assert_eq!(
            err.to_string(),
            "refcount discipline mismatch: expected safe, handle holds unsafe"
        );

        let err = AbiError::KindMismatch {
            expected: 2,
            found: 9,
        };
        assert_eq!(
            err.to_string(),
            "structural kind mismatch: expected buffer, handle holds <invalid 9>"
        );
    }

    #[test]
    fn test_ffi_get_then_take() {
        clear_abi_error();
        assert!(tandem_get_error().is_null());

        set_abi_error(AbiError::HandleOccupied);
        assert!(tandem_has_error());
        let msg = unsafe { CStr::from_ptr(tandem_get_error()) };
        assert_eq!(msg.to_str().unwrap(), "handle is already occupied");
        // get leaves the error pending
        assert!(tandem_has_error());

        let msg = unsafe { CStr::from_ptr(tandem_take_error()) };
        assert_eq!(msg.to_str().unwrap(), "handle is already occupied");
        assert!(!tandem_has_error());
        assert!(tandem_take_error().is_null());
    }

    #[test]
    fn test_clear_error() {
        set_abi_error(AbiError::EmptyHandle);
        tandem_clear_error();
        assert!(!tandem_has_error());
    }
}
