//! C ABI
//!
//! Handles are caller-allocated 32-byte blocks (`RawHandle`). Values get into
//! them from Rust through the `transmute` functions; C code can then copy,
//! inspect and destroy them. Failures return `false` / `0` and leave the
//! reason in the thread-local error slot (`tandem_take_error`).

use crate::error::{AbiError, set_abi_error};
use crate::handle::RawHandle;

/// Record `err` and return `fallback`
fn fail<T>(err: AbiError, fallback: T) -> T {
    set_abi_error(err);
    fallback
}

/// Write the empty header.
///
/// # Safety
/// `handle` must be null or point to writable memory for one `RawHandle`.
/// Whatever it held before is forgotten, not released.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tandem_handle_init(handle: *mut RawHandle) {
    if handle.is_null() {
        set_abi_error(AbiError::NullHandle("tandem_handle_init"));
        return;
    }
    unsafe { handle.write(RawHandle::new()) };
}

/// Release the value (count -1) and reset to empty.
///
/// # Safety
/// `handle` must be null or point to an initialized handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tandem_handle_destroy(handle: *mut RawHandle) {
    let Some(handle) = (unsafe { handle.as_mut() }) else {
        set_abi_error(AbiError::NullHandle("tandem_handle_destroy"));
        return;
    };
    if let Err(err) = unsafe { handle.release() } {
        set_abi_error(err);
    }
}

/// Copy `src`'s value into the empty `dst` (count +1).
///
/// Returns false if either pointer is null, `dst` is occupied or `src` has an
/// invalid header.
///
/// # Safety
/// Both pointers must be null or point to distinct, initialized handles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tandem_handle_copy(dst: *mut RawHandle, src: *const RawHandle) -> bool {
    let (Some(dst), Some(src)) = (unsafe { dst.as_mut() }, unsafe { src.as_ref() }) else {
        return fail(AbiError::NullHandle("tandem_handle_copy"), false);
    };
    match unsafe { src.copy_into(dst) } {
        Ok(()) => true,
        Err(err) => fail(err, false),
    }
}

/// Shared count of the value; 0 for empty handles and on error.
///
/// # Safety
/// `handle` must be null or point to an initialized handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tandem_handle_refcount(handle: *const RawHandle) -> usize {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return fail(AbiError::NullHandle("tandem_handle_refcount"), 0);
    };
    unsafe { handle.occupant_refcount() }.unwrap_or_else(|err| fail(err, 0))
}

/// Object fields, array elements or string bytes; 0 for scalars, empty
/// handles and on error.
///
/// # Safety
/// `handle` must be null or point to an initialized handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tandem_handle_size(handle: *const RawHandle) -> usize {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return fail(AbiError::NullHandle("tandem_handle_size"), 0);
    };
    unsafe { handle.occupant_len() }.unwrap_or_else(|err| fail(err, 0))
}

/// Raw kind tag (0 = empty)
///
/// # Safety
/// `handle` must be null or point to an initialized handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tandem_handle_kind(handle: *const RawHandle) -> u32 {
    match unsafe { handle.as_ref() } {
        Some(handle) => handle.kind,
        None => fail(AbiError::NullHandle("tandem_handle_kind"), 0),
    }
}

/// Raw discipline tag (0 = safe, 1 = unsafe); meaningless for empty handles
///
/// # Safety
/// `handle` must be null or point to an initialized handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tandem_handle_discipline(handle: *const RawHandle) -> u32 {
    match unsafe { handle.as_ref() } {
        Some(handle) => handle.discipline,
        None => fail(AbiError::NullHandle("tandem_handle_discipline"), 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{clear_abi_error, take_abi_error};
    use crate::transmute::stamp_copy;
    use std::mem::MaybeUninit;
    use std::ptr;
    use tandem_core::{SafeBuilder, UnsafeHybrid};

    #[test]
    fn test_init_over_garbage() {
        let mut slot = MaybeUninit::<RawHandle>::uninit();
        unsafe {
            tandem_handle_init(slot.as_mut_ptr());
            let handle = slot.assume_init_ref();
            assert_eq!(tandem_handle_kind(handle), 0);
            assert_eq!(tandem_handle_refcount(handle), 0);
        }
    }

    #[test]
    fn test_copy_then_destroy() {
        let mut value = SafeBuilder::object();
        value.insert("a", 1i64).unwrap();
        value.insert("b", 2i64).unwrap();

        let mut src = RawHandle::new();
        let mut dst = RawHandle::new();
        unsafe {
            stamp_copy(&mut src, &value);
            assert!(tandem_handle_copy(&mut dst, &src));
            assert_eq!(tandem_handle_refcount(&dst), 3);
            assert_eq!(tandem_handle_size(&dst), 2);
            assert_eq!(tandem_handle_kind(&dst), 1);
            assert_eq!(tandem_handle_discipline(&dst), 0);

            tandem_handle_destroy(&mut src);
            tandem_handle_destroy(&mut dst);
        }
        assert_eq!(value.refcount(), 1);
        assert!(src.is_empty() && dst.is_empty());
    }

    #[test]
    fn test_copy_into_occupied_fails() {
        clear_abi_error();
        let value = UnsafeHybrid::default();
        let mut a = RawHandle::new();
        let mut b = RawHandle::new();
        unsafe {
            stamp_copy(&mut a, &value);
            stamp_copy(&mut b, &value);
            assert!(!tandem_handle_copy(&mut b, &a));
            assert_eq!(take_abi_error(), Some(AbiError::HandleOccupied));
            assert_eq!(value.refcount(), 3);
            tandem_handle_destroy(&mut a);
            tandem_handle_destroy(&mut b);
        }
        assert_eq!(value.refcount(), 1);
    }

    #[test]
    fn test_null_pointers_are_reported() {
        clear_abi_error();
        unsafe {
            assert_eq!(tandem_handle_refcount(ptr::null()), 0);
            assert_eq!(
                take_abi_error(),
                Some(AbiError::NullHandle("tandem_handle_refcount"))
            );
            assert!(!tandem_handle_copy(ptr::null_mut(), ptr::null()));
            assert!(take_abi_error().is_some());
            tandem_handle_destroy(ptr::null_mut());
            assert!(take_abi_error().is_some());
        }
    }

    #[test]
    fn test_invalid_header_is_reported() {
        clear_abi_error();
        let mut raw = RawHandle::new();
        raw.kind = 9;
        unsafe {
            tandem_handle_destroy(&mut raw);
        }
        assert_eq!(
            take_abi_error(),
            Some(AbiError::InvalidHeader {
                kind: 9,
                discipline: 0
            })
        );
    }
}
