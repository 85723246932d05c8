//! Handle → typed value
//!
//! Reconstruction checks one thing: that the handle's refcount discipline is
//! the destination's. Crossing disciplines would drive an atomic count with
//! plain arithmetic (or the reverse), so that mismatch is refused and the
//! destination is left as it was.
//!
//! The structural kind is **not** checked here. Under one discipline every
//! wrapper is `#[repr(transparent)]` over the same `RawValue`, so reading a
//! builder as a buffer gives the wrong accessor set but never touches memory
//! it should not. [`Handle::reconstruct_into`](crate::Handle::reconstruct_into)
//! is the checked alternative.

use tandem_core::{RcPolicy, Wrapper};
use tracing::trace;

use crate::error::AbiError;
use crate::handle::RawHandle;

/// The occupant of `src` viewed as `W`
///
/// # Safety
/// `src` must hold a value stamped under `W::Policy`.
#[inline]
pub(crate) unsafe fn occupant<W: Wrapper>(src: &RawHandle) -> &W {
    unsafe { &*src.storage.as_ptr::<W>() }
}

/// Fails with [`AbiError::DisciplineMismatch`] unless `src` was stamped under
/// `W`'s policy
#[inline]
pub(crate) fn check_discipline<W: Wrapper>(src: &RawHandle) -> Result<(), AbiError> {
    let expected = <W::Policy as RcPolicy>::DISCIPLINE.as_raw();
    if src.discipline != expected {
        return Err(AbiError::DisciplineMismatch {
            expected,
            found: src.discipline,
        });
    }
    Ok(())
}

/// Copy-assign the value held by `src` into `dst`.
///
/// The shared count goes up by one and `dst`'s previous payload is released.
/// On a discipline mismatch nothing is touched.
///
/// # Safety
/// `src` must be occupied (an unstamped handle's storage is garbage). The
/// structural kind is not checked; see the module docs.
pub unsafe fn reconstruct_into<W: Wrapper>(dst: &mut W, src: &RawHandle) -> Result<(), AbiError> {
    check_discipline::<W>(src)?;
    // SAFETY: the discipline matches, so the storage holds a RawValue<W::Policy>
    let value = unsafe { occupant::<W>(src) };
    dst.clone_from(value);
    let kind = W::KIND;
    trace!(%kind, stamped_kind = src.kind, refcount = dst.refcount(), "reconstruct");
    Ok(())
}
