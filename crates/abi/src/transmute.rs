//! Typed value → handle
//!
//! Stamping writes the header first and then places the wrapper in the
//! storage bytes, by copy (count +1) or by move (count unchanged). Nothing
//! about the value is validated: the caller supplies both the value and its
//! policy, so the tags are right by construction.

use std::mem;
use std::ptr;

use tandem_core::{RcPolicy, Wrapper};
use tracing::trace;

use crate::handle::{KIND_EMPTY, RawHandle};

/// Panics if `dst` already holds a value, in debug builds or with the
/// `occupancy-check` feature. Otherwise stamping over a value leaks it.
#[inline]
fn check_vacant(dst: &RawHandle) {
    if cfg!(any(debug_assertions, feature = "occupancy-check")) {
        assert!(
            dst.kind == KIND_EMPTY,
            "stamping over an occupied handle (kind tag {}) would leak its value",
            dst.kind
        );
    }
}

/// Move `src` into `dst`. The shared count is unchanged.
///
/// # Safety
/// `dst` must have a valid header. If `dst` is occupied its value is leaked
/// (release builds without `occupancy-check`) or the call panics.
pub unsafe fn stamp_move<W: Wrapper>(dst: &mut RawHandle, src: W) {
    check_vacant(dst);
    let kind = W::KIND;
    let discipline = <W::Policy as RcPolicy>::DISCIPLINE;
    dst.kind = kind.as_raw();
    dst.discipline = discipline.as_raw();
    trace!(%kind, %discipline, refcount = src.refcount(), "stamp");
    // SAFETY: Storage fits every wrapper (asserted in `handle`)
    unsafe { ptr::write(dst.storage.as_mut_ptr::<W>(), src) };
}

/// Copy `src` into `dst`. The shared count goes up by one.
///
/// # Safety
/// Same contract as [`stamp_move`].
pub unsafe fn stamp_copy<W: Wrapper>(dst: &mut RawHandle, src: &W) {
    unsafe { stamp_move(dst, src.clone()) }
}

/// Move `src` into `dst`, leaving `src` as its default null value.
///
/// # Safety
/// Same contract as [`stamp_move`].
pub unsafe fn stamp_take<W: Wrapper>(dst: &mut RawHandle, src: &mut W) {
    unsafe { stamp_move(dst, mem::take(src)) }
}
