//! Opaque handles
//!
//! A handle is a fixed-size, binary-stable block that carries one tandem value
//! across a library boundary. The value's type is not known to the block; the
//! header tags stamped next to it are the only type information.
//!
//! ## Handle Layout (32 bytes)
//!
//! ```text
//! ┌──────────────┬────────────────────┬───────────────────────────────────┐
//! │ kind: u32    │ discipline: u32    │ storage: 24 bytes, align 8         │
//! ├──────────────┼────────────────────┼───────────────────────────────────┤
//! │ 0 = empty    │ 0 = safe (atomic)  │ one wrapper, constructed in place │
//! │ 1 = builder  │ 1 = unsafe         │ (a RawValue: pointer + offset)    │
//! │ 2 = buffer   │                    │                                   │
//! │ 3 = hybrid   │                    │                                   │
//! └──────────────┴────────────────────┴───────────────────────────────────┘
//! ```
//!
//! [`RawHandle`] is the bare block, for C callers and the raw `transmute` /
//! `reconstruct` functions. [`Handle`] owns one: emptiness is part of its
//! state, it releases its value on drop and it checks both tags before
//! handing a value back.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{ManuallyDrop, MaybeUninit, align_of, size_of};
use std::ops::Deref;
use std::ptr;

use tandem_core::{
    Buffer, Builder, Hybrid, RawValue, RcPolicy, RefcountDiscipline, Safe, StructuralKind, Unsafe,
    Wrapper,
};
use tracing::debug;

use crate::error::AbiError;
use crate::{reconstruct, transmute};

/// Bytes available for the value
pub const STORAGE_SIZE: usize = 24;
pub const STORAGE_ALIGN: usize = 8;
/// Total handle size, header included
pub const HANDLE_SIZE: usize = 32;
/// Kind tag of a handle with no value
pub const KIND_EMPTY: u32 = 0;

// =============================================================================
// RawHandle
// =============================================================================

/// Uninterpreted value bytes
#[repr(C, align(8))]
pub struct Storage([MaybeUninit<u8>; STORAGE_SIZE]);

impl Storage {
    pub const UNINIT: Storage = Storage([MaybeUninit::uninit(); STORAGE_SIZE]);

    #[inline(always)]
    pub fn as_ptr<W>(&self) -> *const W {
        self.0.as_ptr().cast()
    }

    #[inline(always)]
    pub fn as_mut_ptr<W>(&mut self) -> *mut W {
        self.0.as_mut_ptr().cast()
    }
}

/// The bare, C-layout handle.
///
/// Not `Clone`: duplicating the bytes would duplicate ownership of the value
/// without touching its count. Use [`RawHandle::copy_into`].
#[repr(C)]
pub struct RawHandle {
    pub kind: u32,
    pub discipline: u32,
    pub storage: Storage,
}

const _: () = assert!(size_of::<RawHandle>() == HANDLE_SIZE, "RawHandle must be 32 bytes");
const _: () = assert!(align_of::<RawHandle>() == STORAGE_ALIGN);

macro_rules! assert_fits_storage {
    ($($w:ty),*) => {
        $(
            const _: () = assert!(
                size_of::<$w>() <= STORAGE_SIZE && align_of::<$w>() <= STORAGE_ALIGN,
                concat!(stringify!($w), " does not fit handle storage")
            );
        )*
    };
}

assert_fits_storage!(
    Builder<Safe>,
    Builder<Unsafe>,
    Buffer<Safe>,
    Buffer<Unsafe>,
    Hybrid<Safe>,
    Hybrid<Unsafe>
);

/// Run `$body` with `$p` bound to the policy type named by a discipline tag
macro_rules! with_policy {
    ($discipline:expr, $p:ident => $body:expr) => {
        match $discipline {
            RefcountDiscipline::Safe => {
                type $p = Safe;
                $body
            }
            RefcountDiscipline::Unsafe => {
                type $p = Unsafe;
                $body
            }
        }
    };
}

impl RawHandle {
    pub const EMPTY: RawHandle = RawHandle {
        kind: KIND_EMPTY,
        discipline: 0,
        storage: Storage::UNINIT,
    };

    pub const fn new() -> Self {
        Self::EMPTY
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.kind == KIND_EMPTY
    }

    /// Decoded header: `None` when empty, an error when a tag is unknown
    pub fn header(&self) -> Result<Option<(StructuralKind, RefcountDiscipline)>, AbiError> {
        if self.is_empty() {
            return Ok(None);
        }
        match (
            StructuralKind::from_raw(self.kind),
            RefcountDiscipline::from_raw(self.discipline),
        ) {
            (Some(kind), Some(discipline)) => Ok(Some((kind, discipline))),
            _ => Err(AbiError::InvalidHeader {
                kind: self.kind,
                discipline: self.discipline,
            }),
        }
    }

    /// Release the value (count -1) and reset to empty. Empty handles are
    /// left alone.
    ///
    /// # Safety
    /// An occupied handle's storage must hold the value its header describes.
    pub unsafe fn release(&mut self) -> Result<(), AbiError> {
        let Some((_, discipline)) = self.header()? else {
            return Ok(());
        };
        self.kind = KIND_EMPTY;
        // SAFETY: every kind is a RawValue<P> under its policy
        with_policy!(discipline, P => unsafe {
            ptr::drop_in_place(self.storage.as_mut_ptr::<RawValue<P>>())
        });
        Ok(())
    }

    /// Copy this handle's value into the empty `dst` (count +1), tags included.
    ///
    /// Copying an empty handle leaves `dst` empty.
    ///
    /// # Safety
    /// Same contract as [`release`](Self::release), for both handles.
    pub unsafe fn copy_into(&self, dst: &mut RawHandle) -> Result<(), AbiError> {
        if !dst.is_empty() {
            return Err(AbiError::HandleOccupied);
        }
        let Some((kind, discipline)) = self.header()? else {
            return Ok(());
        };
        with_policy!(discipline, P => unsafe {
            let value = (*self.storage.as_ptr::<RawValue<P>>()).clone();
            ptr::write(dst.storage.as_mut_ptr::<RawValue<P>>(), value);
        });
        dst.kind = kind.as_raw();
        dst.discipline = discipline.as_raw();
        Ok(())
    }

    /// Shared count of the value; 0 when empty
    ///
    /// # Safety
    /// Same contract as [`release`](Self::release).
    pub unsafe fn occupant_refcount(&self) -> Result<usize, AbiError> {
        let Some((_, discipline)) = self.header()? else {
            return Ok(0);
        };
        Ok(with_policy!(discipline, P => unsafe {
            (*self.storage.as_ptr::<RawValue<P>>()).refcount()
        }))
    }

    /// Fields, elements or string bytes of the value; 0 when empty
    ///
    /// # Safety
    /// Same contract as [`release`](Self::release).
    pub unsafe fn occupant_len(&self) -> Result<usize, AbiError> {
        let Some((_, discipline)) = self.header()? else {
            return Ok(0);
        };
        Ok(with_policy!(discipline, P => unsafe {
            (*self.storage.as_ptr::<RawValue<P>>()).as_value_ref().len()
        }))
    }
}

impl Default for RawHandle {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawHandle")
            .field("kind", &kind_name(self.kind))
            .field("discipline", &discipline_name(self.discipline))
            .finish_non_exhaustive()
    }
}

pub(crate) fn kind_name(raw: u32) -> String {
    match StructuralKind::from_raw(raw) {
        Some(kind) => kind.to_string(),
        None if raw == KIND_EMPTY => "empty".to_string(),
        None => format!("<invalid {}>", raw),
    }
}

pub(crate) fn discipline_name(raw: u32) -> String {
    match RefcountDiscipline::from_raw(raw) {
        Some(discipline) => discipline.to_string(),
        None => format!("<invalid {}>", raw),
    }
}

// =============================================================================
// Handle
// =============================================================================

/// An owned handle: empty, or holding one value of any of the six wrappers.
///
/// Same layout as [`RawHandle`]. `!Send` and `!Sync` since it may hold an
/// `Unsafe` value; see [`SyncHandle`].
///
/// ```
/// use tandem_abi::Handle;
/// use tandem_core::{SafeBuffer, SafeBuilder};
///
/// let value = SafeBuilder::from(42i64);
/// let handle = Handle::from_ref(&value);
/// assert_eq!(value.refcount(), 2);
///
/// let back: SafeBuilder = handle.reconstruct().unwrap();
/// assert_eq!(back, value);
/// assert!(handle.reconstruct::<SafeBuffer>().is_err());
/// ```
#[repr(transparent)]
pub struct Handle {
    raw: RawHandle,
    _not_send: PhantomData<*const ()>,
}

impl Handle {
    pub const fn new() -> Self {
        Handle {
            raw: RawHandle::new(),
            _not_send: PhantomData,
        }
    }

    /// A handle holding `value` (moved in, count unchanged)
    pub fn from_value<W: Wrapper>(value: W) -> Self {
        let mut handle = Self::new();
        handle.stamp(value);
        handle
    }

    /// A handle holding a copy of `value` (count +1)
    pub fn from_ref<W: Wrapper>(value: &W) -> Self {
        let mut handle = Self::new();
        handle.stamp_ref(value);
        handle
    }

    /// Move `value` in, releasing any previous value first
    pub fn stamp<W: Wrapper>(&mut self, value: W) {
        self.vacate();
        // SAFETY: the handle is empty and its header valid
        unsafe { transmute::stamp_move(&mut self.raw, value) }
    }

    /// Copy `value` in (count +1), releasing any previous value first
    pub fn stamp_ref<W: Wrapper>(&mut self, value: &W) {
        self.vacate();
        unsafe { transmute::stamp_copy(&mut self.raw, value) }
    }

    /// Move `value` in and leave it as its default null value
    pub fn stamp_take<W: Wrapper>(&mut self, value: &mut W) {
        self.vacate();
        unsafe { transmute::stamp_take(&mut self.raw, value) }
    }

    fn vacate(&mut self) {
        if !self.is_empty() {
            debug!(kind = %kind_name(self.raw.kind), "releasing previous handle value");
            self.clear();
        }
    }

    /// Copy-assign the value into `dst` after checking both tags.
    ///
    /// Errors: [`AbiError::EmptyHandle`], [`AbiError::DisciplineMismatch`],
    /// [`AbiError::KindMismatch`]. `dst` is untouched on error.
    pub fn reconstruct_into<W: Wrapper>(&self, dst: &mut W) -> Result<(), AbiError> {
        self.check::<W>()?;
        // SAFETY: occupied, and the header is valid while owned by a Handle
        unsafe { reconstruct::reconstruct_into(dst, &self.raw) }
    }

    /// A new wrapper sharing the value, after checking both tags
    pub fn reconstruct<W: Wrapper>(&self) -> Result<W, AbiError> {
        self.check::<W>()?;
        // SAFETY: both tags match W
        Ok(unsafe { reconstruct::occupant::<W>(&self.raw) }.clone())
    }

    /// Like [`reconstruct_into`](Self::reconstruct_into) without the
    /// structural kind check.
    ///
    /// A builder's value read as a buffer (or any other pairing) is logically
    /// wrong: buffer accessors find a tree, builder mutators find a finalized
    /// encoding and fail with `FinalizedPayload`. It is never memory-unsafe,
    /// because all kinds share one layout under a discipline.
    pub fn reconstruct_unchecked_kind<W: Wrapper>(&self, dst: &mut W) -> Result<(), AbiError> {
        if self.is_empty() {
            return Err(AbiError::EmptyHandle);
        }
        unsafe { reconstruct::reconstruct_into(dst, &self.raw) }
    }

    fn check<W: Wrapper>(&self) -> Result<(), AbiError> {
        if self.is_empty() {
            return Err(AbiError::EmptyHandle);
        }
        reconstruct::check_discipline::<W>(&self.raw)?;
        let expected = W::KIND.as_raw();
        if self.raw.kind != expected {
            return Err(AbiError::KindMismatch {
                expected,
                found: self.raw.kind,
            });
        }
        Ok(())
    }

    pub fn kind(&self) -> Option<StructuralKind> {
        StructuralKind::from_raw(self.raw.kind)
    }

    /// `None` when empty
    pub fn discipline(&self) -> Option<RefcountDiscipline> {
        if self.is_empty() {
            return None;
        }
        RefcountDiscipline::from_raw(self.raw.discipline)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Shared count of the value; 0 when empty
    pub fn refcount(&self) -> usize {
        unsafe { self.raw.occupant_refcount() }.unwrap_or(0)
    }

    /// Fields, elements or string bytes of the value; 0 when empty
    pub fn len(&self) -> usize {
        unsafe { self.raw.occupant_len() }.unwrap_or(0)
    }

    /// Release the value (count -1); the handle becomes empty
    pub fn clear(&mut self) {
        // SAFETY: a Handle's header always describes its storage
        let released = unsafe { self.raw.release() };
        debug_assert!(released.is_ok(), "handle header corrupted: {:?}", self.raw);
    }

    /// Give up ownership; the caller becomes responsible for releasing
    pub fn into_raw(self) -> RawHandle {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never used or dropped again
        unsafe { ptr::read(&this.raw) }
    }

    /// Take ownership of a raw handle.
    ///
    /// Fails with [`AbiError::InvalidHeader`] on unknown tags; the raw handle
    /// is dropped as bytes in that case, leaking whatever it held.
    ///
    /// # Safety
    /// An occupied `raw` must hold the value its header describes, and no
    /// one else may release it.
    pub unsafe fn from_raw(raw: RawHandle) -> Result<Self, AbiError> {
        raw.header()?;
        Ok(Handle {
            raw,
            _not_send: PhantomData,
        })
    }

    pub fn as_raw(&self) -> &RawHandle {
        &self.raw
    }

    /// Prove the handle holds nothing or a `Safe` value, making it `Send`.
    ///
    /// Hands the handle back unchanged if it holds an `Unsafe` value.
    pub fn into_sync(self) -> Result<SyncHandle, Handle> {
        match self.discipline() {
            Some(RefcountDiscipline::Unsafe) => Err(self),
            _ => Ok(SyncHandle(self)),
        }
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::new()
    }
}

/// Copies the value (count +1)
impl Clone for Handle {
    fn clone(&self) -> Self {
        let mut handle = Handle::new();
        // SAFETY: both headers are valid and the new handle is empty
        let copied = unsafe { self.raw.copy_into(&mut handle.raw) };
        debug_assert!(copied.is_ok(), "handle header corrupted: {:?}", self.raw);
        handle
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &kind_name(self.raw.kind))
            .field("discipline", &self.discipline())
            .field("refcount", &self.refcount())
            .finish()
    }
}

impl<P: RcPolicy> From<Builder<P>> for Handle {
    fn from(value: Builder<P>) -> Self {
        Handle::from_value(value)
    }
}

impl<P: RcPolicy> From<Buffer<P>> for Handle {
    fn from(value: Buffer<P>) -> Self {
        Handle::from_value(value)
    }
}

impl<P: RcPolicy> From<Hybrid<P>> for Handle {
    fn from(value: Hybrid<P>) -> Self {
        Handle::from_value(value)
    }
}

// =============================================================================
// SyncHandle
// =============================================================================

/// A [`Handle`] that is empty or holds a `Safe` value.
///
/// Obtained from [`Handle::into_sync`]. Read-only through `Deref`, so no
/// `Unsafe` value can be stamped into it.
#[derive(Clone, Debug, Default)]
pub struct SyncHandle(Handle);

// SAFETY: the value, if any, is an Arc-backed `Safe` wrapper, and shared
// access only clones it or reads its count.
unsafe impl Send for SyncHandle {}
unsafe impl Sync for SyncHandle {}

impl SyncHandle {
    pub fn new() -> Self {
        SyncHandle(Handle::new())
    }

    /// Move a `Safe` value in, releasing any previous value
    pub fn stamp<W: Wrapper<Policy = Safe>>(&mut self, value: W) {
        self.0.stamp(value);
    }

    pub fn into_handle(self) -> Handle {
        self.0
    }
}

impl Deref for SyncHandle {
    type Target = Handle;

    fn deref(&self) -> &Handle {
        &self.0
    }
}

macro_rules! sync_handle_from {
    ($($w:ident),*) => {
        $(
            impl From<$w<Safe>> for SyncHandle {
                fn from(value: $w<Safe>) -> Self {
                    SyncHandle(Handle::from_value(value))
                }
            }
        )*
    };
}

sync_handle_from!(Builder, Buffer, Hybrid);
