//! Tandem ABI: opaque handles for tandem values
//!
//! Moves the six typed wrappers of `tandem-core` in and out of a fixed-size,
//! type-erased handle without copying their payloads. The handle carries two
//! tags, the structural kind and the refcount discipline:
//!
//! ```text
//!   Builder<Safe> ──stamp──▶ [kind=1 | discipline=0 | RawValue] ──reconstruct──▶ Builder<Safe>
//!                                                                       │
//!                                   discipline differs? ──▶ DisciplineMismatch
//! ```
//!
//! # Modules
//!
//! - `handle`: the 32-byte `RawHandle`, the owning `Handle` and `SyncHandle`
//! - `transmute`: typed value → handle (copy, move or take)
//! - `reconstruct`: handle → typed value, discipline-checked
//! - `error`: `AbiError` and the thread-local error slot for C callers
//! - `ffi`: `extern "C"` handle operations

pub mod error;
pub mod ffi;
pub mod handle;
pub mod reconstruct;
pub mod transmute;

pub use error::{AbiError, clear_abi_error, has_abi_error, set_abi_error, take_abi_error};
pub use handle::{
    HANDLE_SIZE, Handle, KIND_EMPTY, RawHandle, STORAGE_ALIGN, STORAGE_SIZE, Storage, SyncHandle,
};
pub use reconstruct::reconstruct_into;
pub use transmute::{stamp_copy, stamp_move, stamp_take};
