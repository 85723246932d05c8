//! Finalized, immutable values
//!
//! A buffer points into one contiguous encoding (see `encoding`). Children
//! returned by `get`/`at` share the same allocation at a different offset, so
//! the bytes are never copied after `finalize`.

use crate::builder::Builder;
use crate::hybrid::Hybrid;
use crate::kind::StructuralKind;
use crate::payload::RawValue;
use crate::rc::RcPolicy;
use crate::wrapper::impl_wrapper;

/// Finalized immutable value
#[repr(transparent)]
pub struct Buffer<P: RcPolicy>(pub(crate) RawValue<P>);

impl_wrapper!(Buffer, StructuralKind::Buffer);

impl<P: RcPolicy> Default for Buffer<P> {
    fn default() -> Self {
        Builder::null().finalize()
    }
}

impl<P: RcPolicy> Buffer<P> {
    /// The complete encoding this value points into.
    ///
    /// `None` when the payload is a tree, which only happens when a buffer
    /// was read out of a handle holding a builder without a kind check.
    pub fn encoded_bytes(&self) -> Option<&[u8]> {
        self.0.encoded_bytes()
    }

    /// Position of this value inside [`encoded_bytes`](Self::encoded_bytes)
    pub fn offset(&self) -> usize {
        self.0.offset()
    }

    /// Decode into a fresh, unshared tree
    pub fn definalize(&self) -> Builder<P> {
        Builder(self.0.definalized())
    }
}

impl<P: RcPolicy> From<Builder<P>> for Buffer<P> {
    fn from(builder: Builder<P>) -> Self {
        builder.finalize()
    }
}

impl<P: RcPolicy> From<Hybrid<P>> for Buffer<P> {
    fn from(hybrid: Hybrid<P>) -> Self {
        hybrid.into_buffer()
    }
}

macro_rules! buffer_from_scalar {
    ($($t:ty),*) => {
        $(
            impl<P: RcPolicy> From<$t> for Buffer<P> {
                fn from(value: $t) -> Self {
                    Builder::from(value).finalize()
                }
            }
        )*
    };
}

buffer_from_scalar!(bool, i64, i32, f64, &str, String);
