//! The typed wrapper contract and the accessors every wrapper shares

use crate::kind::StructuralKind;
use crate::payload::RawValue;
use crate::rc::RcPolicy;

/// A typed wrapper over the shared payload.
///
/// Implemented by [`Builder`](crate::Builder), [`Buffer`](crate::Buffer) and
/// [`Hybrid`](crate::Hybrid) for both policies: six variants in total.
///
/// `Clone` is copy-construction (count +1), a Rust move is move-construction
/// (count unchanged), `Drop` releases one count, and `Default` is the null
/// value a moved-from wrapper is left holding.
///
/// # Safety
///
/// Implementors must be `#[repr(transparent)]` over `RawValue<Self::Policy>`.
/// The handle layer constructs wrappers in place inside opaque storage and
/// reads them back through a pointer cast; this contract is what makes all
/// three kinds interchangeable in memory under one policy.
pub unsafe trait Wrapper: Clone + Default + 'static {
    /// Structural kind stamped into handle headers
    const KIND: StructuralKind;

    /// Refcount policy; its discipline is stamped into handle headers
    type Policy: RcPolicy;

    /// The shared payload
    fn as_raw(&self) -> &RawValue<Self::Policy>;

    /// Strong count of the shared payload
    fn refcount(&self) -> usize {
        self.as_raw().refcount()
    }
}

/// Implements [`Wrapper`], `Clone`, `Debug`, `Display` and the read accessors
/// for a `#[repr(transparent)]` newtype over `RawValue<P>`.
macro_rules! impl_wrapper {
    ($ty:ident, $kind:expr) => {
        unsafe impl<P: $crate::rc::RcPolicy> $crate::wrapper::Wrapper for $ty<P> {
            const KIND: $crate::kind::StructuralKind = $kind;
            type Policy = P;

            #[inline]
            fn as_raw(&self) -> &$crate::payload::RawValue<P> {
                &self.0
            }
        }

        impl<P: $crate::rc::RcPolicy> Clone for $ty<P> {
            #[inline]
            fn clone(&self) -> Self {
                $ty(self.0.clone())
            }

            #[inline]
            fn clone_from(&mut self, source: &Self) {
                self.0 = source.0.clone();
            }
        }

        impl<P: $crate::rc::RcPolicy> $ty<P> {
            /// Strong count of the shared payload
            #[inline]
            pub fn refcount(&self) -> usize {
                self.0.refcount()
            }

            pub fn value_type(&self) -> $crate::kind::ValueType {
                self.0.value_type()
            }

            /// Number of fields, elements or string bytes; 0 for scalars
            pub fn len(&self) -> usize {
                self.0.as_value_ref().len()
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            pub fn is_null(&self) -> bool {
                self.value_type() == $crate::kind::ValueType::Null
            }

            pub fn is_object(&self) -> bool {
                self.value_type() == $crate::kind::ValueType::Object
            }

            pub fn is_array(&self) -> bool {
                self.value_type() == $crate::kind::ValueType::Array
            }

            /// Field lookup; the result shares this value's payload
            pub fn get(&self, key: &str) -> Option<Self> {
                self.0.get(key).map($ty)
            }

            /// Element lookup; the result shares this value's payload
            pub fn at(&self, index: usize) -> Option<Self> {
                self.0.at(index).map($ty)
            }

            /// Object keys in sorted order (empty for non-objects)
            pub fn keys(&self) -> Vec<&str> {
                self.0.as_value_ref().entries().map(|(key, _)| key).collect()
            }

            pub fn as_bool(&self) -> Option<bool> {
                self.0.as_value_ref().as_bool()
            }

            pub fn as_integer(&self) -> Option<i64> {
                self.0.as_value_ref().as_integer()
            }

            pub fn as_decimal(&self) -> Option<f64> {
                self.0.as_value_ref().as_decimal()
            }

            pub fn as_str(&self) -> Option<&str> {
                self.0.as_value_ref().as_str()
            }

            /// Borrowed view that leaves the shared count alone
            pub fn as_value_ref(&self) -> $crate::value_ref::ValueRef<'_, P> {
                self.0.as_value_ref()
            }

            /// Whether the payload is a finalized encoding
            pub fn is_finalized(&self) -> bool {
                self.0.is_finalized()
            }

            /// Whether both wrappers point at the same payload (and sub-value)
            pub fn ptr_eq(&self, other: &Self) -> bool {
                self.0.ptr_eq(&other.0)
            }
        }

        impl<P: $crate::rc::RcPolicy> std::fmt::Debug for $ty<P> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}(", stringify!($ty))?;
                $crate::format::write_json(self.0.as_value_ref(), f)?;
                write!(f, ", refcount={})", self.refcount())
            }
        }

        impl<P: $crate::rc::RcPolicy> std::fmt::Display for $ty<P> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                $crate::format::write_json(self.0.as_value_ref(), f)
            }
        }
    };
}

/// Deep structural `PartialEq` between two wrapper kinds of the same policy
macro_rules! impl_deep_eq {
    ($($a:ident == $b:ident),* $(,)?) => {
        $(
            impl<P: $crate::rc::RcPolicy> PartialEq<$b<P>> for $a<P> {
                fn eq(&self, other: &$b<P>) -> bool {
                    self.0.as_value_ref().deep_eq(other.0.as_value_ref())
                }
            }
        )*
    };
}

pub(crate) use impl_deep_eq;
pub(crate) use impl_wrapper;
