//! Tandem Core: reference-counted dynamic values
//!
//! One dynamic, JSON-like value type in three structural kinds, each
//! available under two reference-counting policies:
//!
//! - `Builder`: mutable tree of nodes
//! - `Buffer`: finalized, immutable, contiguous encoding
//! - `Hybrid`: copy-on-write, holds either form and switches lazily
//!
//! Every wrapper is `#[repr(transparent)]` over [`RawValue`], so under one
//! policy all three kinds share a single memory layout. `tandem-abi` relies on
//! that to move values in and out of opaque handles without copying payloads.
//!
//! # Modules
//!
//! - `rc`: the `Safe` (atomic) and `Unsafe` (non-atomic) policies
//! - `kind`: structural kind and value type tags
//! - `payload`: the shared payload and `RawValue`
//! - `value_ref`: count-neutral borrowed reads
//! - `wrapper`: the `Wrapper` layout contract
//! - `builder`, `buffer`, `hybrid`: the three kinds
//! - `json`: serde interop (feature `json`)

pub mod buffer;
pub mod builder;
mod encoding;
pub mod error;
mod format;
pub mod hybrid;
#[cfg(feature = "json")]
mod json;
pub mod kind;
pub mod payload;
pub mod rc;
pub mod value_ref;
pub mod wrapper;

pub use buffer::Buffer;
pub use builder::Builder;
pub use error::EngineError;
pub use hybrid::Hybrid;
pub use kind::{StructuralKind, ValueType};
pub use payload::RawValue;
pub use rc::{RcPolicy, RefcountDiscipline, Safe, Unsafe};
pub use value_ref::{Elements, Entries, ValueRef};
pub use wrapper::Wrapper;

pub type SafeBuilder = Builder<Safe>;
pub type UnsafeBuilder = Builder<Unsafe>;
pub type SafeBuffer = Buffer<Safe>;
pub type UnsafeBuffer = Buffer<Unsafe>;
pub type SafeHybrid = Hybrid<Safe>;
pub type UnsafeHybrid = Hybrid<Unsafe>;

wrapper::impl_deep_eq!(
    Builder == Builder,
    Builder == Buffer,
    Builder == Hybrid,
    Buffer == Buffer,
    Buffer == Builder,
    Buffer == Hybrid,
    Hybrid == Hybrid,
    Hybrid == Builder,
    Hybrid == Buffer,
);

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_builder() -> impl Strategy<Value = SafeBuilder> {
        let leaf = prop_oneof![
            Just(SafeBuilder::null()),
            any::<bool>().prop_map(SafeBuilder::from),
            any::<i64>().prop_map(SafeBuilder::from),
            (-1.0e9f64..1.0e9).prop_map(SafeBuilder::from),
            "[a-z]{0,8}".prop_map(SafeBuilder::from),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(|items| {
                    let mut arr = SafeBuilder::array();
                    for item in items {
                        arr.push(item).unwrap();
                    }
                    arr
                }),
                prop::collection::vec(("[a-z]{1,4}", inner), 0..4).prop_map(|fields| {
                    let mut obj = SafeBuilder::object();
                    for (key, item) in fields {
                        obj.insert(key, item).unwrap();
                    }
                    obj
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn test_finalize_preserves_value(value in arb_builder()) {
            let buffer = value.finalize();
            prop_assert!(buffer.is_finalized());
            prop_assert_eq!(&buffer, &value);
            prop_assert_eq!(buffer.to_string(), value.to_string());
            prop_assert_eq!(&buffer.definalize(), &value);
        }

        #[test]
        fn test_hybrid_follows_either_form(value in arb_builder()) {
            let mut hybrid = Hybrid::from(value.clone());
            prop_assert_eq!(&hybrid, &value);
            hybrid.finalize();
            prop_assert_eq!(&hybrid, &value);
            prop_assert!(!value.is_finalized());
        }
    }

    #[test]
    fn test_cross_kind_equality_is_deep() {
        let mut a = SafeBuilder::object();
        a.insert("n", 1i64).unwrap();
        let mut b = SafeBuilder::object();
        b.insert("n", 1.0).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.finalize(), a);
        assert_eq!(SafeHybrid::from(a.finalize()), a);
    }

    #[test]
    fn test_debug_shows_refcount() {
        let a = UnsafeBuilder::from("x");
        let _b = a.clone();
        assert_eq!(format!("{:?}", a), r#"Builder("x", refcount=2)"#);
    }
}
