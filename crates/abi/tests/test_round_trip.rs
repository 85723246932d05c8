//! Stamp and reconstruct every wrapper variant through a raw handle
//!
//! Covers the count bookkeeping of both stamping paths and the zero-copy
//! guarantee for finalized buffers.

mod common;

use std::fmt::Debug;

use proptest::prelude::*;
use tandem_abi::{RawHandle, reconstruct_into, stamp_copy, stamp_move, stamp_take};
use tandem_core::{
    Builder, Hybrid, RcPolicy, SafeBuffer, SafeBuilder, SafeHybrid, Unsafe, UnsafeBuilder,
    Wrapper,
};

/// Copy stamp, reconstruct, release; then take stamp, reconstruct, release.
fn check_round_trip<W: Wrapper + PartialEq + Debug>(value: &W) {
    let base = value.refcount();

    let mut handle = RawHandle::new();
    unsafe { stamp_copy(&mut handle, value) };
    assert_eq!(value.refcount(), base + 1);
    assert_eq!(handle.kind, W::KIND.as_raw());
    assert_eq!(
        handle.discipline,
        <W::Policy as RcPolicy>::DISCIPLINE.as_raw()
    );

    let mut out = W::default();
    unsafe { reconstruct_into(&mut out, &handle) }.unwrap();
    assert_eq!(&out, value);
    assert_eq!(out.refcount(), unsafe { handle.occupant_refcount() }.unwrap());
    assert_eq!(value.refcount(), base + 2);

    unsafe { handle.release() }.unwrap();
    drop(out);
    assert_eq!(value.refcount(), base);

    let mut source = value.clone();
    let mut handle = RawHandle::new();
    unsafe { stamp_take(&mut handle, &mut source) };
    assert_eq!(value.refcount(), base + 1);
    assert_eq!(source, W::default());
    assert_eq!(source.refcount(), 1);

    let mut out = W::default();
    unsafe { reconstruct_into(&mut out, &handle) }.unwrap();
    assert_eq!(&out, value);
    unsafe { handle.release() }.unwrap();
    drop(out);
    assert_eq!(value.refcount(), base);
}

fn to_unsafe(value: &SafeBuilder) -> UnsafeBuilder {
    Builder::<Unsafe>::from_json(&value.to_json())
}

proptest! {
    #[test]
    fn test_all_six_variants_round_trip(value in common::arb_value()) {
        common::init_tracing();

        check_round_trip(&value);
        check_round_trip(&value.finalize());
        check_round_trip(&Hybrid::from(value.clone()));
        check_round_trip(&Hybrid::from(value.finalize()));

        let value = to_unsafe(&value);
        check_round_trip(&value);
        check_round_trip(&value.finalize());
        check_round_trip(&Hybrid::from(value.clone()));
        check_round_trip(&Hybrid::from(value.finalize()));
    }
}

#[test]
fn test_move_stamp_keeps_count() {
    common::init_tracing();
    let value = SafeBuilder::from("moved");
    let witness = value.clone();
    assert_eq!(witness.refcount(), 2);

    let mut handle = RawHandle::new();
    unsafe { stamp_move(&mut handle, value) };
    assert_eq!(witness.refcount(), 2);

    unsafe { handle.release() }.unwrap();
    assert_eq!(witness.refcount(), 1);
}

#[test]
fn test_reconstruct_releases_previous_destination() {
    common::init_tracing();
    let stamped = SafeBuilder::from(1i64);
    let previous = SafeBuilder::from(2i64);

    let mut handle = RawHandle::new();
    unsafe { stamp_copy(&mut handle, &stamped) };

    let mut out = previous.clone();
    assert_eq!(previous.refcount(), 2);
    unsafe { reconstruct_into(&mut out, &handle) }.unwrap();
    assert_eq!(previous.refcount(), 1);
    assert_eq!(out.as_integer(), Some(1));
    unsafe { handle.release() }.unwrap();
}

#[test]
fn test_finalized_buffer_is_zero_copy() {
    common::init_tracing();
    let mut doc = SafeBuilder::object();
    doc.insert("blob", "x".repeat(4096)).unwrap();
    let buffer: SafeBuffer = doc.finalize();
    let bytes = buffer.encoded_bytes().unwrap().as_ptr();

    let mut handle = RawHandle::new();
    unsafe { stamp_copy(&mut handle, &buffer) };
    let mut out = SafeBuffer::default();
    unsafe { reconstruct_into(&mut out, &handle) }.unwrap();
    assert_eq!(out.encoded_bytes().unwrap().as_ptr(), bytes);
    assert!(out.ptr_eq(&buffer));

    // children of the reconstructed buffer still point into the same bytes
    let blob = out.get("blob").unwrap();
    assert_eq!(blob.encoded_bytes().unwrap().as_ptr(), bytes);
    assert_eq!(blob.len(), 4096);
    unsafe { handle.release() }.unwrap();
}

#[test]
fn test_nan_survives_round_trip() {
    common::init_tracing();
    check_round_trip(&SafeBuilder::from(f64::NAN));
    check_round_trip(&SafeBuffer::from(f64::NAN));
    check_round_trip(&SafeHybrid::from(SafeBuilder::from(f64::NAN)));

    let mut doc = SafeBuilder::object();
    doc.insert("ratio", f64::NAN).unwrap();
    check_round_trip(&doc);
    check_round_trip(&doc.finalize());
}
