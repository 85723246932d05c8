//! Finalized buffer encoding
//!
//! A finalized value is one contiguous, immutable byte string. Every record
//! starts with a one-byte tag; offsets are little-endian `u32`s measured from
//! the start of the encoding, so a sub-value is fully identified by
//! `(bytes, offset)`.
//!
//! ```text
//! tag 0  null
//! tag 1  false
//! tag 2  true
//! tag 3  integer   i64
//! tag 4  decimal   f64 bits
//! tag 5  string    u32 len │ utf-8 bytes
//! tag 6  array     u32 count │ count × u32 element offset
//! tag 7  object    u32 count │ count × (u32 key offset, u32 value offset)
//! ```
//!
//! Object entries are sorted by key bytes, and keys are themselves string
//! records, so field lookup is a binary search that never allocates.

use std::cmp::Ordering;

use crate::kind::ValueType;
use crate::rc::RcPolicy;
use crate::value_ref::ValueRef;

pub const TAG_NULL: u8 = 0;
pub const TAG_FALSE: u8 = 1;
pub const TAG_TRUE: u8 = 2;
pub const TAG_INTEGER: u8 = 3;
pub const TAG_DECIMAL: u8 = 4;
pub const TAG_STRING: u8 = 5;
pub const TAG_ARRAY: u8 = 6;
pub const TAG_OBJECT: u8 = 7;

/// Size of the tag + count header of strings, arrays and objects
const HEADER: usize = 5;

// =============================================================================
// Writing
// =============================================================================

/// Encode any readable value into a fresh finalized encoding
pub(crate) fn encode<P: RcPolicy>(value: ValueRef<'_, P>) -> Box<[u8]> {
    let mut out = Vec::new();
    write_value(value, &mut out);
    out.into_boxed_slice()
}

/// Offsets, lengths and counts all share the u32 range
fn checked_u32(n: usize) -> u32 {
    assert!(
        n <= u32::MAX as usize,
        "encoding exceeds the 4 GiB offset range"
    );
    n as u32
}

fn position(out: &[u8]) -> u32 {
    checked_u32(out.len())
}

fn patch_u32(out: &mut [u8], at: usize, value: u32) {
    out[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

fn write_string(s: &str, out: &mut Vec<u8>) -> u32 {
    let at = position(out);
    out.push(TAG_STRING);
    out.extend_from_slice(&position(s.as_bytes()).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
    at
}

fn write_value<P: RcPolicy>(value: ValueRef<'_, P>, out: &mut Vec<u8>) -> u32 {
    let at = position(out);
    match value.value_type() {
        ValueType::Null => out.push(TAG_NULL),
        ValueType::Boolean => {
            out.push(if value.as_bool() == Some(true) {
                TAG_TRUE
            } else {
                TAG_FALSE
            });
        }
        ValueType::Integer => {
            out.push(TAG_INTEGER);
            out.extend_from_slice(&value.as_integer().unwrap_or_default().to_le_bytes());
        }
        ValueType::Decimal => {
            out.push(TAG_DECIMAL);
            let bits = value.as_decimal().unwrap_or_default().to_bits();
            out.extend_from_slice(&bits.to_le_bytes());
        }
        ValueType::String => {
            write_string(value.as_str().unwrap_or_default(), out);
        }
        ValueType::Array => {
            let count = value.len();
            out.push(TAG_ARRAY);
            out.extend_from_slice(&checked_u32(count).to_le_bytes());
            let table = out.len();
            out.resize(table + count * 4, 0);
            for (i, child) in value.elements().enumerate() {
                let child_at = write_value(child, out);
                patch_u32(out, table + i * 4, child_at);
            }
        }
        ValueType::Object => {
            let count = value.len();
            out.push(TAG_OBJECT);
            out.extend_from_slice(&checked_u32(count).to_le_bytes());
            let table = out.len();
            out.resize(table + count * 8, 0);
            for (i, (key, child)) in value.entries().enumerate() {
                let key_at = write_string(key, out);
                let child_at = write_value(child, out);
                patch_u32(out, table + i * 8, key_at);
                patch_u32(out, table + i * 8 + 4, child_at);
            }
        }
    }
    at
}

// =============================================================================
// Reading
// =============================================================================

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> usize {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(word) as usize
}

#[inline]
fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(word)
}

#[inline]
fn tag(bytes: &[u8], offset: usize) -> u8 {
    bytes[offset]
}

pub(crate) fn value_type(bytes: &[u8], offset: usize) -> ValueType {
    match tag(bytes, offset) {
        TAG_NULL => ValueType::Null,
        TAG_FALSE | TAG_TRUE => ValueType::Boolean,
        TAG_INTEGER => ValueType::Integer,
        TAG_DECIMAL => ValueType::Decimal,
        TAG_STRING => ValueType::String,
        TAG_ARRAY => ValueType::Array,
        TAG_OBJECT => ValueType::Object,
        other => panic!("corrupt encoding: tag {} at offset {}", other, offset),
    }
}

pub(crate) fn len(bytes: &[u8], offset: usize) -> usize {
    match tag(bytes, offset) {
        TAG_STRING | TAG_ARRAY | TAG_OBJECT => read_u32(bytes, offset + 1),
        _ => 0,
    }
}

pub(crate) fn as_bool(bytes: &[u8], offset: usize) -> Option<bool> {
    match tag(bytes, offset) {
        TAG_FALSE => Some(false),
        TAG_TRUE => Some(true),
        _ => None,
    }
}

pub(crate) fn as_integer(bytes: &[u8], offset: usize) -> Option<i64> {
    (tag(bytes, offset) == TAG_INTEGER).then(|| read_u64(bytes, offset + 1) as i64)
}

pub(crate) fn as_decimal(bytes: &[u8], offset: usize) -> Option<f64> {
    (tag(bytes, offset) == TAG_DECIMAL).then(|| f64::from_bits(read_u64(bytes, offset + 1)))
}

pub(crate) fn as_str(bytes: &[u8], offset: usize) -> Option<&str> {
    if tag(bytes, offset) != TAG_STRING {
        return None;
    }
    let len = read_u32(bytes, offset + 1);
    let start = offset + HEADER;
    std::str::from_utf8(&bytes[start..start + len]).ok()
}

pub(crate) fn array_element(bytes: &[u8], offset: usize, index: usize) -> Option<usize> {
    if tag(bytes, offset) != TAG_ARRAY || index >= read_u32(bytes, offset + 1) {
        return None;
    }
    Some(read_u32(bytes, offset + HEADER + index * 4))
}

/// Key and value offset of the `index`th entry, in key order
pub(crate) fn object_entry(bytes: &[u8], offset: usize, index: usize) -> Option<(&str, usize)> {
    if tag(bytes, offset) != TAG_OBJECT || index >= read_u32(bytes, offset + 1) {
        return None;
    }
    let slot = offset + HEADER + index * 8;
    let key = as_str(bytes, read_u32(bytes, slot))?;
    Some((key, read_u32(bytes, slot + 4)))
}

pub(crate) fn object_field(bytes: &[u8], offset: usize, key: &str) -> Option<usize> {
    if tag(bytes, offset) != TAG_OBJECT {
        return None;
    }
    let (mut lo, mut hi) = (0, read_u32(bytes, offset + 1));
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let (candidate, value_at) = object_entry(bytes, offset, mid)?;
        match candidate.as_bytes().cmp(key.as_bytes()) {
            Ordering::Less => lo = mid + 1,
            Ordering::Greater => hi = mid,
            Ordering::Equal => return Some(value_at),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Builder, Safe};

    #[test]
    fn test_scalar_layout() {
        let bytes = encode(Builder::<Safe>::from(42i64).as_value_ref());
        assert_eq!(bytes[0], TAG_INTEGER);
        assert_eq!(bytes.len(), 9);
        assert_eq!(as_integer(&bytes, 0), Some(42));

        let bytes = encode(Builder::<Safe>::from(true).as_value_ref());
        assert_eq!(&*bytes, &[TAG_TRUE]);
    }

    #[test]
    fn test_string_layout() {
        let bytes = encode(Builder::<Safe>::from("hey").as_value_ref());
        assert_eq!(&*bytes, &[TAG_STRING, 3, 0, 0, 0, b'h', b'e', b'y']);
        assert_eq!(as_str(&bytes, 0), Some("hey"));
        assert_eq!(len(&bytes, 0), 3);
    }

    #[test]
    fn test_object_lookup_is_sorted() {
        let mut obj = Builder::<Safe>::object();
        for key in ["zeta", "alpha", "mid", "beta"] {
            obj.insert(key, key.len() as i64).unwrap();
        }
        let bytes = encode(obj.as_value_ref());
        assert_eq!(value_type(&bytes, 0), ValueType::Object);
        assert_eq!(len(&bytes, 0), 4);

        let keys: Vec<&str> = (0..4)
            .map(|i| object_entry(&bytes, 0, i).unwrap().0)
            .collect();
        assert_eq!(keys, vec!["alpha", "beta", "mid", "zeta"]);

        let at = object_field(&bytes, 0, "mid").unwrap();
        assert_eq!(as_integer(&bytes, at), Some(3));
        assert_eq!(object_field(&bytes, 0, "missing"), None);
    }

    #[test]
    fn test_array_elements() {
        let mut arr = Builder::<Safe>::array();
        arr.push(1i64).unwrap();
        arr.push(2.5).unwrap();
        arr.push(Builder::null()).unwrap();
        let bytes = encode(arr.as_value_ref());

        let first = array_element(&bytes, 0, 0).unwrap();
        let second = array_element(&bytes, 0, 1).unwrap();
        let third = array_element(&bytes, 0, 2).unwrap();
        assert_eq!(as_integer(&bytes, first), Some(1));
        assert_eq!(as_decimal(&bytes, second), Some(2.5));
        assert_eq!(value_type(&bytes, third), ValueType::Null);
        assert_eq!(array_element(&bytes, 0, 3), None);
    }

    #[test]
    fn test_reads_on_wrong_tag() {
        let bytes = encode(Builder::<Safe>::from("text").as_value_ref());
        assert_eq!(as_integer(&bytes, 0), None);
        assert_eq!(as_bool(&bytes, 0), None);
        assert_eq!(array_element(&bytes, 0, 0), None);
        assert_eq!(object_field(&bytes, 0, "a"), None);
    }

    #[test]
    fn test_u32_boundary() {
        assert_eq!(checked_u32(0), 0);
        assert_eq!(checked_u32(u32::MAX as usize), u32::MAX);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    #[should_panic(expected = "4 GiB offset range")]
    fn test_count_past_u32_is_rejected() {
        checked_u32(u32::MAX as usize + 1);
    }
}
