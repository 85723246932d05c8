//! Borrowed reads over either payload form
//!
//! `ValueRef` never touches the shared count, which keeps comparisons,
//! formatting and encoding from disturbing the counts that tests observe.

use std::collections::btree_map;
use std::slice;

use crate::encoding;
use crate::kind::ValueType;
use crate::payload::{Node, RawValue};
use crate::rc::RcPolicy;

/// A borrowed view of a value, wherever it lives
pub struct ValueRef<'a, P: RcPolicy>(Repr<'a, P>);

enum Repr<'a, P: RcPolicy> {
    Node(&'a Node<P>),
    Encoded { bytes: &'a [u8], offset: usize },
}

impl<P: RcPolicy> Clone for ValueRef<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: RcPolicy> Copy for ValueRef<'_, P> {}

impl<P: RcPolicy> Clone for Repr<'_, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: RcPolicy> Copy for Repr<'_, P> {}

impl<'a, P: RcPolicy> ValueRef<'a, P> {
    pub(crate) fn node(node: &'a Node<P>) -> Self {
        ValueRef(Repr::Node(node))
    }

    pub(crate) fn encoded(bytes: &'a [u8], offset: usize) -> Self {
        ValueRef(Repr::Encoded { bytes, offset })
    }

    pub(crate) fn as_node(self) -> Option<&'a Node<P>> {
        match self.0 {
            Repr::Node(node) => Some(node),
            Repr::Encoded { .. } => None,
        }
    }

    /// Whether this view reads from a finalized encoding
    pub fn is_encoded(self) -> bool {
        matches!(self.0, Repr::Encoded { .. })
    }

    pub fn value_type(self) -> ValueType {
        match self.0 {
            Repr::Node(node) => match node {
                Node::Null => ValueType::Null,
                Node::Boolean(_) => ValueType::Boolean,
                Node::Integer(_) => ValueType::Integer,
                Node::Decimal(_) => ValueType::Decimal,
                Node::String(_) => ValueType::String,
                Node::Array(_) => ValueType::Array,
                Node::Object(_) => ValueType::Object,
            },
            Repr::Encoded { bytes, offset } => encoding::value_type(bytes, offset),
        }
    }

    /// Number of fields, elements or string bytes; 0 for scalars
    pub fn len(self) -> usize {
        match self.0 {
            Repr::Node(node) => match node {
                Node::String(s) => s.len(),
                Node::Array(items) => items.len(),
                Node::Object(fields) => fields.len(),
                _ => 0,
            },
            Repr::Encoded { bytes, offset } => encoding::len(bytes, offset),
        }
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    pub fn as_bool(self) -> Option<bool> {
        match self.0 {
            Repr::Node(Node::Boolean(b)) => Some(*b),
            Repr::Node(_) => None,
            Repr::Encoded { bytes, offset } => encoding::as_bool(bytes, offset),
        }
    }

    pub fn as_integer(self) -> Option<i64> {
        match self.0 {
            Repr::Node(Node::Integer(n)) => Some(*n),
            Repr::Node(_) => None,
            Repr::Encoded { bytes, offset } => encoding::as_integer(bytes, offset),
        }
    }

    pub fn as_decimal(self) -> Option<f64> {
        match self.0 {
            Repr::Node(Node::Decimal(d)) => Some(*d),
            Repr::Node(_) => None,
            Repr::Encoded { bytes, offset } => encoding::as_decimal(bytes, offset),
        }
    }

    pub fn as_str(self) -> Option<&'a str> {
        match self.0 {
            Repr::Node(Node::String(s)) => Some(s.as_str()),
            Repr::Node(_) => None,
            Repr::Encoded { bytes, offset } => encoding::as_str(bytes, offset),
        }
    }

    /// Field lookup
    pub fn field(self, key: &str) -> Option<ValueRef<'a, P>> {
        match self.0 {
            Repr::Node(Node::Object(fields)) => fields.get(key).map(RawValue::as_value_ref),
            Repr::Node(_) => None,
            Repr::Encoded { bytes, offset } => {
                encoding::object_field(bytes, offset, key).map(|at| Self::encoded(bytes, at))
            }
        }
    }

    /// Element lookup
    pub fn element(self, index: usize) -> Option<ValueRef<'a, P>> {
        match self.0 {
            Repr::Node(Node::Array(items)) => items.get(index).map(RawValue::as_value_ref),
            Repr::Node(_) => None,
            Repr::Encoded { bytes, offset } => {
                encoding::array_element(bytes, offset, index).map(|at| Self::encoded(bytes, at))
            }
        }
    }

    /// Array elements in order (empty for non-arrays)
    pub fn elements(self) -> Elements<'a, P> {
        match self.0 {
            Repr::Node(Node::Array(items)) => Elements::Node(items.iter()),
            Repr::Encoded { bytes, offset }
                if encoding::value_type(bytes, offset) == ValueType::Array =>
            {
                Elements::Encoded {
                    bytes,
                    offset,
                    next: 0,
                    count: encoding::len(bytes, offset),
                }
            }
            _ => Elements::Empty,
        }
    }

    /// Object entries in key order (empty for non-objects)
    pub fn entries(self) -> Entries<'a, P> {
        match self.0 {
            Repr::Node(Node::Object(fields)) => Entries::Node(fields.iter()),
            Repr::Encoded { bytes, offset }
                if encoding::value_type(bytes, offset) == ValueType::Object =>
            {
                Entries::Encoded {
                    bytes,
                    offset,
                    next: 0,
                    count: encoding::len(bytes, offset),
                }
            }
            _ => Entries::Empty,
        }
    }

    /// Deep structural equality.
    ///
    /// Integers and decimals are different types: `1` is not equal to `1.0`.
    /// Decimals compare by bit pattern, so a NaN equals the same NaN and
    /// `0.0` is not equal to `-0.0`. This keeps equality reflexive across
    /// handle round trips.
    pub fn deep_eq(self, other: ValueRef<'_, P>) -> bool {
        let ty = self.value_type();
        if ty != other.value_type() {
            return false;
        }
        match ty {
            ValueType::Null => true,
            ValueType::Boolean => self.as_bool() == other.as_bool(),
            ValueType::Integer => self.as_integer() == other.as_integer(),
            ValueType::Decimal => {
                self.as_decimal().map(f64::to_bits) == other.as_decimal().map(f64::to_bits)
            }
            ValueType::String => self.as_str() == other.as_str(),
            ValueType::Array => {
                self.len() == other.len()
                    && self
                        .elements()
                        .zip(other.elements())
                        .all(|(a, b)| a.deep_eq(b))
            }
            ValueType::Object => {
                self.len() == other.len()
                    && self
                        .entries()
                        .zip(other.entries())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.deep_eq(vb))
            }
        }
    }
}

/// Iterator over array elements
pub enum Elements<'a, P: RcPolicy> {
    Node(slice::Iter<'a, RawValue<P>>),
    Encoded {
        bytes: &'a [u8],
        offset: usize,
        next: usize,
        count: usize,
    },
    Empty,
}

impl<'a, P: RcPolicy> Iterator for Elements<'a, P> {
    type Item = ValueRef<'a, P>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Elements::Node(iter) => iter.next().map(RawValue::as_value_ref),
            Elements::Encoded {
                bytes,
                offset,
                next,
                count,
            } => {
                if *next >= *count {
                    return None;
                }
                let bytes: &'a [u8] = *bytes;
                let at = encoding::array_element(bytes, *offset, *next)?;
                *next += 1;
                Some(ValueRef::encoded(bytes, at))
            }
            Elements::Empty => None,
        }
    }
}

/// Iterator over object entries
pub enum Entries<'a, P: RcPolicy> {
    Node(btree_map::Iter<'a, String, RawValue<P>>),
    Encoded {
        bytes: &'a [u8],
        offset: usize,
        next: usize,
        count: usize,
    },
    Empty,
}

impl<'a, P: RcPolicy> Iterator for Entries<'a, P> {
    type Item = (&'a str, ValueRef<'a, P>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Entries::Node(iter) => iter
                .next()
                .map(|(key, value)| (key.as_str(), value.as_value_ref())),
            Entries::Encoded {
                bytes,
                offset,
                next,
                count,
            } => {
                if *next >= *count {
                    return None;
                }
                let bytes: &'a [u8] = *bytes;
                let (key, at) = encoding::object_entry(bytes, *offset, *next)?;
                *next += 1;
                Some((key, ValueRef::encoded(bytes, at)))
            }
            Entries::Empty => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Builder, Safe, ValueType};

    #[test]
    fn test_reads_agree_across_forms() {
        let mut obj = Builder::<Safe>::object();
        let mut list = Builder::array();
        list.push(1i64).unwrap();
        list.push("b").unwrap();
        obj.insert("list", list).unwrap();
        obj.insert("flag", true).unwrap();
        let buf = obj.finalize();

        for view in [obj.as_value_ref(), buf.as_value_ref()] {
            assert_eq!(view.value_type(), ValueType::Object);
            let list = view.field("list").unwrap();
            assert_eq!(list.len(), 2);
            assert_eq!(list.element(1).unwrap().as_str(), Some("b"));
            assert!(list.element(2).is_none());
            assert_eq!(view.field("flag").unwrap().as_bool(), Some(true));
            let keys: Vec<&str> = view.entries().map(|(k, _)| k).collect();
            assert_eq!(keys, ["flag", "list"]);
        }
        assert!(!obj.as_value_ref().is_encoded());
        assert!(buf.as_value_ref().is_encoded());
    }

    #[test]
    #[cfg(feature = "json")]
    fn test_reads_do_not_touch_counts() {
        let obj = Builder::<Safe>::parse(r#"{"a":[1,2,3]}"#).unwrap();
        let view = obj.as_value_ref();
        let total: i64 = view
            .field("a")
            .unwrap()
            .elements()
            .filter_map(|v| v.as_integer())
            .sum();
        assert_eq!(total, 6);
        assert_eq!(obj.refcount(), 1);
        assert_eq!(obj.get("a").unwrap().refcount(), 2);
    }

    #[test]
    fn test_integer_is_not_decimal() {
        let one = Builder::<Safe>::from(1i64);
        let one_point_zero = Builder::<Safe>::from(1.0);
        assert!(!one.as_value_ref().deep_eq(one_point_zero.as_value_ref()));
        assert_eq!(one.as_decimal(), None);
    }

    #[test]
    fn test_decimal_equality_is_bitwise() {
        let nan = Builder::<Safe>::from(f64::NAN);
        let copy = nan.clone();
        assert!(nan.as_value_ref().deep_eq(copy.as_value_ref()));
        let encoded = nan.finalize();
        assert!(nan.as_value_ref().deep_eq(encoded.as_value_ref()));

        let mut list = Builder::<Safe>::array();
        list.push(f64::NAN).unwrap();
        assert!(list.as_value_ref().deep_eq(list.finalize().as_value_ref()));

        let zero = Builder::<Safe>::from(0.0);
        let neg_zero = Builder::<Safe>::from(-0.0);
        assert!(!zero.as_value_ref().deep_eq(neg_zero.as_value_ref()));
    }
}
