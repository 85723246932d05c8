//! The shared payload behind every wrapper
//!
//! ```text
//! RawValue<P>  (16 bytes on 64-bit targets)
//! ┌──────────────────────────┬──────────────┐
//! │ shared: P::Ptr<Payload>  │ offset: usize│
//! └────────────┬─────────────┴──────────────┘
//!              │
//!              ▼
//!   count ─ Payload::Tree(Node)          offset unused (0)
//!        └─ Payload::Encoded(Box<[u8]>)  offset = start of the sub-value
//! ```
//!
//! A child of a finalized encoding shares the parent's pointer and only moves
//! the offset, so navigating a buffer never duplicates encoded bytes.
//! A child of a tree is its own `RawValue` stored in the parent node.

use std::collections::BTreeMap;

use crate::encoding;
use crate::kind::ValueType;
use crate::rc::RcPolicy;
use crate::value_ref::ValueRef;

/// Tree node of a builder value
pub(crate) enum Node<P: RcPolicy> {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<RawValue<P>>),
    Object(BTreeMap<String, RawValue<P>>),
}

impl<P: RcPolicy> Clone for Node<P> {
    fn clone(&self) -> Self {
        match self {
            Node::Null => Node::Null,
            Node::Boolean(b) => Node::Boolean(*b),
            Node::Integer(n) => Node::Integer(*n),
            Node::Decimal(d) => Node::Decimal(*d),
            Node::String(s) => Node::String(s.clone()),
            // children stay shared; only this level is duplicated
            Node::Array(items) => Node::Array(items.clone()),
            Node::Object(fields) => Node::Object(fields.clone()),
        }
    }
}

impl<P: RcPolicy> Node<P> {
    pub(crate) fn value_type(&self) -> ValueType {
        ValueRef::node(self).value_type()
    }
}

/// What the shared pointer owns
pub(crate) enum Payload<P: RcPolicy> {
    Tree(Node<P>),
    Encoded(Box<[u8]>),
}

impl<P: RcPolicy> Clone for Payload<P> {
    fn clone(&self) -> Self {
        match self {
            Payload::Tree(node) => Payload::Tree(node.clone()),
            Payload::Encoded(bytes) => Payload::Encoded(bytes.clone()),
        }
    }
}

/// The single reference-counted value representation.
///
/// All three wrappers ([`Builder`](crate::Builder), [`Buffer`](crate::Buffer),
/// [`Hybrid`](crate::Hybrid)) are `#[repr(transparent)]` over this type, so
/// under a given policy they share one memory layout. That is the layout
/// contract the handle layer relies on (see [`Wrapper`](crate::Wrapper)).
pub struct RawValue<P: RcPolicy> {
    shared: P::Ptr<Payload<P>>,
    offset: usize,
}

impl<P: RcPolicy> Clone for RawValue<P> {
    #[inline]
    fn clone(&self) -> Self {
        RawValue {
            shared: self.shared.clone(),
            offset: self.offset,
        }
    }
}

impl<P: RcPolicy> RawValue<P> {
    pub(crate) fn from_node(node: Node<P>) -> Self {
        RawValue {
            shared: P::new(Payload::Tree(node)),
            offset: 0,
        }
    }

    pub(crate) fn from_encoding(bytes: Box<[u8]>) -> Self {
        RawValue {
            shared: P::new(Payload::Encoded(bytes)),
            offset: 0,
        }
    }

    pub(crate) fn null() -> Self {
        Self::from_node(Node::Null)
    }

    /// Strong count of the shared payload
    #[inline]
    pub fn refcount(&self) -> usize {
        P::strong_count(&self.shared)
    }

    /// Whether the payload is a finalized encoding
    #[inline]
    pub fn is_finalized(&self) -> bool {
        matches!(&*self.shared, Payload::Encoded(_))
    }

    /// Whether both values point at the same sub-value of the same allocation
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        P::ptr_eq(&self.shared, &other.shared) && self.offset == other.offset
    }

    /// Offset of this value inside its encoding (0 for trees)
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Borrowed, count-neutral view for reads
    #[inline]
    pub fn as_value_ref(&self) -> ValueRef<'_, P> {
        match &*self.shared {
            Payload::Tree(node) => ValueRef::node(node),
            Payload::Encoded(bytes) => ValueRef::encoded(bytes, self.offset),
        }
    }

    /// The complete encoding this value points into, if finalized
    pub(crate) fn encoded_bytes(&self) -> Option<&[u8]> {
        match &*self.shared {
            Payload::Encoded(bytes) => Some(bytes),
            Payload::Tree(_) => None,
        }
    }

    pub(crate) fn value_type(&self) -> ValueType {
        self.as_value_ref().value_type()
    }

    /// Field lookup producing a value that shares this payload
    pub(crate) fn get(&self, key: &str) -> Option<Self> {
        match &*self.shared {
            Payload::Tree(Node::Object(fields)) => fields.get(key).cloned(),
            Payload::Tree(_) => None,
            Payload::Encoded(bytes) => {
                encoding::object_field(bytes, self.offset, key).map(|offset| RawValue {
                    shared: self.shared.clone(),
                    offset,
                })
            }
        }
    }

    /// Element lookup producing a value that shares this payload
    pub(crate) fn at(&self, index: usize) -> Option<Self> {
        match &*self.shared {
            Payload::Tree(Node::Array(items)) => items.get(index).cloned(),
            Payload::Tree(_) => None,
            Payload::Encoded(bytes) => {
                encoding::array_element(bytes, self.offset, index).map(|offset| RawValue {
                    shared: self.shared.clone(),
                    offset,
                })
            }
        }
    }

    /// Mutable access to the tree node, detaching it from other owners first.
    ///
    /// Returns `None` for a finalized payload without copying it.
    pub(crate) fn node_mut(&mut self) -> Option<&mut Node<P>> {
        if self.is_finalized() {
            return None;
        }
        match P::make_mut(&mut self.shared) {
            Payload::Tree(node) => Some(node),
            Payload::Encoded(_) => None,
        }
    }

    /// Encode into a fresh finalized payload
    pub(crate) fn finalized(&self) -> Self {
        if self.is_finalized() && self.offset == 0 {
            return self.clone();
        }
        Self::from_encoding(encoding::encode(self.as_value_ref()))
    }

    /// Decode into a fresh tree (deep: every descendant becomes a tree too)
    pub(crate) fn definalized(&self) -> Self {
        if !self.is_finalized() {
            return self.clone();
        }
        Self::from_node(tree_from_ref(self.as_value_ref()))
    }
}

/// Build a tree node out of any readable value
pub(crate) fn tree_from_ref<P: RcPolicy>(value: ValueRef<'_, P>) -> Node<P> {
    if let Some(node) = value.as_node()
        && !matches!(node, Node::Array(_) | Node::Object(_))
    {
        return node.clone();
    }
    match value.value_type() {
        ValueType::Null => Node::Null,
        ValueType::Boolean => Node::Boolean(value.as_bool().unwrap_or_default()),
        ValueType::Integer => Node::Integer(value.as_integer().unwrap_or_default()),
        ValueType::Decimal => Node::Decimal(value.as_decimal().unwrap_or_default()),
        ValueType::String => Node::String(value.as_str().unwrap_or_default().to_string()),
        ValueType::Array => Node::Array(
            value
                .elements()
                .map(|child| RawValue::from_node(tree_from_ref(child)))
                .collect(),
        ),
        ValueType::Object => Node::Object(
            value
                .entries()
                .map(|(key, child)| (key.to_string(), RawValue::from_node(tree_from_ref(child))))
                .collect(),
        ),
    }
}
