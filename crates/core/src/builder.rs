//! Mutable tree values
//!
//! A builder owns a tree of nodes. Mutation is in place when the builder is
//! the only owner of its node; otherwise that one node is cloned first and
//! its children stay shared with the other owners.

use crate::buffer::Buffer;
use crate::error::EngineError;
use crate::hybrid::Hybrid;
use crate::kind::{StructuralKind, ValueType};
use crate::payload::{Node, RawValue};
use crate::rc::RcPolicy;
use crate::wrapper::impl_wrapper;

/// Mutable tree value
#[repr(transparent)]
pub struct Builder<P: RcPolicy>(pub(crate) RawValue<P>);

impl_wrapper!(Builder, StructuralKind::Builder);

impl<P: RcPolicy> Default for Builder<P> {
    fn default() -> Self {
        Builder::null()
    }
}

impl<P: RcPolicy> Builder<P> {
    pub fn null() -> Self {
        Builder(RawValue::null())
    }

    /// Empty object
    pub fn object() -> Self {
        Builder(RawValue::from_node(Node::Object(Default::default())))
    }

    /// Empty array
    pub fn array() -> Self {
        Builder(RawValue::from_node(Node::Array(Vec::new())))
    }

    /// Set a field, returning the value it replaced
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Builder<P>>,
    ) -> Result<Option<Builder<P>>, EngineError> {
        insert_field(&mut self.0, key.into(), value.into().0).map(|old| old.map(Builder))
    }

    /// Remove a field, returning its value
    pub fn remove(&mut self, key: &str) -> Result<Option<Builder<P>>, EngineError> {
        remove_field(&mut self.0, key).map(|old| old.map(Builder))
    }

    /// Append an element
    pub fn push(&mut self, value: impl Into<Builder<P>>) -> Result<(), EngineError> {
        push_element(&mut self.0, value.into().0)
    }

    /// Replace an element, returning the old one
    pub fn set(
        &mut self,
        index: usize,
        value: impl Into<Builder<P>>,
    ) -> Result<Builder<P>, EngineError> {
        set_element(&mut self.0, index, value.into().0).map(Builder)
    }

    /// Encode into a fresh finalized buffer; the builder is left as it was
    pub fn finalize(&self) -> Buffer<P> {
        Buffer(self.0.finalized())
    }
}

// =============================================================================
// Mutation helpers shared with Hybrid
// =============================================================================

/// Check the target before detaching it: a finalized payload is reported as
/// such even when it also has the wrong type.
fn target<P: RcPolicy>(
    raw: &mut RawValue<P>,
    expected: ValueType,
) -> Result<&mut Node<P>, EngineError> {
    if raw.is_finalized() {
        return Err(EngineError::FinalizedPayload);
    }
    let found = raw.value_type();
    if found != expected {
        return Err(match expected {
            ValueType::Array => EngineError::NotAnArray(found),
            _ => EngineError::NotAnObject(found),
        });
    }
    raw.node_mut().ok_or(EngineError::FinalizedPayload)
}

pub(crate) fn insert_field<P: RcPolicy>(
    raw: &mut RawValue<P>,
    key: String,
    value: RawValue<P>,
) -> Result<Option<RawValue<P>>, EngineError> {
    match target(raw, ValueType::Object)? {
        Node::Object(fields) => Ok(fields.insert(key, value)),
        other => Err(EngineError::NotAnObject(other.value_type())),
    }
}

pub(crate) fn remove_field<P: RcPolicy>(
    raw: &mut RawValue<P>,
    key: &str,
) -> Result<Option<RawValue<P>>, EngineError> {
    // a miss must not detach a shared node
    if !raw.is_finalized() && raw.value_type() == ValueType::Object && raw.get(key).is_none() {
        return Ok(None);
    }
    match target(raw, ValueType::Object)? {
        Node::Object(fields) => Ok(fields.remove(key)),
        other => Err(EngineError::NotAnObject(other.value_type())),
    }
}

pub(crate) fn push_element<P: RcPolicy>(
    raw: &mut RawValue<P>,
    value: RawValue<P>,
) -> Result<(), EngineError> {
    match target(raw, ValueType::Array)? {
        Node::Array(items) => {
            items.push(value);
            Ok(())
        }
        other => Err(EngineError::NotAnArray(other.value_type())),
    }
}

pub(crate) fn set_element<P: RcPolicy>(
    raw: &mut RawValue<P>,
    index: usize,
    value: RawValue<P>,
) -> Result<RawValue<P>, EngineError> {
    let len = raw.as_value_ref().len();
    match target(raw, ValueType::Array)? {
        Node::Array(items) => match items.get_mut(index) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(EngineError::IndexOutOfBounds { index, len }),
        },
        other => Err(EngineError::NotAnArray(other.value_type())),
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl<P: RcPolicy> From<bool> for Builder<P> {
    fn from(b: bool) -> Self {
        Builder(RawValue::from_node(Node::Boolean(b)))
    }
}

impl<P: RcPolicy> From<i64> for Builder<P> {
    fn from(n: i64) -> Self {
        Builder(RawValue::from_node(Node::Integer(n)))
    }
}

impl<P: RcPolicy> From<i32> for Builder<P> {
    fn from(n: i32) -> Self {
        Builder::from(i64::from(n))
    }
}

impl<P: RcPolicy> From<f64> for Builder<P> {
    fn from(d: f64) -> Self {
        Builder(RawValue::from_node(Node::Decimal(d)))
    }
}

impl<P: RcPolicy> From<&str> for Builder<P> {
    fn from(s: &str) -> Self {
        Builder(RawValue::from_node(Node::String(s.to_string())))
    }
}

impl<P: RcPolicy> From<String> for Builder<P> {
    fn from(s: String) -> Self {
        Builder(RawValue::from_node(Node::String(s)))
    }
}

/// Decodes the buffer into a fresh tree
impl<P: RcPolicy> From<Buffer<P>> for Builder<P> {
    fn from(buffer: Buffer<P>) -> Self {
        buffer.definalize()
    }
}

impl<P: RcPolicy> From<Hybrid<P>> for Builder<P> {
    fn from(hybrid: Hybrid<P>) -> Self {
        hybrid.into_builder()
    }
}
