//! Copy-on-write values that switch form lazily
//!
//! A hybrid holds either a tree or a finalized encoding. Mutating a finalized
//! hybrid first decodes it into a private tree; other owners of the encoding
//! keep seeing the old bytes. `finalize` goes the other way in place.

use crate::buffer::Buffer;
use crate::builder::{self, Builder};
use crate::error::EngineError;
use crate::kind::StructuralKind;
use crate::payload::RawValue;
use crate::rc::RcPolicy;
use crate::wrapper::impl_wrapper;

/// Copy-on-write value holding either form
#[repr(transparent)]
pub struct Hybrid<P: RcPolicy>(pub(crate) RawValue<P>);

impl_wrapper!(Hybrid, StructuralKind::Hybrid);

impl<P: RcPolicy> Default for Hybrid<P> {
    fn default() -> Self {
        Hybrid(RawValue::null())
    }
}

impl<P: RcPolicy> Hybrid<P> {
    fn promote(&mut self) {
        if self.0.is_finalized() {
            self.0 = self.0.definalized();
        }
    }

    /// Set a field, returning the value it replaced
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Builder<P>>,
    ) -> Result<Option<Hybrid<P>>, EngineError> {
        self.promote();
        builder::insert_field(&mut self.0, key.into(), value.into().0).map(|old| old.map(Hybrid))
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<Hybrid<P>>, EngineError> {
        if self.0.get(key).is_none() {
            // nothing to remove, so nothing to promote; still report type errors
            if !self.is_object() {
                return Err(EngineError::NotAnObject(self.value_type()));
            }
            return Ok(None);
        }
        self.promote();
        builder::remove_field(&mut self.0, key).map(|old| old.map(Hybrid))
    }

    pub fn push(&mut self, value: impl Into<Builder<P>>) -> Result<(), EngineError> {
        self.promote();
        builder::push_element(&mut self.0, value.into().0)
    }

    pub fn set(
        &mut self,
        index: usize,
        value: impl Into<Builder<P>>,
    ) -> Result<Hybrid<P>, EngineError> {
        self.promote();
        builder::set_element(&mut self.0, index, value.into().0).map(Hybrid)
    }

    /// Switch to the finalized form in place
    pub fn finalize(&mut self) {
        if !self.0.is_finalized() {
            self.0 = self.0.finalized();
        }
    }

    /// Tree form; shares the payload when it already is one
    pub fn into_builder(self) -> Builder<P> {
        Builder(self.0.definalized())
    }

    /// Finalized form; shares the payload when it already is one
    pub fn into_buffer(self) -> Buffer<P> {
        Buffer(self.0.finalized())
    }
}

impl<P: RcPolicy> From<Builder<P>> for Hybrid<P> {
    fn from(builder: Builder<P>) -> Self {
        Hybrid(builder.0)
    }
}

impl<P: RcPolicy> From<Buffer<P>> for Hybrid<P> {
    fn from(buffer: Buffer<P>) -> Self {
        Hybrid(buffer.0)
    }
}
