//! JSON interop through serde
//!
//! Integers stay integers and decimals stay decimals in both directions:
//! `1` parses to an integer and `1.0` to a decimal. Unsigned numbers above
//! `i64::MAX` become decimals.

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Map, Number, Value};

use crate::buffer::Buffer;
use crate::builder::Builder;
use crate::hybrid::Hybrid;
use crate::kind::ValueType;
use crate::payload::{Node, RawValue};
use crate::rc::RcPolicy;
use crate::value_ref::ValueRef;

impl<P: RcPolicy> Builder<P> {
    /// Build a tree from a parsed JSON value
    pub fn from_json(value: &Value) -> Self {
        Builder(RawValue::from_node(node_from_json(value)))
    }

    /// Parse JSON text into a tree
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_json(&value))
    }
}

fn node_from_json<P: RcPolicy>(value: &Value) -> Node<P> {
    match value {
        Value::Null => Node::Null,
        Value::Bool(b) => Node::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Node::Integer(i),
            None => Node::Decimal(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => Node::String(s.clone()),
        Value::Array(items) => Node::Array(
            items
                .iter()
                .map(|item| RawValue::from_node(node_from_json(item)))
                .collect(),
        ),
        Value::Object(fields) => Node::Object(
            fields
                .iter()
                .map(|(key, item)| (key.clone(), RawValue::from_node(node_from_json(item))))
                .collect(),
        ),
    }
}

/// Convert any readable value into a `serde_json::Value`.
///
/// Non-finite decimals have no JSON form and become `null`.
pub(crate) fn to_json<P: RcPolicy>(value: ValueRef<'_, P>) -> Value {
    match value.value_type() {
        ValueType::Null => Value::Null,
        ValueType::Boolean => Value::Bool(value.as_bool().unwrap_or_default()),
        ValueType::Integer => Value::Number(value.as_integer().unwrap_or_default().into()),
        ValueType::Decimal => value
            .as_decimal()
            .and_then(Number::from_f64)
            .map_or(Value::Null, Value::Number),
        ValueType::String => Value::String(value.as_str().unwrap_or_default().to_string()),
        ValueType::Array => Value::Array(value.elements().map(to_json).collect()),
        ValueType::Object => Value::Object(
            value
                .entries()
                .map(|(key, child)| (key.to_string(), to_json(child)))
                .collect::<Map<String, Value>>(),
        ),
    }
}

struct Ser<'a, P: RcPolicy>(ValueRef<'a, P>);

impl<P: RcPolicy> Serialize for Ser<'_, P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        match value.value_type() {
            ValueType::Null => serializer.serialize_unit(),
            ValueType::Boolean => serializer.serialize_bool(value.as_bool().unwrap_or_default()),
            ValueType::Integer => serializer.serialize_i64(value.as_integer().unwrap_or_default()),
            ValueType::Decimal => serializer.serialize_f64(value.as_decimal().unwrap_or_default()),
            ValueType::String => serializer.serialize_str(value.as_str().unwrap_or_default()),
            ValueType::Array => {
                let mut seq = serializer.serialize_seq(Some(value.len()))?;
                for child in value.elements() {
                    seq.serialize_element(&Ser(child))?;
                }
                seq.end()
            }
            ValueType::Object => {
                let mut map = serializer.serialize_map(Some(value.len()))?;
                for (key, child) in value.entries() {
                    map.serialize_entry(key, &Ser(child))?;
                }
                map.end()
            }
        }
    }
}

macro_rules! impl_json_out {
    ($($ty:ident),*) => {
        $(
            impl<P: RcPolicy> $ty<P> {
                /// Convert into a `serde_json::Value`
                pub fn to_json(&self) -> Value {
                    to_json(self.as_value_ref())
                }
            }

            impl<P: RcPolicy> Serialize for $ty<P> {
                fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                    Ser(self.as_value_ref()).serialize(serializer)
                }
            }
        )*
    };
}

impl_json_out!(Builder, Buffer, Hybrid);

impl<'de, P: RcPolicy> Deserialize<'de> for Builder<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Builder::from_json(&value))
    }
}

impl<'de, P: RcPolicy> Deserialize<'de> for Hybrid<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Builder::<P>::deserialize(deserializer).map(Hybrid::from)
    }
}
