//! FlexValue: the closed tagged union stored in document content
//!
//! The variant order is part of the wire contract. Both the JSON form
//! `["<variant>", <value>]` and the binary form `[varuint32 discriminant][payload]`
//! resolve tags through [`VARIANTS`]; new variants may only be appended.

use super::types::{Asset, Checksum256, Name, TimePoint};
use crate::error::{DocGraphError, DocGraphResult};
use serde::de::Error as _;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::fmt;

/// One entry of the variant table
#[derive(Debug)]
pub struct VariantDef {
    /// Canonical wire name
    pub name: &'static str,
    /// Names accepted when decoding
    pub aliases: &'static [&'static str],
    /// Zero value of the variant; decoding dispatches on its shape
    pub zero: fn() -> FlexValue,
}

/// Variant registry, indexed by discriminant
pub static VARIANTS: [VariantDef; 7] = [
    VariantDef { name: "monostate", aliases: &[], zero: || FlexValue::Monostate },
    VariantDef { name: "name", aliases: &[], zero: || FlexValue::Name(Name::default()) },
    VariantDef { name: "string", aliases: &[], zero: || FlexValue::String(String::new()) },
    VariantDef { name: "asset", aliases: &[], zero: || FlexValue::Asset(Asset::default()) },
    VariantDef { name: "time_point", aliases: &["timestamp"], zero: || FlexValue::TimePoint(TimePoint::default()) },
    VariantDef { name: "int64", aliases: &[], zero: || FlexValue::Int64(0) },
    VariantDef { name: "checksum256", aliases: &["hash256"], zero: || FlexValue::Checksum256(Checksum256::default()) },
];

/// A value of content: exactly one discriminant and one payload
#[derive(Debug, Clone)]
pub enum FlexValue {
    Monostate,
    Name(Name),
    String(String),
    Asset(Asset),
    TimePoint(TimePoint),
    Int64(i64),
    Checksum256(Checksum256),
}

impl FlexValue {
    /// Position of this variant in [`VARIANTS`]
    pub fn discriminant(&self) -> u32 {
        match self {
            FlexValue::Monostate => 0,
            FlexValue::Name(_) => 1,
            FlexValue::String(_) => 2,
            FlexValue::Asset(_) => 3,
            FlexValue::TimePoint(_) => 4,
            FlexValue::Int64(_) => 5,
            FlexValue::Checksum256(_) => 6,
        }
    }

    pub fn type_name(&self) -> &'static str {
        VARIANTS[self.discriminant() as usize].name
    }

    /// Look up a variant by discriminant
    pub fn variant(discriminant: u32) -> DocGraphResult<&'static VariantDef> {
        VARIANTS
            .get(discriminant as usize)
            .ok_or_else(|| DocGraphError::UnknownVariant(discriminant.to_string()))
    }

    /// Look up a variant discriminant by wire name or alias
    pub fn variant_by_name(name: &str) -> DocGraphResult<u32> {
        VARIANTS
            .iter()
            .position(|v| v.name == name || v.aliases.contains(&name))
            .map(|i| i as u32)
            .ok_or_else(|| DocGraphError::UnknownVariant(name.to_string()))
    }

    /// Equal when discriminants match and the string projections match
    pub fn is_equal(&self, other: &FlexValue) -> bool {
        self.discriminant() == other.discriminant() && self.to_string() == other.to_string()
    }

    fn invalid_type(&self, expected: &'static str) -> DocGraphError {
        DocGraphError::InvalidType {
            value: self.to_string(),
            expected,
            found: self.type_name(),
        }
    }

    /// Names may also be stored as plain strings
    pub fn as_name(&self) -> DocGraphResult<Name> {
        match self {
            FlexValue::Name(name) => Ok(name.clone()),
            FlexValue::String(text) => Name::new(text.as_str()).map_err(|_| self.invalid_type("name")),
            _ => Err(self.invalid_type("name")),
        }
    }

    pub fn as_str(&self) -> DocGraphResult<&str> {
        match self {
            FlexValue::String(text) => Ok(text),
            _ => Err(self.invalid_type("string")),
        }
    }

    pub fn as_asset(&self) -> DocGraphResult<&Asset> {
        match self {
            FlexValue::Asset(asset) => Ok(asset),
            _ => Err(self.invalid_type("asset")),
        }
    }

    pub fn as_int64(&self) -> DocGraphResult<i64> {
        match self {
            FlexValue::Int64(v) => Ok(*v),
            _ => Err(self.invalid_type("int64")),
        }
    }

    pub fn as_time_point(&self) -> DocGraphResult<TimePoint> {
        match self {
            FlexValue::TimePoint(tp) => Ok(*tp),
            _ => Err(self.invalid_type("time_point")),
        }
    }

    pub fn as_checksum256(&self) -> DocGraphResult<Checksum256> {
        match self {
            FlexValue::Checksum256(hash) => Ok(*hash),
            _ => Err(self.invalid_type("checksum256")),
        }
    }

    /// JSON payload of this variant, without the tag
    pub fn payload_json(&self) -> JsonValue {
        match self {
            FlexValue::Monostate => JsonValue::Object(Default::default()),
            FlexValue::Name(name) => JsonValue::String(name.to_string()),
            FlexValue::String(text) => JsonValue::String(text.clone()),
            FlexValue::Asset(asset) => JsonValue::String(asset.to_string()),
            FlexValue::TimePoint(tp) => JsonValue::String(tp.to_string()),
            FlexValue::Int64(v) => JsonValue::from(*v),
            FlexValue::Checksum256(hash) => JsonValue::String(hash.to_string()),
        }
    }

    /// Decode a `[tag, payload]` pair
    pub fn from_tagged_json(tag: &str, payload: JsonValue) -> DocGraphResult<Self> {
        let discriminant = Self::variant_by_name(tag)?;
        let bad_payload = |payload: &JsonValue| {
            DocGraphError::Codec(format!("invalid {} payload: {}", tag, payload))
        };
        let value = match ((VARIANTS[discriminant as usize].zero)(), &payload) {
            (FlexValue::Monostate, JsonValue::Null) => FlexValue::Monostate,
            (FlexValue::Monostate, JsonValue::Object(fields)) if fields.is_empty() => FlexValue::Monostate,
            (FlexValue::Monostate, JsonValue::Number(_)) => FlexValue::Monostate,
            (FlexValue::Name(_), JsonValue::String(text)) => FlexValue::Name(text.parse()?),
            (FlexValue::String(_), JsonValue::String(text)) => FlexValue::String(text.clone()),
            (FlexValue::Asset(_), JsonValue::String(text)) => FlexValue::Asset(text.parse()?),
            (FlexValue::TimePoint(_), JsonValue::String(text)) => FlexValue::TimePoint(text.parse()?),
            (FlexValue::Int64(_), JsonValue::Number(n)) => {
                FlexValue::Int64(n.as_i64().ok_or_else(|| bad_payload(&payload))?)
            }
            // large int64 values may arrive quoted
            (FlexValue::Int64(_), JsonValue::String(text)) => {
                FlexValue::Int64(text.parse().map_err(|_| bad_payload(&payload))?)
            }
            (FlexValue::Checksum256(_), JsonValue::String(text)) => FlexValue::Checksum256(text.parse()?),
            _ => return Err(bad_payload(&payload)),
        };
        Ok(value)
    }
}

impl PartialEq for FlexValue {
    fn eq(&self, other: &Self) -> bool {
        self.is_equal(other)
    }
}

impl fmt::Display for FlexValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlexValue::Monostate => Ok(()),
            FlexValue::Name(name) => write!(f, "{}", name),
            FlexValue::String(text) => write!(f, "{}", text),
            FlexValue::Asset(asset) => write!(f, "{}", asset),
            FlexValue::TimePoint(tp) => write!(f, "{}", tp),
            FlexValue::Int64(v) => write!(f, "{}", v),
            FlexValue::Checksum256(hash) => write!(f, "{}", hash),
        }
    }
}

impl Serialize for FlexValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.type_name())?;
        tuple.serialize_element(&self.payload_json())?;
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for FlexValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (tag, payload): (String, JsonValue) = Deserialize::deserialize(deserializer)?;
        FlexValue::from_tagged_json(&tag, payload).map_err(D::Error::custom)
    }
}

// Convenience conversions
impl From<Name> for FlexValue {
    fn from(name: Name) -> Self {
        FlexValue::Name(name)
    }
}

impl From<String> for FlexValue {
    fn from(s: String) -> Self {
        FlexValue::String(s)
    }
}

impl From<&str> for FlexValue {
    fn from(s: &str) -> Self {
        FlexValue::String(s.to_string())
    }
}

impl From<i64> for FlexValue {
    fn from(v: i64) -> Self {
        FlexValue::Int64(v)
    }
}

impl From<Asset> for FlexValue {
    fn from(asset: Asset) -> Self {
        FlexValue::Asset(asset)
    }
}

impl From<TimePoint> for FlexValue {
    fn from(tp: TimePoint) -> Self {
        FlexValue::TimePoint(tp)
    }
}

impl From<Checksum256> for FlexValue {
    fn from(hash: Checksum256) -> Self {
        FlexValue::Checksum256(hash)
    }
}
