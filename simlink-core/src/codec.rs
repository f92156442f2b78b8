//! Wire representation of values.
//!
//! A [`Variant`] carries at most one [`VariantKind`]. One without any kind
//! set is not a valid value, and decoding it fails.

use linked_hash_map::LinkedHashMap;

use crate::error::{Error, Result};
use crate::var::{Var, VarMap};
use crate::Float;

/// Tagged union sent over the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub kind: Option<VariantKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariantKind {
    BoolValue(bool),
    NumberValue(Float),
    StringValue(String),
    ListValue(Vec<Variant>),
    StructValue(LinkedHashMap<String, Variant>),
    NullValue,
}

impl Variant {
    pub fn new(kind: VariantKind) -> Self {
        Variant { kind: Some(kind) }
    }

    pub fn null() -> Self {
        Variant::new(VariantKind::NullValue)
    }

    pub fn is_null(&self) -> bool {
        match self.kind {
            Some(VariantKind::NullValue) => true,
            _ => false,
        }
    }

    /// Sets a named field, turning the variant into a struct if it isn't
    /// one already.
    pub fn set_field(&mut self, name: &str, value: Variant) {
        match &mut self.kind {
            Some(VariantKind::StructValue(fields)) => {
                fields.insert(name.to_string(), value);
            }
            _ => {
                let mut fields = LinkedHashMap::new();
                fields.insert(name.to_string(), value);
                self.kind = Some(VariantKind::StructValue(fields));
            }
        }
    }
}

/// Converts a native value into its wire form.
pub fn encode(var: &Var) -> Variant {
    let kind = match var {
        Var::Bool(v) => VariantKind::BoolValue(*v),
        Var::Number(v) => VariantKind::NumberValue(*v),
        Var::String(v) => VariantKind::StringValue(v.clone()),
        Var::List(items) => VariantKind::ListValue(items.iter().map(encode).collect()),
        Var::Struct(fields) => VariantKind::StructValue(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), encode(v)))
                .collect(),
        ),
        Var::Null => VariantKind::NullValue,
    };
    Variant::new(kind)
}

/// Converts a wire value into its native form.
pub fn decode(variant: &Variant) -> Result<Var> {
    let kind = variant
        .kind
        .as_ref()
        .ok_or_else(|| Error::InvalidVariant("no value kind set".to_string()))?;
    let var = match kind {
        VariantKind::BoolValue(v) => Var::Bool(*v),
        VariantKind::NumberValue(v) => Var::Number(*v),
        VariantKind::StringValue(v) => Var::String(v.clone()),
        VariantKind::ListValue(items) => {
            Var::List(items.iter().map(decode).collect::<Result<Vec<_>>>()?)
        }
        VariantKind::StructValue(fields) => {
            let mut map = VarMap::new();
            for (k, v) in fields {
                map.insert(k.clone(), decode(v)?);
            }
            Var::Struct(map)
        }
        VariantKind::NullValue => Var::Null,
    };
    Ok(var)
}

/// Encodes a map of named values, as used for command arguments.
pub fn encode_map(map: &VarMap) -> LinkedHashMap<String, Variant> {
    map.iter().map(|(k, v)| (k.clone(), encode(v))).collect()
}
