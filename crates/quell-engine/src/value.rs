// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use async_graphql_value::{ConstValue, Name, Number};
use indexmap::IndexMap;
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// An insertion-ordered object body.
pub type ValMap = IndexMap<String, Val>;

/// The engine's runtime value. Resolver results, coerced arguments, and
/// frozen response data are all expressed as `Val`.
///
/// Objects preserve insertion order, which is what makes the response
/// key order match the selection order all the way down.
#[derive(Clone, Debug, PartialEq)]
pub enum Val {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Enum(String),
    List(Vec<Val>),
    Object(IndexMap<String, Val>),
}

impl Val {
    pub fn get(&self, key: &str) -> Option<&Val> {
        match self {
            Val::Object(o) => o.get(key),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    /// The type-name discriminator carried by objects backing abstract
    /// types, when present.
    pub fn type_name(&self) -> Option<&str> {
        match self.get("__typename") {
            Some(Val::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn into_json(self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Restate the value as a literal AST node. Used when handing coerced
    /// arguments back to an external collaborator (subscription sources).
    pub fn into_const_value(self) -> ConstValue {
        match self {
            Val::Null => ConstValue::Null,
            Val::Bool(b) => ConstValue::Boolean(b),
            Val::Number(n) => ConstValue::Number(n),
            Val::String(s) => ConstValue::String(s),
            Val::Enum(e) => ConstValue::Enum(Name::new(e)),
            Val::List(l) => {
                ConstValue::List(l.into_iter().map(Val::into_const_value).collect())
            }
            Val::Object(o) => ConstValue::Object(
                o.into_iter()
                    .map(|(k, v)| (Name::new(k), v.into_const_value()))
                    .collect(),
            ),
        }
    }
}

impl Display for Val {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Val::Null => write!(f, "null"),
            Val::Bool(b) => write!(f, "{b}"),
            Val::Number(n) => write!(f, "{n}"),
            Val::String(s) => write!(f, "\"{s}\""),
            Val::Enum(e) => write!(f, "{e}"),
            Val::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Val::Object(o) => {
                write!(f, "{{")?;
                for (i, (k, v)) in o.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Serialize for Val {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Val::Null => serializer.serialize_unit(),
            Val::Bool(b) => serializer.serialize_bool(*b),
            Val::Number(n) => n.serialize(serializer),
            Val::String(s) => serializer.serialize_str(s),
            Val::Enum(e) => serializer.serialize_str(e),
            Val::List(l) => {
                let mut seq = serializer.serialize_seq(Some(l.len()))?;
                for elem in l {
                    seq.serialize_element(elem)?;
                }
                seq.end()
            }
            Val::Object(o) => {
                let mut map = serializer.serialize_map(Some(o.len()))?;
                for (k, v) in o {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

impl From<serde_json::Value> for Val {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Val::Null,
            serde_json::Value::Bool(b) => Val::Bool(b),
            serde_json::Value::Number(n) => Val::Number(n),
            serde_json::Value::String(s) => Val::String(s),
            serde_json::Value::Array(l) => Val::List(l.into_iter().map(Val::from).collect()),
            serde_json::Value::Object(o) => {
                Val::Object(o.into_iter().map(|(k, v)| (k, Val::from(v))).collect())
            }
        }
    }
}

impl TryFrom<ConstValue> for Val {
    type Error = serde_json::Error;

    fn try_from(value: ConstValue) -> Result<Self, Self::Error> {
        match value {
            ConstValue::Null => Ok(Val::Null),
            ConstValue::Boolean(b) => Ok(Val::Bool(b)),
            ConstValue::Number(n) => Ok(Val::Number(n)),
            ConstValue::String(s) => Ok(Val::String(s)),
            ConstValue::Enum(e) => Ok(Val::Enum(e.to_string())),
            ConstValue::List(l) => Ok(Val::List(
                l.into_iter()
                    .map(Val::try_from)
                    .collect::<Result<_, _>>()?,
            )),
            ConstValue::Object(o) => Ok(Val::Object(
                o.into_iter()
                    .map(|(k, v)| Ok((k.to_string(), Val::try_from(v)?)))
                    .collect::<Result<_, _>>()?,
            )),
            ConstValue::Binary(_) => Err(serde_json::Error::custom(
                "Binary values are not supported in results",
            )),
        }
    }
}

#[macro_export]
macro_rules! val_object {
    ($($key:expr => $value:expr),* $(,)?) => {{
        let mut map = $crate::value::ValMap::new();
        $(map.insert($key.to_string(), $value);)*
        $crate::value::Val::Object(map)
    }};
}
