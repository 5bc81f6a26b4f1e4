// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_graphql_value::ConstValue;
use thiserror::Error;

use crate::value::Val;

use super::definition::{ScalarParseFn, ScalarSerializeFn, ScalarType};

/// A literal (or variable-supplied) value did not fit the scalar.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ScalarParseError {
    pub message: String,
}

impl ScalarParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure while rendering a resolved value through a scalar's
/// serializer. `InvalidValue` messages are shown to the caller verbatim;
/// anything else is reported generically.
#[derive(Error, Debug)]
pub enum ScalarSerializeError {
    #[error("{0}")]
    InvalidValue(String),

    #[error("{0}")]
    Internal(String),
}

impl ScalarType {
    pub fn custom(name: &str, parse: ScalarParseFn, serialize: ScalarSerializeFn) -> Self {
        Self {
            name: name.to_string(),
            parse,
            serialize,
        }
    }

    pub fn int() -> Self {
        Self::custom(
            "Int",
            Arc::new(|literal| match literal {
                ConstValue::Number(n) => match n.as_i64() {
                    Some(v) if i32::try_from(v).is_ok() => Ok(Val::Number(n.clone())),
                    _ => Err(ScalarParseError::new(format!(
                        "Int cannot represent non 32-bit signed integer value: {n}"
                    ))),
                },
                other => Err(ScalarParseError::new(format!(
                    "Int cannot represent non-integer value: {other}"
                ))),
            }),
            Arc::new(|value| match value {
                Val::Number(n) if n.as_i64().is_some_and(|v| i32::try_from(v).is_ok()) => {
                    Ok(value.clone())
                }
                other => Err(ScalarSerializeError::InvalidValue(format!(
                    "Int cannot represent value: {other}"
                ))),
            }),
        )
    }

    pub fn float() -> Self {
        Self::custom(
            "Float",
            Arc::new(|literal| match literal {
                ConstValue::Number(n) => Ok(Val::Number(n.clone())),
                other => Err(ScalarParseError::new(format!(
                    "Float cannot represent non-numeric value: {other}"
                ))),
            }),
            Arc::new(|value| match value {
                Val::Number(_) => Ok(value.clone()),
                other => Err(ScalarSerializeError::InvalidValue(format!(
                    "Float cannot represent value: {other}"
                ))),
            }),
        )
    }

    pub fn string() -> Self {
        Self::custom(
            "String",
            Arc::new(|literal| match literal {
                ConstValue::String(s) => Ok(Val::String(s.clone())),
                other => Err(ScalarParseError::new(format!(
                    "String cannot represent non-string value: {other}"
                ))),
            }),
            Arc::new(|value| match value {
                Val::String(_) => Ok(value.clone()),
                other => Err(ScalarSerializeError::InvalidValue(format!(
                    "String cannot represent value: {other}"
                ))),
            }),
        )
    }

    pub fn boolean() -> Self {
        Self::custom(
            "Boolean",
            Arc::new(|literal| match literal {
                ConstValue::Boolean(b) => Ok(Val::Bool(*b)),
                other => Err(ScalarParseError::new(format!(
                    "Boolean cannot represent non-boolean value: {other}"
                ))),
            }),
            Arc::new(|value| match value {
                Val::Bool(_) => Ok(value.clone()),
                other => Err(ScalarSerializeError::InvalidValue(format!(
                    "Boolean cannot represent value: {other}"
                ))),
            }),
        )
    }

    /// IDs accept strings and integers on input; both serialize as strings.
    pub fn id() -> Self {
        Self::custom(
            "ID",
            Arc::new(|literal| match literal {
                ConstValue::String(s) => Ok(Val::String(s.clone())),
                ConstValue::Number(n) if n.as_i64().is_some() => {
                    Ok(Val::String(n.to_string()))
                }
                other => Err(ScalarParseError::new(format!(
                    "ID cannot represent value: {other}"
                ))),
            }),
            Arc::new(|value| match value {
                Val::String(_) => Ok(value.clone()),
                Val::Number(n) if n.as_i64().is_some() => Ok(Val::String(n.to_string())),
                other => Err(ScalarSerializeError::InvalidValue(format!(
                    "ID cannot represent value: {other}"
                ))),
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_rejects_out_of_range_literals() {
        let int = ScalarType::int();

        let in_range = ConstValue::Number(42.into());
        assert_eq!((int.parse)(&in_range).unwrap(), Val::Number(42.into()));

        let out_of_range = ConstValue::Number(i64::from(i32::MAX).wrapping_add(1).into());
        assert!((int.parse)(&out_of_range).is_err());

        let not_a_number = ConstValue::String("42".to_string());
        assert!((int.parse)(&not_a_number).is_err());
    }

    #[test]
    fn id_accepts_strings_and_integers() {
        let id = ScalarType::id();

        let from_string = ConstValue::String("user:1".to_string());
        assert_eq!(
            (id.parse)(&from_string).unwrap(),
            Val::String("user:1".to_string())
        );

        let from_int = ConstValue::Number(7.into());
        assert_eq!((id.parse)(&from_int).unwrap(), Val::String("7".to_string()));
    }

    #[test]
    fn serializer_distinguishes_invalid_values() {
        let boolean = ScalarType::boolean();

        let err = (boolean.serialize)(&Val::String("yes".to_string())).unwrap_err();
        assert!(matches!(err, ScalarSerializeError::InvalidValue(_)));
    }
}
