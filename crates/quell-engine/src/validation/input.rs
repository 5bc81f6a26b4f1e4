// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::types::{BaseType, Type};
use async_graphql_parser::Pos;
use async_graphql_value::ConstValue;

use crate::error::ValidationError;
use crate::schema::{Schema, TypeDefinition};
use crate::value::Val;

/// Parse a resolved (variable-free) literal against a declared input
/// type, producing the native value. Recurses through list and input
/// object structure; scalars parse through their own literal parser,
/// enums check membership.
///
/// `value_name` is the variable or argument being coerced, used in error
/// messages only.
pub fn coerce_input_literal(
    schema: &Schema,
    value_name: &str,
    ty: &Type,
    literal: &ConstValue,
    pos: Pos,
) -> Result<Val, ValidationError> {
    if let ConstValue::Null = literal {
        return if ty.nullable {
            Ok(Val::Null)
        } else {
            Err(ValidationError::VariableShapeMismatch {
                name: value_name.to_string(),
                expected_type: ty.to_string(),
                actual: "null".to_string(),
                pos,
            })
        };
    }

    match &ty.base {
        BaseType::List(element_type) => match literal {
            ConstValue::List(elements) => {
                let coerced = elements
                    .iter()
                    .map(|element| {
                        coerce_input_literal(schema, value_name, element_type, element, pos)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Val::List(coerced))
            }
            // A single non-list literal coerces to a one-element list.
            single => Ok(Val::List(vec![coerce_input_literal(
                schema,
                value_name,
                element_type,
                single,
                pos,
            )?])),
        },
        BaseType::Named(type_name) => {
            let type_definition = schema.type_definition(type_name).ok_or_else(|| {
                ValidationError::InputParsingFailed {
                    type_name: type_name.to_string(),
                    message: "unknown input type".to_string(),
                    pos,
                }
            })?;

            match type_definition {
                TypeDefinition::Scalar(scalar) => {
                    (scalar.parse)(literal).map_err(|e| ValidationError::InputParsingFailed {
                        type_name: scalar.name.clone(),
                        message: e.message,
                        pos,
                    })
                }
                TypeDefinition::Enum(enum_type) => {
                    let member = match literal {
                        ConstValue::Enum(name) => Some(name.as_str()),
                        // Variable-supplied enum values arrive as strings.
                        ConstValue::String(s) => Some(s.as_str()),
                        _ => None,
                    };
                    match member {
                        Some(member) if enum_type.contains(member) => {
                            Ok(Val::Enum(member.to_string()))
                        }
                        _ => Err(ValidationError::InputParsingFailed {
                            type_name: enum_type.name.clone(),
                            message: format!("invalid enum value: {literal}"),
                            pos,
                        }),
                    }
                }
                TypeDefinition::InputObject(input_object) => match literal {
                    ConstValue::Object(entries) => {
                        let mut coerced = indexmap::IndexMap::new();
                        for field in &input_object.fields {
                            let entry = entries.get(field.name.as_str());
                            let field_value = match (entry, &field.default_value) {
                                (Some(value), _) => coerce_input_literal(
                                    schema, &field.name, &field.ty, value, pos,
                                )?,
                                (None, Some(default)) => coerce_input_literal(
                                    schema, &field.name, &field.ty, default, pos,
                                )?,
                                (None, None) if field.ty.nullable => continue,
                                (None, None) => {
                                    return Err(ValidationError::RequiredArgumentNotFound(
                                        field.name.clone(),
                                        pos,
                                    ))
                                }
                            };
                            coerced.insert(field.name.clone(), field_value);
                        }

                        let stray: Vec<_> = entries
                            .keys()
                            .filter(|key| input_object.field(key.as_str()).is_none())
                            .map(|key| key.to_string())
                            .collect();
                        if !stray.is_empty() {
                            return Err(ValidationError::StrayArguments(
                                stray,
                                input_object.name.clone(),
                                pos,
                            ));
                        }

                        Ok(Val::Object(coerced))
                    }
                    _ => Err(ValidationError::VariableShapeMismatch {
                        name: value_name.to_string(),
                        expected_type: input_object.name.clone(),
                        actual: literal.to_string(),
                        pos,
                    }),
                },
                // Output-only types cannot appear in input position.
                other => Err(ValidationError::InputParsingFailed {
                    type_name: other.name().to_string(),
                    message: "type cannot be used as an input".to_string(),
                    pos,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ArgumentDefinition, EnumType, InputObjectType, ScalarType};
    use crate::val_object;

    fn test_schema() -> Schema {
        Schema::with_root_types(
            vec![
                TypeDefinition::Scalar(ScalarType::int()),
                TypeDefinition::Scalar(ScalarType::string()),
                TypeDefinition::Enum(EnumType::new("Status", ["OPEN", "CLOSED"])),
                TypeDefinition::InputObject(InputObjectType::new(
                    "TicketFilter",
                    vec![
                        ArgumentDefinition::new("status", Type::new("Status!").unwrap()),
                        ArgumentDefinition::new("limit", Type::new("Int").unwrap())
                            .with_default(ConstValue::Number(10.into())),
                    ],
                )),
            ],
            "Query",
            None,
            None,
        )
    }

    #[test]
    fn scalar_literals_parse_through_the_type() {
        let schema = test_schema();
        let ty = Type::new("Int!").unwrap();

        let coerced = coerce_input_literal(
            &schema,
            "n",
            &ty,
            &ConstValue::Number(5.into()),
            Pos::default(),
        )
        .unwrap();
        assert_eq!(coerced, Val::Number(5.into()));

        let mismatch = coerce_input_literal(
            &schema,
            "n",
            &ty,
            &ConstValue::String("5".to_string()),
            Pos::default(),
        );
        assert!(matches!(
            mismatch,
            Err(ValidationError::InputParsingFailed { .. })
        ));
    }

    #[test]
    fn null_against_non_null_is_rejected() {
        let schema = test_schema();
        let ty = Type::new("Int!").unwrap();

        let result =
            coerce_input_literal(&schema, "n", &ty, &ConstValue::Null, Pos::default());
        assert!(matches!(
            result,
            Err(ValidationError::VariableShapeMismatch { .. })
        ));
    }

    #[test]
    fn single_literal_coerces_to_one_element_list() {
        let schema = test_schema();
        let ty = Type::new("[Int!]").unwrap();

        let coerced = coerce_input_literal(
            &schema,
            "ids",
            &ty,
            &ConstValue::Number(3.into()),
            Pos::default(),
        )
        .unwrap();
        assert_eq!(coerced, Val::List(vec![Val::Number(3.into())]));
    }

    #[test]
    fn input_object_applies_field_defaults_and_rejects_strays() {
        let schema = test_schema();
        let ty = Type::new("TicketFilter").unwrap();

        let literal = ConstValue::from_json(serde_json::json!({ "status": "OPEN" })).unwrap();
        let coerced =
            coerce_input_literal(&schema, "filter", &ty, &literal, Pos::default()).unwrap();
        assert_eq!(
            coerced,
            val_object! {
                "status" => Val::Enum("OPEN".to_string()),
                "limit" => Val::Number(10.into()),
            }
        );

        let stray =
            ConstValue::from_json(serde_json::json!({ "status": "OPEN", "bogus": 1 })).unwrap();
        let result = coerce_input_literal(&schema, "filter", &ty, &stray, Pos::default());
        assert!(matches!(result, Err(ValidationError::StrayArguments(..))));
    }

    #[test]
    fn missing_non_null_input_field_is_rejected() {
        let schema = test_schema();
        let ty = Type::new("TicketFilter").unwrap();

        let literal = ConstValue::from_json(serde_json::json!({ "limit": 3 })).unwrap();
        let result = coerce_input_literal(&schema, "filter", &ty, &literal, Pos::default());
        assert!(matches!(
            result,
            Err(ValidationError::RequiredArgumentNotFound(name, _)) if name == "status"
        ));
    }
}
