// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashSet;

use async_graphql_parser::types::VariableDefinition;
use async_graphql_parser::Positioned;
use async_graphql_value::ConstValue;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::schema::Schema;
use crate::value::Val;

use super::input::coerce_input_literal;

/// The operation's declared variables with their coerced values. Built
/// once per request, before any resolver runs; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct VariableCollection {
    declared: HashSet<String>,
    values: IndexMap<String, Val>,
}

impl VariableCollection {
    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    /// The coerced value of a declared variable. `None` for a declared
    /// variable that was supplied no value (and had no default) as well
    /// as for undeclared names; use [`is_declared`](Self::is_declared)
    /// to distinguish the two.
    pub fn get(&self, name: &str) -> Option<&Val> {
        self.values.get(name)
    }
}

/// Coerce every declared variable of the operation. All declarations are
/// checked even after a failure so that the caller reports the full set
/// of violations at once.
pub fn coerce_variable_definitions(
    schema: &Schema,
    definitions: &[Positioned<VariableDefinition>],
    supplied: Option<&Map<String, Value>>,
) -> Result<VariableCollection, Vec<ValidationError>> {
    let mut collection = VariableCollection::default();
    let mut errors = vec![];

    for definition in definitions {
        let name = definition.node.name.node.as_str();
        let ty = &definition.node.var_type.node;
        collection.declared.insert(name.to_string());

        let supplied_literal = match supplied.and_then(|variables| variables.get(name)) {
            Some(json) => match ConstValue::from_json(json.clone()) {
                Ok(literal) => Some(literal),
                Err(e) => {
                    errors.push(ValidationError::MalformedVariable(
                        name.to_string(),
                        definition.node.name.pos,
                        e.to_string(),
                    ));
                    continue;
                }
            },
            None => None,
        };

        let literal = match supplied_literal {
            Some(literal) => Some(literal),
            None => definition
                .node
                .default_value
                .as_ref()
                .map(|default| default.node.clone()),
        };

        match literal {
            None | Some(ConstValue::Null) if !ty.nullable => {
                errors.push(ValidationError::VariableValueRequired(
                    name.to_string(),
                    definition.node.name.pos,
                ));
            }
            None => {
                // Declared, nullable, no value: the variable stays
                // unbound so argument coercion can fall back to the
                // argument's own default.
            }
            Some(literal) => {
                match coerce_input_literal(schema, name, ty, &literal, definition.node.name.pos)
                {
                    Ok(value) => {
                        collection.values.insert(name.to_string(), value);
                    }
                    Err(e) => errors.push(e),
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(collection)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ScalarType, TypeDefinition};

    use async_graphql_parser::parse_query;
    use async_graphql_parser::types::DocumentOperations;

    fn test_schema() -> Schema {
        Schema::with_root_types(
            vec![
                TypeDefinition::Scalar(ScalarType::int()),
                TypeDefinition::Scalar(ScalarType::string()),
            ],
            "Query",
            None,
            None,
        )
    }

    fn variable_definitions(query: &str) -> Vec<Positioned<VariableDefinition>> {
        let document = parse_query(query).unwrap();
        match document.operations {
            DocumentOperations::Single(operation) => operation.node.variable_definitions,
            DocumentOperations::Multiple(operations) => {
                operations
                    .into_iter()
                    .next()
                    .unwrap()
                    .1
                    .node
                    .variable_definitions
            }
        }
    }

    fn json_variables(json: &str) -> Map<String, Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn missing_non_null_variable_is_an_error() {
        let schema = test_schema();
        let definitions = variable_definitions("query($a: String!) { f(x: $a) }");

        let errors = coerce_variable_definitions(&schema, &definitions, None).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            ValidationError::VariableValueRequired(name, _) if name == "a"
        ));
    }

    #[test]
    fn default_applies_when_value_not_supplied() {
        let schema = test_schema();
        let definitions = variable_definitions(r#"query($limit: Int! = 20) { f(x: $limit) }"#);

        let collection = coerce_variable_definitions(&schema, &definitions, None).unwrap();
        assert_eq!(collection.get("limit"), Some(&Val::Number(20.into())));
    }

    #[test]
    fn supplied_value_wins_over_default() {
        let schema = test_schema();
        let definitions = variable_definitions(r#"query($limit: Int = 20) { f(x: $limit) }"#);

        let collection = coerce_variable_definitions(
            &schema,
            &definitions,
            Some(&json_variables(r#"{ "limit": 5 }"#)),
        )
        .unwrap();
        assert_eq!(collection.get("limit"), Some(&Val::Number(5.into())));
    }

    #[test]
    fn shape_mismatches_are_aggregated() {
        let schema = test_schema();
        let definitions =
            variable_definitions("query($a: Int!, $b: String!) { f(x: $a, y: $b) }");

        let errors = coerce_variable_definitions(
            &schema,
            &definitions,
            Some(&json_variables(r#"{ "a": "not an int", "b": 12 }"#)),
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn unbound_nullable_variable_stays_unbound() {
        let schema = test_schema();
        let definitions = variable_definitions("query($a: Int) { f(x: $a) }");

        let collection = coerce_variable_definitions(&schema, &definitions, None).unwrap();
        assert!(collection.is_declared("a"));
        assert_eq!(collection.get("a"), None);
        assert!(!collection.is_declared("zzz"));
    }
}
