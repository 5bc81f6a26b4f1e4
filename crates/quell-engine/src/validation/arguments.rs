// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::Pos;
use async_graphql_parser::Positioned;
use async_graphql_value::{ConstValue, Name, Value};
use indexmap::IndexMap;

use crate::error::ValidationError;
use crate::schema::{ArgumentDefinition, Schema};
use crate::value::Val;

use super::input::coerce_input_literal;
use super::variables::VariableCollection;

/// Coerces one field invocation's argument literals into native values.
/// Runs when a resolver context is built; each invocation produces a
/// fresh map and never mutates the AST.
pub struct ArgumentCoercer<'a> {
    schema: &'a Schema,
    variables: &'a VariableCollection,
    field_name: &'a str,
    pos: Pos,
}

impl<'a> ArgumentCoercer<'a> {
    pub fn new(
        schema: &'a Schema,
        variables: &'a VariableCollection,
        field_name: &'a str,
        pos: Pos,
    ) -> Self {
        Self {
            schema,
            variables,
            field_name,
            pos,
        }
    }

    /// Coerce the supplied literals against the declared arguments. All
    /// declared arguments are processed; failures abort this field only,
    /// so every violation is reported together.
    pub fn coerce(
        &self,
        definitions: &[ArgumentDefinition],
        supplied: &[(Positioned<Name>, Positioned<Value>)],
    ) -> Result<IndexMap<String, Val>, Vec<ValidationError>> {
        // Clients commonly echo `__typename` back inside reused values;
        // it is not treated as a stray argument.
        let mut supplied: IndexMap<&Name, &Positioned<Value>> = supplied
            .iter()
            .filter_map(|(name, value)| {
                (name.node != "__typename").then_some((&name.node, value))
            })
            .collect();

        let mut coerced = IndexMap::new();
        let mut errors = vec![];

        for definition in definitions {
            let literal = supplied.shift_remove(&Name::new(&definition.name));
            match self.coerce_argument(definition, literal) {
                Ok(Some(value)) => {
                    coerced.insert(definition.name.clone(), value);
                }
                Ok(None) => (),
                Err(e) => errors.push(e),
            }
        }

        if !supplied.is_empty() {
            let stray = supplied.keys().map(|name| name.to_string()).collect();
            errors.push(ValidationError::StrayArguments(
                stray,
                self.field_name.to_string(),
                self.pos,
            ));
        }

        if errors.is_empty() {
            Ok(coerced)
        } else {
            Err(errors)
        }
    }

    fn coerce_argument(
        &self,
        definition: &ArgumentDefinition,
        literal: Option<&Positioned<Value>>,
    ) -> Result<Option<Val>, ValidationError> {
        match literal.map(|l| &l.node) {
            Some(Value::Variable(name)) => {
                match self.variables.get(name.as_str()) {
                    // The variable was coerced against its own declared
                    // type; restate it as a literal and parse it against
                    // the argument's type.
                    Some(value) => self
                        .parse_literal(definition, &value.clone().into_const_value())
                        .map(Some),
                    // Unbound or undeclared: the argument's own schema
                    // default takes over.
                    None => self.fallback(definition),
                }
            }
            Some(value) => {
                let resolved = value.clone().into_const_with(|name: Name| {
                    self.variables
                        .get(name.as_str())
                        .cloned()
                        .map(Val::into_const_value)
                        .ok_or_else(|| {
                            ValidationError::VariableNotFound(name.to_string(), self.pos)
                        })
                })?;
                self.parse_literal(definition, &resolved).map(Some)
            }
            None => self.fallback(definition),
        }
    }

    fn fallback(&self, definition: &ArgumentDefinition) -> Result<Option<Val>, ValidationError> {
        match &definition.default_value {
            Some(default) => self.parse_literal(definition, default).map(Some),
            None if definition.ty.nullable => Ok(None),
            None => Err(ValidationError::RequiredArgumentNotFound(
                definition.name.clone(),
                self.pos,
            )),
        }
    }

    fn parse_literal(
        &self,
        definition: &ArgumentDefinition,
        literal: &ConstValue,
    ) -> Result<Val, ValidationError> {
        if matches!(literal, ConstValue::Null) && !definition.ty.nullable {
            return Err(ValidationError::RequiredArgumentNotFound(
                definition.name.clone(),
                self.pos,
            ));
        }
        coerce_input_literal(
            self.schema,
            &definition.name,
            &definition.ty,
            literal,
            self.pos,
        )
    }
}
