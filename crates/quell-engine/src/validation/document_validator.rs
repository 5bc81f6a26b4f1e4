// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::types::{
    DocumentOperations, ExecutableDocument, OperationDefinition, OperationType, SelectionSet,
};
use async_graphql_parser::Positioned;
use async_graphql_value::Name;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::ValidationError;
use crate::schema::Schema;

use super::variables::{coerce_variable_definitions, VariableCollection};

/// The operation chosen out of the document, with its variables fully
/// coerced. Nothing of this survives into execution except by value; the
/// selection set stays borrowed from the (cached) document.
#[derive(Debug)]
pub struct ValidatedOperation<'a> {
    pub name: Option<String>,
    pub typ: OperationType,
    pub variables: VariableCollection,
    pub selection_set: &'a Positioned<SelectionSet>,
}

/// Context for validating a document: selects the operation to run and
/// coerces its variables.
pub struct DocumentValidator<'a> {
    schema: &'a Schema,
    operation_name: Option<String>,
    variables: Option<Map<String, Value>>,
}

impl<'a> DocumentValidator<'a> {
    pub fn new(
        schema: &'a Schema,
        operation_name: Option<String>,
        variables: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            schema,
            operation_name,
            variables,
        }
    }

    /// Validations performed:
    /// - there is at least one operation
    /// - either there is only one operation or the given operation name
    ///   matches one of the operations in the document
    /// - every declared variable coerces against its declared type (see
    ///   [`coerce_variable_definitions`] for details)
    #[instrument(name = "DocumentValidator::validate", skip_all)]
    pub fn validate<'d>(
        self,
        document: &'d ExecutableDocument,
    ) -> Result<ValidatedOperation<'d>, Vec<ValidationError>> {
        let (operation_name, operation) = self.select_operation(document)?;

        let variables = coerce_variable_definitions(
            self.schema,
            &operation.node.variable_definitions,
            self.variables.as_ref(),
        )?;

        Ok(ValidatedOperation {
            name: operation_name,
            typ: operation.node.ty,
            variables,
            selection_set: &operation.node.selection_set,
        })
    }

    fn select_operation<'d>(
        &self,
        document: &'d ExecutableDocument,
    ) -> Result<(Option<String>, &'d Positioned<OperationDefinition>), Vec<ValidationError>>
    {
        match &document.operations {
            DocumentOperations::Single(operation) => {
                Ok((self.operation_name.clone(), operation))
            }
            DocumentOperations::Multiple(operations) => {
                if operations.is_empty() {
                    return Err(vec![ValidationError::NoOperationFound]);
                }
                match &self.operation_name {
                    None if operations.len() == 1 => {
                        // `operationName` is required only for truly
                        // multiple operations, but the parser files a
                        // single named operation (`query Foo { ... }`)
                        // under `Multiple` as well.
                        let (name, operation) = operations.iter().next().unwrap();
                        Ok((Some(name.to_string()), operation))
                    }
                    None => Err(vec![ValidationError::MultipleOperationsNoOperationName]),
                    Some(operation_name) => {
                        match operations.get(&Name::new(operation_name)) {
                            Some(operation) => {
                                Ok((Some(operation_name.clone()), operation))
                            }
                            None => Err(vec![
                                ValidationError::MultipleOperationsUnmatchedOperationName(
                                    operation_name.clone(),
                                ),
                            ]),
                        }
                    }
                }
            }
        }
    }
}
