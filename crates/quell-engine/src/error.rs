// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::Pos;
use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

use crate::path::{PathSegment, ResponsePath};
use crate::value::Val;

/// Errors raised while turning the raw request (document, operation name,
/// variables, argument literals) into an executable form.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{0}")]
    QueryParsingFailed(String, Pos, Option<Pos>),

    #[error("No operation found")]
    NoOperationFound,

    #[error("Must provide operation name if query contains multiple operations")]
    MultipleOperationsNoOperationName,

    #[error("operationName '{0}' doesn't match any operation")]
    MultipleOperationsUnmatchedOperationName(String),

    #[error("Schema does not define a root type for this operation")]
    RootTypeNotFound(Pos),

    #[error("Subscriptions must select exactly one root field")]
    SubscriptionRootNotSingular(Pos),

    #[error("Variable '{0}' not found")]
    VariableNotFound(String, Pos),

    #[error("Variable '{0}' of non-null type must not be null")]
    VariableValueRequired(String, Pos),

    #[error("Variable '{name}' expected a value of type '{expected_type}', got '{actual}'")]
    VariableShapeMismatch {
        name: String,
        expected_type: String,
        actual: String,
        pos: Pos,
    },

    #[error("Variable '{0}' could not be deserialized: {2}")]
    MalformedVariable(String, Pos, String),

    #[error("Required argument '{0}' not found")]
    RequiredArgumentNotFound(String, Pos),

    #[error("Argument(s) {0:?} invalid for '{1}'")]
    StrayArguments(Vec<String>, String, Pos),

    #[error(
        "Argument '{argument_name}' is not of a valid type. Expected '{expected_type}', got '{actual_type}'"
    )]
    InvalidArgumentType {
        argument_name: String,
        expected_type: String,
        actual_type: String,
        pos: Pos,
    },

    #[error("Invalid value for type '{type_name}': {message}")]
    InputParsingFailed {
        type_name: String,
        message: String,
        pos: Pos,
    },

    #[error("Field '{0}' is not valid for type '{1}'")]
    InvalidField(String, String, Pos),

    #[error("Field type '{0}' is not valid")]
    InvalidFieldType(String, Pos),

    #[error("Selections named '{0}' resolve to different fields and cannot be merged")]
    UnmergeableFields(String, Pos),

    #[error("Fragment '{0}' refers to itself")]
    FragmentCycle(String, Pos),

    #[error("Field '{0}' is of a scalar type, which should not specify fields")]
    ScalarWithField(String, Pos),

    #[error("Field '{0}' of a composite type must specify subfields")]
    CompositeWithoutFields(String, Pos),

    #[error("Fragment definition '{0}' not found")]
    FragmentDefinitionNotFound(String, Pos),

    #[error("Type condition '{0}' refers to an unknown type")]
    UnknownTypeCondition(String, Pos),
}

impl ValidationError {
    pub fn position1(&self) -> Pos {
        match self {
            ValidationError::QueryParsingFailed(_, pos, _) => *pos,
            ValidationError::NoOperationFound => Pos::default(),
            ValidationError::MultipleOperationsNoOperationName => Pos::default(),
            ValidationError::MultipleOperationsUnmatchedOperationName(_) => Pos::default(),
            ValidationError::RootTypeNotFound(pos) => *pos,
            ValidationError::SubscriptionRootNotSingular(pos) => *pos,
            ValidationError::VariableNotFound(_, pos) => *pos,
            ValidationError::VariableValueRequired(_, pos) => *pos,
            ValidationError::VariableShapeMismatch { pos, .. } => *pos,
            ValidationError::MalformedVariable(_, pos, _) => *pos,
            ValidationError::RequiredArgumentNotFound(_, pos) => *pos,
            ValidationError::StrayArguments(_, _, pos) => *pos,
            ValidationError::InvalidArgumentType { pos, .. } => *pos,
            ValidationError::InputParsingFailed { pos, .. } => *pos,
            ValidationError::InvalidField(_, _, pos) => *pos,
            ValidationError::InvalidFieldType(_, pos) => *pos,
            ValidationError::UnmergeableFields(_, pos) => *pos,
            ValidationError::FragmentCycle(_, pos) => *pos,
            ValidationError::ScalarWithField(_, pos) => *pos,
            ValidationError::CompositeWithoutFields(_, pos) => *pos,
            ValidationError::FragmentDefinitionNotFound(_, pos) => *pos,
            ValidationError::UnknownTypeCondition(_, pos) => *pos,
        }
    }

    pub fn position2(&self) -> Option<Pos> {
        match self {
            ValidationError::QueryParsingFailed(_, _, pos) => *pos,
            _ => None,
        }
    }
}

/// Failure returned by a resolver delegate. Carries an optional bag of
/// extra fields that is surfaced verbatim under the response error's
/// `extensions` key.
#[derive(Debug, Clone)]
pub struct ResolverError {
    pub message: String,
    pub extensions: Option<IndexMap<String, Val>>,
}

impl ResolverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: None,
        }
    }

    pub fn with_extensions(
        message: impl Into<String>,
        extensions: IndexMap<String, Val>,
    ) -> Self {
        Self {
            message: message.into(),
            extensions: Some(extensions),
        }
    }
}

impl From<String> for ResolverError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ResolverError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Line/column pair rendered in a response error's `locations` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorLocation {
    pub line: usize,
    pub column: usize,
}

impl From<Pos> for ErrorLocation {
    fn from(pos: Pos) -> Self {
        Self {
            line: pos.line,
            column: pos.column,
        }
    }
}

/// A structured response error: message plus, when known, the response
/// path and source locations of the field that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<IndexMap<String, Val>>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            locations: vec![],
            extensions: None,
        }
    }

    pub fn at_path(mut self, path: &ResponsePath) -> Self {
        self.path = Some(path.to_segments());
        self
    }

    pub fn at_pos(mut self, pos: Pos) -> Self {
        if pos != Pos::default() {
            self.locations.push(pos.into());
        }
        self
    }

    pub fn with_extensions(mut self, extensions: IndexMap<String, Val>) -> Self {
        self.extensions = Some(extensions);
        self
    }
}

impl From<&ValidationError> for FieldError {
    fn from(error: &ValidationError) -> Self {
        let mut field_error = FieldError::new(error.to_string()).at_pos(error.position1());
        if let Some(pos) = error.position2() {
            field_error = field_error.at_pos(pos);
        }
        field_error
    }
}

/// Request-level failure: nothing was executed and there is no partial
/// data to report.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Invalid query")]
    Validation(Vec<ValidationError>),

    #[error("Operation type is not a subscription")]
    NotASubscription,

    #[error("Subscription operations must be started via subscribe")]
    SubscriptionViaExecute,

    #[error("No subscription source configured")]
    SubscriptionSourceMissing,

    #[error("Subscription source failed: {0}")]
    SubscriptionSetupFailed(String),
}

impl From<ValidationError> for ExecutionError {
    fn from(error: ValidationError) -> Self {
        ExecutionError::Validation(vec![error])
    }
}

impl From<Vec<ValidationError>> for ExecutionError {
    fn from(errors: Vec<ValidationError>) -> Self {
        ExecutionError::Validation(errors)
    }
}
