// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt;
use std::sync::Arc;

use async_graphql_parser::types::Type;
use async_graphql_value::ConstValue;

use crate::field_resolver::FieldResolver;
use crate::value::Val;

use super::scalar::{ScalarParseError, ScalarSerializeError};

/// Maps a runtime value backing an abstract type to the name of its
/// concrete object type.
pub type TypeResolverFn = Arc<dyn Fn(&Val) -> Option<String> + Send + Sync>;

pub type ScalarParseFn =
    Arc<dyn Fn(&ConstValue) -> Result<Val, ScalarParseError> + Send + Sync>;
pub type ScalarSerializeFn =
    Arc<dyn Fn(&Val) -> Result<Val, ScalarSerializeError> + Send + Sync>;

/// A named type in the schema. Closed set: the completer dispatches on
/// this in a fixed order.
pub enum TypeDefinition {
    Scalar(ScalarType),
    Enum(EnumType),
    Object(ObjectType),
    Interface(InterfaceType),
    Union(UnionType),
    InputObject(InputObjectType),
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar(scalar) => &scalar.name,
            TypeDefinition::Enum(enum_type) => &enum_type.name,
            TypeDefinition::Object(object) => &object.name,
            TypeDefinition::Interface(interface) => &interface.name,
            TypeDefinition::Union(union) => &union.name,
            TypeDefinition::InputObject(input_object) => &input_object.name,
        }
    }

    /// Leaf types terminate selection sets; composite types require one.
    pub fn is_leaf(&self) -> bool {
        matches!(self, TypeDefinition::Scalar(_) | TypeDefinition::Enum(_))
    }

    pub fn is_composite(&self) -> bool {
        matches!(
            self,
            TypeDefinition::Object(_) | TypeDefinition::Interface(_) | TypeDefinition::Union(_)
        )
    }
}

impl fmt::Debug for TypeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDefinition::Scalar(s) => f.debug_tuple("Scalar").field(&s.name).finish(),
            TypeDefinition::Enum(e) => f.debug_tuple("Enum").field(&e.name).finish(),
            TypeDefinition::Object(o) => f.debug_tuple("Object").field(&o.name).finish(),
            TypeDefinition::Interface(i) => f.debug_tuple("Interface").field(&i.name).finish(),
            TypeDefinition::Union(u) => f.debug_tuple("Union").field(&u.name).finish(),
            TypeDefinition::InputObject(io) => {
                f.debug_tuple("InputObject").field(&io.name).finish()
            }
        }
    }
}

pub struct ScalarType {
    pub name: String,
    pub parse: ScalarParseFn,
    pub serialize: ScalarSerializeFn,
}

pub struct EnumType {
    pub name: String,
    pub values: Vec<String>,
}

impl EnumType {
    pub fn new(name: &str, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

pub struct ObjectType {
    pub name: String,
    pub fields: Vec<Arc<FieldDefinition>>,
    pub interfaces: Vec<String>,
}

impl ObjectType {
    pub fn new(name: &str, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.to_string(),
            fields: fields.into_iter().map(Arc::new).collect(),
            interfaces: vec![],
        }
    }

    pub fn with_interfaces(
        mut self,
        interfaces: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.interfaces = interfaces.into_iter().map(Into::into).collect();
        self
    }

    pub fn field(&self, name: &str) -> Option<&Arc<FieldDefinition>> {
        self.fields.iter().find(|f| f.name == name)
    }
}

pub struct InterfaceType {
    pub name: String,
    pub resolve_type: Option<TypeResolverFn>,
}

impl InterfaceType {
    pub fn new(name: &str, resolve_type: Option<TypeResolverFn>) -> Self {
        Self {
            name: name.to_string(),
            resolve_type,
        }
    }
}

pub struct UnionType {
    pub name: String,
    pub members: Vec<String>,
    pub resolve_type: Option<TypeResolverFn>,
}

impl UnionType {
    pub fn new(
        name: &str,
        members: impl IntoIterator<Item = impl Into<String>>,
        resolve_type: Option<TypeResolverFn>,
    ) -> Self {
        Self {
            name: name.to_string(),
            members: members.into_iter().map(Into::into).collect(),
            resolve_type,
        }
    }
}

pub struct InputObjectType {
    pub name: String,
    pub fields: Vec<ArgumentDefinition>,
}

impl InputObjectType {
    pub fn new(name: &str, fields: Vec<ArgumentDefinition>) -> Self {
        Self {
            name: name.to_string(),
            fields,
        }
    }

    pub fn field(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A field of an object type: declared output type, declared arguments,
/// and the resolver delegate bound by the schema builder. A field with no
/// resolver falls back to a key lookup on the parent object value.
pub struct FieldDefinition {
    pub name: String,
    pub ty: Type,
    pub arguments: Vec<ArgumentDefinition>,
    pub resolver: Option<Arc<dyn FieldResolver>>,
}

impl FieldDefinition {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
            arguments: vec![],
            resolver: None,
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<ArgumentDefinition>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_resolver(mut self, resolver: impl FieldResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    pub fn argument(&self, name: &str) -> Option<&ArgumentDefinition> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

impl fmt::Debug for FieldDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDefinition")
            .field("name", &self.name)
            .field("ty", &self.ty.to_string())
            .finish()
    }
}

/// An argument of a field, or a field of an input object (the two share
/// shape: name, declared input type, optional schema default).
#[derive(Clone)]
pub struct ArgumentDefinition {
    pub name: String,
    pub ty: Type,
    pub default_value: Option<ConstValue>,
}

impl ArgumentDefinition {
    pub fn new(name: &str, ty: Type) -> Self {
        Self {
            name: name.to_string(),
            ty,
            default_value: None,
        }
    }

    pub fn with_default(mut self, default_value: ConstValue) -> Self {
        self.default_value = Some(default_value);
        self
    }
}

impl fmt::Debug for ArgumentDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentDefinition")
            .field("name", &self.name)
            .field("ty", &self.ty.to_string())
            .finish()
    }
}
