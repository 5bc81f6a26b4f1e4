// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::types::{BaseType, OperationType, Type};
use async_graphql_value::Name;
use indexmap::IndexMap;

pub mod definition;
pub mod scalar;

pub use definition::{
    ArgumentDefinition, EnumType, FieldDefinition, InputObjectType, InterfaceType, ObjectType,
    ScalarType, TypeDefinition, TypeResolverFn, UnionType,
};

pub const QUERY_ROOT_TYPENAME: &str = "Query";
pub const MUTATION_ROOT_TYPENAME: &str = "Mutation";
pub const SUBSCRIPTION_ROOT_TYPENAME: &str = "Subscription";

/// The type system the engine executes against. Produced by an external
/// schema builder; the engine only reads it.
pub struct Schema {
    types: IndexMap<String, TypeDefinition>,
    query_type: String,
    mutation_type: Option<String>,
    subscription_type: Option<String>,
}

impl Schema {
    pub fn new(types: Vec<TypeDefinition>) -> Self {
        Self::with_root_types(
            types,
            QUERY_ROOT_TYPENAME,
            Some(MUTATION_ROOT_TYPENAME),
            Some(SUBSCRIPTION_ROOT_TYPENAME),
        )
    }

    pub fn with_root_types(
        types: Vec<TypeDefinition>,
        query_type: &str,
        mutation_type: Option<&str>,
        subscription_type: Option<&str>,
    ) -> Self {
        let types: IndexMap<_, _> = types
            .into_iter()
            .map(|td| (td.name().to_string(), td))
            .collect();

        Self {
            query_type: query_type.to_string(),
            mutation_type: mutation_type.map(str::to_string).filter(|name| types.contains_key(name)),
            subscription_type: subscription_type
                .map(str::to_string)
                .filter(|name| types.contains_key(name)),
            types,
        }
    }

    pub fn type_definition(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn object_definition(&self, name: &str) -> Option<&ObjectType> {
        match self.types.get(name) {
            Some(TypeDefinition::Object(object)) => Some(object),
            _ => None,
        }
    }

    /// The object type that roots the given operation kind.
    pub fn root_type(&self, operation_type: OperationType) -> Option<&ObjectType> {
        let name = match operation_type {
            OperationType::Query => Some(self.query_type.as_str()),
            OperationType::Mutation => self.mutation_type.as_deref(),
            OperationType::Subscription => self.subscription_type.as_deref(),
        }?;
        self.object_definition(name)
    }

    /// Whether `object` satisfies the type condition `condition_name`:
    /// exact object match, interface membership, or union membership.
    pub fn satisfies_type_condition(&self, condition_name: &str, object: &ObjectType) -> bool {
        if condition_name == object.name {
            return true;
        }
        match self.types.get(condition_name) {
            Some(TypeDefinition::Interface(_)) => object
                .interfaces
                .iter()
                .any(|implemented| implemented == condition_name),
            Some(TypeDefinition::Union(union)) => {
                union.members.iter().any(|member| member == &object.name)
            }
            _ => false,
        }
    }

    /// The concrete object types that can back the named abstract type.
    pub fn possible_types(&self, abstract_name: &str) -> Vec<&ObjectType> {
        match self.types.get(abstract_name) {
            Some(TypeDefinition::Union(union)) => union
                .members
                .iter()
                .filter_map(|member| self.object_definition(member))
                .collect(),
            Some(TypeDefinition::Interface(_)) => self
                .types
                .values()
                .filter_map(|td| match td {
                    TypeDefinition::Object(object)
                        if object.interfaces.iter().any(|i| i == abstract_name) =>
                    {
                        Some(object)
                    }
                    _ => None,
                })
                .collect(),
            _ => vec![],
        }
    }
}

/// Peel lists and non-null wrappers down to the named type.
pub fn underlying_type(typ: &Type) -> &Name {
    match &typ.base {
        BaseType::Named(name) => name,
        BaseType::List(typ) => underlying_type(typ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::definition::{EnumType, InterfaceType, ObjectType, UnionType};

    fn pet_schema() -> Schema {
        Schema::new(vec![
            TypeDefinition::Scalar(ScalarType::string()),
            TypeDefinition::Enum(EnumType::new("Diet", ["CARNIVORE", "HERBIVORE"])),
            TypeDefinition::Interface(InterfaceType::new("Named", None)),
            TypeDefinition::Object(
                ObjectType::new("Dog", vec![]).with_interfaces(["Named"]),
            ),
            TypeDefinition::Object(ObjectType::new("Cat", vec![])),
            TypeDefinition::Union(UnionType::new("Pet", ["Dog", "Cat"], None)),
        ])
    }

    #[test]
    fn type_condition_compatibility() {
        let schema = pet_schema();
        let dog = schema.object_definition("Dog").unwrap();
        let cat = schema.object_definition("Cat").unwrap();

        assert!(schema.satisfies_type_condition("Dog", dog));
        assert!(schema.satisfies_type_condition("Named", dog));
        assert!(!schema.satisfies_type_condition("Named", cat));
        assert!(schema.satisfies_type_condition("Pet", cat));
        assert!(!schema.satisfies_type_condition("Diet", dog));
    }

    #[test]
    fn possible_types_of_abstract_types() {
        let schema = pet_schema();

        let union_members: Vec<_> = schema
            .possible_types("Pet")
            .into_iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(union_members, vec!["Dog", "Cat"]);

        let implementors: Vec<_> = schema
            .possible_types("Named")
            .into_iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(implementors, vec!["Dog"]);
    }
}
