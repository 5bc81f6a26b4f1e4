// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;
use std::sync::Arc;

use async_graphql_parser::types::{
    Directive, Field, FragmentDefinition, Selection, SelectionSet,
};
use async_graphql_parser::{Pos, Positioned};
use async_graphql_value::{Name, Value};
use indexmap::IndexMap;

use crate::error::ValidationError;
use crate::schema::{underlying_type, FieldDefinition, ObjectType, Schema};
use crate::validation::variables::VariableCollection;
use crate::value::Val;

/// A collected field: the (possibly merged) AST node, the schema
/// definition it resolved to, and the key it answers under in the
/// response. Shared via `Arc` between the memo cache and every task
/// created for it.
pub struct FieldSelection {
    pub field: Positioned<Field>,
    /// `None` for the `__typename` meta-field.
    pub definition: Option<Arc<FieldDefinition>>,
    pub response_name: String,
}

impl FieldSelection {
    pub fn field_name(&self) -> &str {
        self.field.node.name.node.as_str()
    }

    pub fn is_typename(&self) -> bool {
        self.definition.is_none()
    }

    pub fn pos(&self) -> Pos {
        self.field.pos
    }
}

/// Result of flattening one (object type, selection set) pair. Pure
/// output: collection problems are carried here, not pushed to ambient
/// state, so the whole value is memoizable.
pub struct CollectedFields {
    pub fields: Vec<Arc<FieldSelection>>,
    pub errors: Vec<ValidationError>,
}

/// Flattens a selection set against a concrete object type: resolves
/// fragment spreads and inline fragments by type condition, applies
/// `@skip`/`@include` against the coerced variables, merges selections
/// that answer under the same response key, and drops (with an error)
/// selections that name unknown fields. Collection keeps going past
/// individual failures.
pub struct SelectionCollector<'a> {
    schema: &'a Schema,
    variables: &'a VariableCollection,
    fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
}

struct PendingSelection {
    field: Positioned<Field>,
    definition: Option<Arc<FieldDefinition>>,
}

impl<'a> SelectionCollector<'a> {
    pub fn new(
        schema: &'a Schema,
        variables: &'a VariableCollection,
        fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    ) -> Self {
        Self {
            schema,
            variables,
            fragments,
        }
    }

    pub fn collect(
        &self,
        object: &ObjectType,
        selection_set: &Positioned<SelectionSet>,
    ) -> CollectedFields {
        let mut acc: IndexMap<String, PendingSelection> = IndexMap::new();
        let mut errors = vec![];
        let mut visiting = vec![];

        self.collect_into(object, selection_set, &mut visiting, &mut acc, &mut errors);

        CollectedFields {
            fields: acc
                .into_iter()
                .map(|(response_name, pending)| {
                    Arc::new(FieldSelection {
                        field: pending.field,
                        definition: pending.definition,
                        response_name,
                    })
                })
                .collect(),
            errors,
        }
    }

    fn collect_into(
        &self,
        object: &ObjectType,
        selection_set: &Positioned<SelectionSet>,
        visiting: &mut Vec<Name>,
        acc: &mut IndexMap<String, PendingSelection>,
        errors: &mut Vec<ValidationError>,
    ) {
        for selection in &selection_set.node.items {
            match &selection.node {
                Selection::Field(field) => {
                    if self.included(&field.node.directives) {
                        self.collect_field(object, field, acc, errors);
                    }
                }
                Selection::FragmentSpread(spread) => {
                    if !self.included(&spread.node.directives) {
                        continue;
                    }
                    let fragment_name = &spread.node.fragment_name.node;
                    let Some(fragment) = self.fragments.get(fragment_name) else {
                        errors.push(ValidationError::FragmentDefinitionNotFound(
                            fragment_name.to_string(),
                            spread.pos,
                        ));
                        continue;
                    };
                    if visiting.contains(fragment_name) {
                        errors.push(ValidationError::FragmentCycle(
                            fragment_name.to_string(),
                            spread.pos,
                        ));
                        continue;
                    }
                    let condition = &fragment.node.type_condition;
                    if self.condition_applies(
                        object,
                        condition.node.on.node.as_str(),
                        condition.pos,
                        errors,
                    ) {
                        visiting.push(fragment_name.clone());
                        self.collect_into(
                            object,
                            &fragment.node.selection_set,
                            visiting,
                            acc,
                            errors,
                        );
                        visiting.pop();
                    }
                }
                Selection::InlineFragment(inline) => {
                    if !self.included(&inline.node.directives) {
                        continue;
                    }
                    let applies = match &inline.node.type_condition {
                        Some(condition) => self.condition_applies(
                            object,
                            condition.node.on.node.as_str(),
                            condition.pos,
                            errors,
                        ),
                        None => true,
                    };
                    if applies {
                        self.collect_into(
                            object,
                            &inline.node.selection_set,
                            visiting,
                            acc,
                            errors,
                        );
                    }
                }
            }
        }
    }

    fn collect_field(
        &self,
        object: &ObjectType,
        field: &Positioned<Field>,
        acc: &mut IndexMap<String, PendingSelection>,
        errors: &mut Vec<ValidationError>,
    ) {
        let field_name = field.node.name.node.as_str();
        let response_name = field
            .node
            .alias
            .as_ref()
            .map(|alias| alias.node.to_string())
            .unwrap_or_else(|| field_name.to_string());

        let definition = if field_name == "__typename" {
            if !field.node.arguments.is_empty() {
                errors.push(ValidationError::StrayArguments(
                    field
                        .node
                        .arguments
                        .iter()
                        .map(|(name, _)| name.node.to_string())
                        .collect(),
                    field_name.to_string(),
                    field.pos,
                ));
                return;
            }
            if !field.node.selection_set.node.items.is_empty() {
                errors.push(ValidationError::ScalarWithField(
                    field_name.to_string(),
                    field.pos,
                ));
                return;
            }
            None
        } else {
            let Some(definition) = object.field(field_name) else {
                errors.push(ValidationError::InvalidField(
                    field_name.to_string(),
                    object.name.clone(),
                    field.pos,
                ));
                return;
            };
            if !self.selection_shape_is_valid(field, definition, errors) {
                return;
            }
            Some(definition.clone())
        };

        match acc.get_mut(&response_name) {
            None => {
                acc.insert(
                    response_name,
                    PendingSelection {
                        field: field.clone(),
                        definition,
                    },
                );
            }
            Some(existing) => {
                if existing.field.node.name.node != field.node.name.node {
                    errors.push(ValidationError::UnmergeableFields(
                        response_name,
                        field.pos,
                    ));
                } else if !field.node.selection_set.node.items.is_empty() {
                    // Same field selected twice under one key: merge the
                    // sub-selections so nested keys union up.
                    existing
                        .field
                        .node
                        .selection_set
                        .node
                        .items
                        .extend(field.node.selection_set.node.items.iter().cloned());
                }
            }
        }
    }

    /// Leaf fields take no sub-selection; composite fields require one.
    fn selection_shape_is_valid(
        &self,
        field: &Positioned<Field>,
        definition: &Arc<FieldDefinition>,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        let type_name = underlying_type(&definition.ty);
        let Some(type_definition) = self.schema.type_definition(type_name) else {
            errors.push(ValidationError::InvalidFieldType(
                type_name.to_string(),
                field.pos,
            ));
            return false;
        };

        let has_subfields = !field.node.selection_set.node.items.is_empty();
        if type_definition.is_leaf() && has_subfields {
            errors.push(ValidationError::ScalarWithField(
                field.node.name.node.to_string(),
                field.pos,
            ));
            false
        } else if type_definition.is_composite() && !has_subfields {
            errors.push(ValidationError::CompositeWithoutFields(
                field.node.name.node.to_string(),
                field.pos,
            ));
            false
        } else {
            true
        }
    }

    fn condition_applies(
        &self,
        object: &ObjectType,
        condition: &str,
        pos: Pos,
        errors: &mut Vec<ValidationError>,
    ) -> bool {
        if self.schema.type_definition(condition).is_none() && condition != object.name {
            errors.push(ValidationError::UnknownTypeCondition(
                condition.to_string(),
                pos,
            ));
            return false;
        }
        self.schema.satisfies_type_condition(condition, object)
    }

    /// Evaluate `@skip`/`@include` against the coerced variables. A
    /// directive whose `if` argument cannot be resolved to a boolean is
    /// ignored.
    fn included(&self, directives: &[Positioned<Directive>]) -> bool {
        for directive in directives {
            let name = directive.node.name.node.as_str();
            if name != "skip" && name != "include" {
                continue;
            }
            let condition = directive
                .node
                .get_argument("if")
                .and_then(|value| self.boolean_value(&value.node));
            match (name, condition) {
                ("skip", Some(true)) | ("include", Some(false)) => return false,
                _ => (),
            }
        }
        true
    }

    fn boolean_value(&self, value: &Value) -> Option<bool> {
        match value {
            Value::Boolean(b) => Some(*b),
            Value::Variable(name) => match self.variables.get(name.as_str()) {
                Some(Val::Bool(b)) => Some(*b),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ScalarType, TypeDefinition, UnionType};
    use crate::validation::variables::coerce_variable_definitions;

    use async_graphql_parser::parse_query;
    use async_graphql_parser::types::{DocumentOperations, ExecutableDocument, Type};

    fn test_schema() -> Schema {
        let concert_fields = vec![
            FieldDefinition::new("id", Type::new("Int!").unwrap()),
            FieldDefinition::new("title", Type::new("String").unwrap()),
            FieldDefinition::new("venue", Type::new("Venue").unwrap()),
        ];
        let venue_fields = vec![
            FieldDefinition::new("id", Type::new("Int!").unwrap()),
            FieldDefinition::new("name", Type::new("String").unwrap()),
        ];

        Schema::with_root_types(
            vec![
                TypeDefinition::Scalar(ScalarType::int()),
                TypeDefinition::Scalar(ScalarType::string()),
                TypeDefinition::Scalar(ScalarType::boolean()),
                TypeDefinition::Object(ObjectType::new("Concert", concert_fields)),
                TypeDefinition::Object(ObjectType::new("Venue", venue_fields)),
                TypeDefinition::Union(UnionType::new("Event", ["Concert"], None)),
                TypeDefinition::Object(ObjectType::new(
                    "Query",
                    vec![FieldDefinition::new("concert", Type::new("Concert").unwrap())],
                )),
            ],
            "Query",
            None,
            None,
        )
    }

    struct Parsed {
        document: ExecutableDocument,
        variables: VariableCollection,
    }

    fn parse(schema: &Schema, query: &str, variables_json: Option<&str>) -> Parsed {
        let document = parse_query(query).unwrap();
        let operation = match &document.operations {
            DocumentOperations::Single(operation) => operation,
            DocumentOperations::Multiple(operations) => operations.values().next().unwrap(),
        };
        let supplied = variables_json.map(|json| serde_json::from_str(json).unwrap());
        let variables = coerce_variable_definitions(
            schema,
            &operation.node.variable_definitions,
            supplied.as_ref(),
        )
        .unwrap();
        Parsed {
            document,
            variables,
        }
    }

    fn collect_on<'s>(
        schema: &'s Schema,
        parsed: &'s Parsed,
        type_name: &str,
    ) -> CollectedFields {
        let operation = match &parsed.document.operations {
            DocumentOperations::Single(operation) => operation,
            DocumentOperations::Multiple(operations) => operations.values().next().unwrap(),
        };
        let collector =
            SelectionCollector::new(schema, &parsed.variables, &parsed.document.fragments);
        let object = schema.object_definition(type_name).unwrap();
        collector.collect(object, &operation.node.selection_set)
    }

    fn response_names(collected: &CollectedFields) -> Vec<&str> {
        collected
            .fields
            .iter()
            .map(|f| f.response_name.as_str())
            .collect()
    }

    #[test]
    fn flattens_fragments_in_selection_order() {
        let schema = test_schema();
        let parsed = parse(
            &schema,
            r#"
            query {
                id
                ...concertInfo
                venue { name }
            }

            fragment concertInfo on Concert {
                title
            }
            "#,
            None,
        );

        let collected = collect_on(&schema, &parsed, "Concert");
        assert!(collected.errors.is_empty());
        assert_eq!(response_names(&collected), vec!["id", "title", "venue"]);
    }

    #[test]
    fn inline_fragment_with_unsatisfied_condition_is_excluded() {
        let schema = test_schema();
        let parsed = parse(
            &schema,
            r#"
            query {
                id
                ... on Venue {
                    name
                }
            }
            "#,
            None,
        );

        let collected = collect_on(&schema, &parsed, "Concert");
        assert!(collected.errors.is_empty());
        assert_eq!(response_names(&collected), vec!["id"]);
    }

    #[test]
    fn union_membership_satisfies_type_condition() {
        let schema = test_schema();
        let parsed = parse(
            &schema,
            r#"
            query {
                ... on Event {
                    id
                }
            }
            "#,
            None,
        );

        let collected = collect_on(&schema, &parsed, "Concert");
        assert_eq!(response_names(&collected), vec!["id"]);
    }

    #[test]
    fn skip_and_include_evaluate_coerced_variables() {
        let schema = test_schema();
        let parsed = parse(
            &schema,
            r#"
            query($withTitle: Boolean!) {
                id
                title @include(if: $withTitle)
                venue @skip(if: true) { name }
            }
            "#,
            Some(r#"{ "withTitle": false }"#),
        );

        let collected = collect_on(&schema, &parsed, "Concert");
        assert!(collected.errors.is_empty());
        assert_eq!(response_names(&collected), vec!["id"]);
    }

    #[test]
    fn unknown_field_errors_but_collection_continues() {
        let schema = test_schema();
        let parsed = parse(
            &schema,
            r#"
            query {
                id
                foobar
                title
            }
            "#,
            None,
        );

        let collected = collect_on(&schema, &parsed, "Concert");
        assert_eq!(response_names(&collected), vec!["id", "title"]);
        assert!(matches!(
            &collected.errors[0],
            ValidationError::InvalidField(name, on, _) if name == "foobar" && on == "Concert"
        ));
    }

    #[test]
    fn aliases_are_response_keys() {
        let schema = test_schema();
        let parsed = parse(
            &schema,
            r#"
            query {
                first: id
                headline: title
            }
            "#,
            None,
        );

        let collected = collect_on(&schema, &parsed, "Concert");
        assert_eq!(response_names(&collected), vec!["first", "headline"]);
    }

    #[test]
    fn same_key_composite_selections_merge() {
        let schema = test_schema();
        let parsed = parse(
            &schema,
            r#"
            query {
                venue { id }
                venue { name }
            }
            "#,
            None,
        );

        let collected = collect_on(&schema, &parsed, "Concert");
        assert_eq!(response_names(&collected), vec!["venue"]);
        let merged = &collected.fields[0];
        assert_eq!(merged.field.node.selection_set.node.items.len(), 2);
    }

    #[test]
    fn conflicting_aliases_error() {
        let schema = test_schema();
        let parsed = parse(
            &schema,
            r#"
            query {
                t: id
                t: title
            }
            "#,
            None,
        );

        let collected = collect_on(&schema, &parsed, "Concert");
        assert!(matches!(
            &collected.errors[0],
            ValidationError::UnmergeableFields(name, _) if name == "t"
        ));
    }

    #[test]
    fn fragment_cycles_are_detected() {
        let schema = test_schema();
        let parsed = parse(
            &schema,
            r#"
            query {
                ...a
            }
            fragment a on Concert { ...b }
            fragment b on Concert { ...a }
            "#,
            None,
        );

        let collected = collect_on(&schema, &parsed, "Concert");
        assert!(collected
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::FragmentCycle(..))));
    }

    #[test]
    fn typename_collects_without_a_definition() {
        let schema = test_schema();
        let parsed = parse(&schema, "query { __typename id }", None);

        let collected = collect_on(&schema, &parsed, "Concert");
        assert_eq!(response_names(&collected), vec!["__typename", "id"]);
        assert!(collected.fields[0].is_typename());
    }
}
