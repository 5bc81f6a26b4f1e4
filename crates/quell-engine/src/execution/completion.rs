// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use async_graphql_parser::types::{BaseType, Type};
use async_recursion::async_recursion;

use crate::error::FieldError;
use crate::path::ResponsePath;
use crate::schema::scalar::ScalarSerializeError;
use crate::schema::{ObjectType, TypeDefinition};
use crate::value::Val;

use super::collector::FieldSelection;
use super::context::ExecutionContext;
use super::output::{OutputList, OutputObject, OutputSlot, OutputValue};
use super::task::{ResolverTask, SourceStack};

/// Normalize one raw resolver outcome into the result tree.
///
/// The handler chain runs in a fixed order (error, non-null unwrap,
/// null, list, scalar/enum, object) dispatched as a match over the
/// closed type-kind set; the first applicable handler consumes the
/// value. Object handlers open a nested output level and enqueue one
/// task per collected sub-selection onto `queue`, which is the only way
/// the result tree grows.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn complete_value(
    ctx: &ExecutionContext,
    declared_type: &Type,
    raw: Result<Val, FieldError>,
    selection: &Arc<FieldSelection>,
    source: &SourceStack,
    path: &ResponsePath,
    slot: &Arc<OutputSlot>,
    queue: &mut Vec<ResolverTask>,
) {
    match raw {
        Err(error) => {
            // A failed resolver surfaces its error once and leaves a
            // null; that null still participates in non-null bubbling
            // without a second error.
            ctx.push_error(error);
            null_slot(ctx, slot);
        }
        Ok(value) => {
            complete_resolved(ctx, declared_type, value, selection, source, path, slot, queue)
                .await
        }
    }
}

#[allow(clippy::too_many_arguments)]
#[async_recursion]
async fn complete_resolved(
    ctx: &ExecutionContext,
    declared_type: &Type,
    value: Val,
    selection: &Arc<FieldSelection>,
    source: &SourceStack,
    path: &ResponsePath,
    slot: &Arc<OutputSlot>,
    queue: &mut Vec<ResolverTask>,
) {
    if value.is_null() {
        if declared_type.nullable {
            slot.set(OutputValue::Null);
        } else {
            ctx.push_error(
                FieldError::new(format!(
                    "Cannot return null for non-nullable field '{}'",
                    selection.field_name()
                ))
                .at_path(path)
                .at_pos(selection.pos()),
            );
            null_slot(ctx, slot);
        }
        return;
    }

    match &declared_type.base {
        BaseType::List(element_type) => {
            let Val::List(elements) = value else {
                ctx.push_error(
                    FieldError::new(format!(
                        "Expected a list for field '{}'",
                        selection.field_name()
                    ))
                    .at_path(path)
                    .at_pos(selection.pos()),
                );
                null_slot(ctx, slot);
                return;
            };

            let list = OutputList::with_len(elements.len());
            slot.set(OutputValue::List(list.clone()));

            for (index, element) in elements.into_iter().enumerate() {
                let element_path = path.index(index);

                // A null element in a non-null element position fails the
                // whole list, immediately; later elements are not
                // examined.
                let element_slot = OutputSlot::element(
                    list.clone(),
                    index,
                    element_type.nullable,
                    Some(slot.clone()),
                );

                if element.is_null() && !element_type.nullable {
                    ctx.push_error(
                        FieldError::new(format!(
                            "Cannot return null for non-nullable list element of '{}'",
                            selection.field_name()
                        ))
                        .at_path(&element_path)
                        .at_pos(selection.pos()),
                    );
                    null_slot(ctx, &element_slot);
                    return;
                }
                complete_resolved(
                    ctx,
                    element_type,
                    element,
                    selection,
                    source,
                    &element_path,
                    &element_slot,
                    queue,
                )
                .await;
            }
        }
        BaseType::Named(type_name) => {
            let Some(type_definition) = ctx.schema().type_definition(type_name) else {
                ctx.push_error(
                    FieldError::new(format!("Unknown type '{type_name}'"))
                        .at_path(path)
                        .at_pos(selection.pos()),
                );
                null_slot(ctx, slot);
                return;
            };

            match type_definition {
                TypeDefinition::Scalar(scalar) => match (scalar.serialize)(&value) {
                    Ok(serialized) => slot.set(OutputValue::Leaf(serialized)),
                    Err(ScalarSerializeError::InvalidValue(message)) => {
                        ctx.push_error(
                            FieldError::new(message)
                                .at_path(path)
                                .at_pos(selection.pos()),
                        );
                        null_slot(ctx, slot);
                    }
                    Err(ScalarSerializeError::Internal(_)) => {
                        ctx.push_error(
                            FieldError::new(format!(
                                "Unable to serialize value for field '{}'",
                                selection.field_name()
                            ))
                            .at_path(path)
                            .at_pos(selection.pos()),
                        );
                        null_slot(ctx, slot);
                    }
                },
                TypeDefinition::Enum(enum_type) => {
                    let member = match &value {
                        Val::Enum(name) => Some(name.as_str()),
                        Val::String(name) => Some(name.as_str()),
                        _ => None,
                    };
                    match member {
                        Some(member) if enum_type.contains(member) => {
                            slot.set(OutputValue::Leaf(Val::String(member.to_string())));
                        }
                        _ => {
                            ctx.push_error(
                                FieldError::new(format!(
                                    "Enum '{}' cannot represent value: {value}",
                                    enum_type.name
                                ))
                                .at_path(path)
                                .at_pos(selection.pos()),
                            );
                            null_slot(ctx, slot);
                        }
                    }
                }
                TypeDefinition::Object(object) => {
                    expand_object(ctx, object, value, selection, source, path, slot, queue)
                        .await;
                }
                TypeDefinition::Interface(interface) => {
                    let resolver_answer =
                        interface.resolve_type.as_ref().and_then(|f| f(&value));
                    match resolve_concrete_type(ctx, type_name, resolver_answer, &value) {
                        Some(object) => {
                            expand_object(
                                ctx, object, value, selection, source, path, slot, queue,
                            )
                            .await
                        }
                        None => {
                            abstract_type_failure(ctx, type_name, selection, path, slot);
                        }
                    }
                }
                TypeDefinition::Union(union) => {
                    let resolver_answer = union.resolve_type.as_ref().and_then(|f| f(&value));
                    match resolve_concrete_type(ctx, type_name, resolver_answer, &value) {
                        Some(object) => {
                            expand_object(
                                ctx, object, value, selection, source, path, slot, queue,
                            )
                            .await
                        }
                        None => {
                            abstract_type_failure(ctx, type_name, selection, path, slot);
                        }
                    }
                }
                TypeDefinition::InputObject(_) => {
                    ctx.push_error(
                        FieldError::new(format!(
                            "Input type '{type_name}' cannot be used in output position"
                        ))
                        .at_path(path)
                        .at_pos(selection.pos()),
                    );
                    null_slot(ctx, slot);
                }
            }
        }
    }
}

/// Open a nested result level for an object-typed value, re-collect the
/// sub-selection against the concrete type, and enqueue one task per
/// collected field for the next wave.
#[allow(clippy::too_many_arguments)]
async fn expand_object(
    ctx: &ExecutionContext,
    object: &ObjectType,
    value: Val,
    selection: &Arc<FieldSelection>,
    source: &SourceStack,
    path: &ResponsePath,
    slot: &Arc<OutputSlot>,
    queue: &mut Vec<ResolverTask>,
) {
    let output = OutputObject::new();
    slot.set(OutputValue::Object(output.clone()));

    let collected = ctx
        .collect_fields(object, &selection.field.node.selection_set)
        .await;

    let child_source = source.push(value);
    for child in &collected.fields {
        output.insert_pending(&child.response_name);

        let nullable = match &child.definition {
            Some(definition) => definition.ty.nullable,
            // __typename always completes, to a non-null string.
            None => false,
        };

        queue.push(ResolverTask {
            source: child_source.clone(),
            object_type: object.name.clone(),
            selection: child.clone(),
            path: path.field(child.response_name.as_str()),
            slot: OutputSlot::field(
                output.clone(),
                child.response_name.as_str(),
                nullable,
                Some(slot.clone()),
            ),
        });
    }
}

/// Pick the concrete object type backing an abstract-typed value: the
/// type's own resolver delegate first, then the value's `__typename`
/// discriminator. The result must actually belong to the abstract type.
fn resolve_concrete_type<'s>(
    ctx: &'s ExecutionContext,
    abstract_name: &str,
    resolver_answer: Option<String>,
    value: &Val,
) -> Option<&'s ObjectType> {
    let concrete_name =
        resolver_answer.or_else(|| value.type_name().map(str::to_string))?;

    let object = ctx.schema().object_definition(&concrete_name)?;
    ctx.schema()
        .satisfies_type_condition(abstract_name, object)
        .then_some(object)
}

fn abstract_type_failure(
    ctx: &ExecutionContext,
    abstract_name: &str,
    selection: &Arc<FieldSelection>,
    path: &ResponsePath,
    slot: &Arc<OutputSlot>,
) {
    ctx.push_error(
        FieldError::new(format!(
            "Could not resolve the concrete type of abstract type '{abstract_name}'"
        ))
        .at_path(path)
        .at_pos(selection.pos()),
    );
    null_slot(ctx, slot);
}

/// Null this position; if its declared type forbids null, bubble to the
/// nearest nullable ancestor, nulling the whole data payload when none
/// exists.
fn null_slot(ctx: &ExecutionContext, slot: &Arc<OutputSlot>) {
    if !slot.propagate_null() {
        ctx.null_data();
    }
}
