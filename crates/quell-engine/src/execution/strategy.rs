// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::types::SelectionSet;
use async_graphql_parser::Positioned;
use futures::future::{join_all, maybe_done, poll_immediate};
use tracing::instrument;

use crate::error::FieldError;
use crate::path::ResponsePath;
use crate::schema::ObjectType;
use crate::validation::arguments::ArgumentCoercer;
use crate::value::Val;

use super::completion::complete_value;
use super::context::ExecutionContext;
use super::output::{OutputObject, OutputSlot, OutputValue};
use super::task::{ResolverContext, ResolverTask, SourceStack};

/// Open the root result level and enqueue one task per collected root
/// selection: the initial wave.
pub(crate) async fn seed_root_tasks(
    ctx: &ExecutionContext,
    root_type: &ObjectType,
    selection_set: &Positioned<SelectionSet>,
) -> (OutputObject, Vec<ResolverTask>) {
    let output = OutputObject::new();
    let collected = ctx.collect_fields(root_type, selection_set).await;
    let source = SourceStack::root(ctx.root_value().clone());

    let mut tasks = vec![];
    for selection in &collected.fields {
        output.insert_pending(&selection.response_name);
        let nullable = selection
            .definition
            .as_ref()
            .map(|definition| definition.ty.nullable)
            .unwrap_or(false);

        tasks.push(ResolverTask {
            source: source.clone(),
            object_type: root_type.name.clone(),
            selection: selection.clone(),
            path: ResponsePath::root(selection.response_name.as_str()),
            slot: OutputSlot::field(
                output.clone(),
                selection.response_name.as_str(),
                nullable,
                None,
            ),
        });
    }

    (output, tasks)
}

/// The query discipline: run wave after wave, each fully fanned out,
/// until no wave produces further tasks.
#[instrument(name = "strategy::execute_query", skip_all)]
pub(crate) async fn execute_query(ctx: &ExecutionContext, initial: Vec<ResolverTask>) {
    let mut wave = initial;
    while !wave.is_empty() {
        if ctx.cancellation().is_cancelled() {
            break;
        }
        wave = run_wave(ctx, wave).await;
    }
}

/// The mutation discipline: root fields run strictly in declaration
/// order, and each root field's subtree is drained to completion (with
/// the ordinary parallel wave loop) before the next root field starts.
#[instrument(name = "strategy::execute_mutation", skip_all)]
pub(crate) async fn execute_mutation(ctx: &ExecutionContext, initial: Vec<ResolverTask>) {
    for task in initial {
        if ctx.cancellation().is_cancelled() {
            break;
        }
        let subtree = run_wave(ctx, vec![task]).await;
        execute_query(ctx, subtree).await;
    }
}

/// One wave in three phases: (i) start every task's resolver, driving it
/// to its first suspension point; (ii) trigger any pending batched fetch
/// exactly once, before any individual result is awaited; (iii) finish
/// every result and feed it through the completer, in task order. The
/// returned tasks form the next wave.
async fn run_wave(ctx: &ExecutionContext, tasks: Vec<ResolverTask>) -> Vec<ResolverTask> {
    let mut runnable = Vec::with_capacity(tasks.len());
    for task in tasks {
        // The type name never needs a resolver or a wave slot of its own.
        if task.selection.is_typename() {
            task.slot
                .set(OutputValue::Leaf(Val::String(task.object_type)));
            continue;
        }

        // Too-deep tasks are short-circuited before their resolver ever
        // starts.
        if let Some(max_depth) = ctx.max_depth() {
            if task.path.depth() > max_depth {
                ctx.push_error(
                    FieldError::new(format!(
                        "Query exceeds the maximum depth of {max_depth}"
                    ))
                    .at_path(&task.path)
                    .at_pos(task.selection.pos()),
                );
                if !task.slot.propagate_null() {
                    ctx.null_data();
                }
                continue;
            }
        }

        runnable.push(task);
    }

    // Phase (i): start. Each resolver future runs to its first suspension
    // point, so batch registrations land before the sync below.
    let mut futures: Vec<_> = runnable
        .iter()
        .map(|task| Box::pin(maybe_done(resolve_task(ctx, task))))
        .collect();
    for future in futures.iter_mut() {
        let _ = poll_immediate(future.as_mut()).await;
    }

    // Phase (ii): batch-sync, once per wave.
    if let Some(queue) = ctx.batch_queue() {
        if queue.has_pending() {
            queue.trigger_all().await;
        }
    }

    // Phase (iii): finish. Tasks that registered batch work after the
    // sync point get an opportunistic re-trigger instead of a deadlock.
    loop {
        let mut all_done = true;
        for future in futures.iter_mut() {
            if poll_immediate(future.as_mut()).await.is_none() {
                all_done = false;
            }
        }
        if all_done {
            break;
        }
        match ctx.batch_queue() {
            Some(queue) if queue.has_pending() => queue.trigger_all().await,
            _ => {
                join_all(futures.iter_mut().map(|future| future.as_mut())).await;
                break;
            }
        }
    }

    let mut next = vec![];
    for (task, future) in runnable.iter().zip(futures.iter_mut()) {
        // The loop above ran every future to completion.
        let outcome = future.as_mut().take_output().unwrap();
        let declared_type = &task
            .selection
            .definition
            .as_ref()
            .unwrap()
            .ty;
        complete_value(
            ctx,
            declared_type,
            outcome,
            &task.selection,
            &task.source,
            &task.path,
            &task.slot,
            &mut next,
        )
        .await;
    }

    next
}

/// Invoke one task's resolver: coerce its arguments, build the resolver
/// context, and run the delegate (or the default parent-property lookup)
/// under the request's cancellation scope.
async fn resolve_task(ctx: &ExecutionContext, task: &ResolverTask) -> Result<Val, FieldError> {
    let selection = &task.selection;
    // Tasks without a definition (__typename) never reach the wave body.
    let definition = selection.definition.as_ref().unwrap();

    let coercer = ArgumentCoercer::new(
        ctx.schema(),
        ctx.variables(),
        selection.field_name(),
        selection.pos(),
    );
    let arguments = match coercer.coerce(&definition.arguments, &selection.field.node.arguments)
    {
        Ok(arguments) => arguments,
        Err(errors) => {
            // The first failure travels through the completer; the rest
            // go straight to the sink so none is lost.
            let mut field_errors = errors
                .iter()
                .map(|error| FieldError::from(error).at_path(&task.path));
            let first = field_errors.next().unwrap();
            for error in field_errors {
                ctx.push_error(error);
            }
            return Err(first);
        }
    };

    match &definition.resolver {
        None => Ok(default_resolve(task, &definition.name)),
        Some(resolver) => {
            let resolver_context = ResolverContext {
                execution: ctx,
                selection: selection.as_ref(),
                source: &task.source,
                path: &task.path,
                arguments,
            };
            tokio::select! {
                biased;
                _ = ctx.cancellation().cancelled() => Err(FieldError::new(
                    "Operation was cancelled",
                )
                .at_path(&task.path)),
                result = resolver.resolve_field(&resolver_context) => {
                    result.map_err(|error| {
                        ctx.resolver_failure(error, &task.path, selection.pos())
                    })
                }
            }
        }
    }
}

/// A field without a resolver reads the equally named property off its
/// parent value.
fn default_resolve(task: &ResolverTask, field_name: &str) -> Val {
    task.source
        .peek()
        .and_then(|parent| parent.get(field_name))
        .cloned()
        .unwrap_or(Val::Null)
}
