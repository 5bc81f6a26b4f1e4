// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_graphql_parser::types::{OperationType, SelectionSet};
use async_graphql_parser::Positioned;
use async_graphql_value::{ConstValue, Name};
use async_stream::stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::instrument;

use crate::error::{ExecutionError, ResolverError, ValidationError};
use crate::response::QueryResponse;
use crate::validation::arguments::ArgumentCoercer;
use crate::value::Val;
use crate::val_object;

use super::context::ExecutionContext;
use super::strategy::{execute_query, seed_root_tasks};

/// The root selection restated as an event-subscription request: the
/// field name plus its coerced arguments as literal nodes.
pub struct SubscriptionRequest {
    pub field_name: String,
    pub arguments: Vec<(Name, ConstValue)>,
}

/// External event-subscription provider. The returned stream is pulled
/// one event at a time; the subscription ends when the stream completes
/// or the operation is cancelled.
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    async fn subscribe(
        &self,
        request: SubscriptionRequest,
    ) -> Result<BoxStream<'static, Val>, ResolverError>;
}

/// Bind the operation's single root selection to the event source and
/// re-run the query strategy once per received event, each time against
/// a fresh context cloned from `ctx` (same schema and variables, new
/// error sink and cancellation scope).
#[instrument(name = "strategy::execute_subscription", skip_all)]
pub(crate) async fn execute_subscription(
    ctx: ExecutionContext,
    selection_set: Positioned<SelectionSet>,
    source: std::sync::Arc<dyn SubscriptionSource>,
) -> Result<BoxStream<'static, QueryResponse>, ExecutionError> {
    let root_type = ctx
        .schema()
        .root_type(OperationType::Subscription)
        .ok_or(ValidationError::RootTypeNotFound(selection_set.pos))?;

    let collected = ctx.collect_fields(root_type, &selection_set).await;
    let mut roots = collected
        .fields
        .iter()
        .filter(|selection| !selection.is_typename());
    let (root_selection, extra) = (roots.next(), roots.next());
    let root_selection = match (root_selection, extra) {
        (Some(root_selection), None) => root_selection,
        _ => {
            return Err(ValidationError::SubscriptionRootNotSingular(selection_set.pos).into())
        }
    };
    // Collected against the subscription root type, so the definition is
    // always present here.
    let definition = root_selection.definition.as_ref().unwrap().clone();

    let coercer = ArgumentCoercer::new(
        ctx.schema(),
        ctx.variables(),
        root_selection.field_name(),
        root_selection.pos(),
    );
    let arguments = coercer
        .coerce(&definition.arguments, &root_selection.field.node.arguments)
        .map_err(ExecutionError::Validation)?;

    let request = SubscriptionRequest {
        field_name: definition.name.clone(),
        arguments: arguments
            .into_iter()
            .map(|(name, value)| (Name::new(name), value.into_const_value()))
            .collect(),
    };

    let mut events = source
        .subscribe(request)
        .await
        .map_err(|e| ExecutionError::SubscriptionSetupFailed(e.message))?;

    let field_name = definition.name.clone();
    let field_has_resolver = definition.resolver.is_some();
    let token = ctx.cancellation().clone();

    let stream = stream! {
        loop {
            let event = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                event = events.next() => event,
            };
            let Some(event) = event else { break };

            // Without a resolver on the root field, the event itself is
            // the field's value: stage it where the default property
            // lookup will find it.
            let root_value = if field_has_resolver || event.get(&field_name).is_some() {
                event
            } else {
                val_object! { field_name.clone() => event }
            };

            let child = ctx.child_for_event(root_value);
            let response = run_event(&child, &selection_set).await;
            yield response;
        }
    };

    Ok(Box::pin(stream))
}

async fn run_event(
    ctx: &ExecutionContext,
    selection_set: &Positioned<SelectionSet>,
) -> QueryResponse {
    // The root type's existence was checked when the subscription was set
    // up, and the schema never changes under a running operation.
    let root_type = ctx
        .schema()
        .root_type(OperationType::Subscription)
        .unwrap();

    let (output, tasks) = seed_root_tasks(ctx, root_type, selection_set).await;
    execute_query(ctx, tasks).await;

    let data = if ctx.data_is_nulled() {
        Val::Null
    } else {
        output.freeze()
    };
    QueryResponse::new(Some(data), ctx.take_errors())
}
