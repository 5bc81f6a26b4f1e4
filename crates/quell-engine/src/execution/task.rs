// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

use crate::loader::BatchFetchQueue;
use crate::path::ResponsePath;
use crate::value::Val;

use super::collector::FieldSelection;
use super::context::ExecutionContext;
use super::output::OutputSlot;

/// Persistent stack of ancestor values. Pushing shares the tail, so
/// sibling tasks see the same ancestors without copying.
#[derive(Clone, Default)]
pub struct SourceStack(Option<Arc<SourceNode>>);

struct SourceNode {
    value: Val,
    parent: Option<Arc<SourceNode>>,
}

impl SourceStack {
    pub fn root(value: Val) -> Self {
        SourceStack(None).push(value)
    }

    pub fn push(&self, value: Val) -> Self {
        SourceStack(Some(Arc::new(SourceNode {
            value,
            parent: self.0.clone(),
        })))
    }

    /// The innermost value: the parent of the field being resolved.
    pub fn peek(&self) -> Option<&Val> {
        self.0.as_ref().map(|node| &node.value)
    }

    /// Innermost-first walk of the ancestor values.
    pub fn ancestors(&self) -> impl Iterator<Item = &Val> {
        std::iter::successors(self.0.as_deref(), |node| node.parent.as_deref())
            .map(|node| &node.value)
    }
}

/// One unit of scheduled work: resolve `selection` on `object_type`
/// against the top of `source`, and complete the result into `slot`.
/// Consumed exactly once by the wave it was enqueued for.
pub struct ResolverTask {
    pub source: SourceStack,
    pub object_type: String,
    pub selection: Arc<FieldSelection>,
    pub path: ResponsePath,
    pub slot: Arc<OutputSlot>,
}

/// Request-scoped registry of side resources (database pools, clients,
/// auth info) that resolvers look up by type.
#[derive(Default)]
pub struct ServiceMap {
    services: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceMap {
    pub fn insert<T: Any + Send + Sync>(&mut self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .cloned()
            .and_then(|service| service.downcast::<T>().ok())
    }
}

/// What a resolver delegate sees: the field it is resolving, its coerced
/// arguments, the ancestor values, and the request-scoped resources.
pub struct ResolverContext<'a> {
    pub(crate) execution: &'a ExecutionContext,
    pub(crate) selection: &'a FieldSelection,
    pub(crate) source: &'a SourceStack,
    pub(crate) path: &'a ResponsePath,
    pub(crate) arguments: IndexMap<String, Val>,
}

const NULL: Val = Val::Null;

impl<'a> ResolverContext<'a> {
    pub fn argument(&self, name: &str) -> Option<&Val> {
        self.arguments.get(name)
    }

    pub fn arguments(&self) -> &IndexMap<String, Val> {
        &self.arguments
    }

    /// The parent value the field is being resolved on.
    pub fn parent(&self) -> &Val {
        self.source.peek().unwrap_or(&NULL)
    }

    pub fn source(&self) -> &SourceStack {
        self.source
    }

    pub fn field_name(&self) -> &str {
        self.selection.field_name()
    }

    pub fn path(&self) -> &ResponsePath {
        self.path
    }

    pub fn service<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.execution.services().get::<T>()
    }

    /// The request's batched-fetch provider, if one was attached.
    pub fn batch_queue(&self) -> Option<&Arc<dyn BatchFetchQueue>> {
        self.execution.batch_queue()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        self.execution.cancellation()
    }
}
