// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_graphql_parser::types::{ExecutableDocument, SelectionSet};
use async_graphql_parser::Positioned;
use tokio_util::sync::CancellationToken;

use crate::error::{FieldError, ResolverError};
use crate::loader::BatchFetchQueue;
use crate::path::ResponsePath;
use crate::schema::{ObjectType, Schema};
use crate::validation::variables::VariableCollection;
use crate::value::Val;

use super::collector::{CollectedFields, SelectionCollector};
use super::task::ServiceMap;

/// Per-request execution state: the schema and document being executed,
/// the coerced variables, the error sink, the cancellation scope, and
/// the memoized selection collections. One per request; mutated only by
/// error appends and the collection memo.
pub struct ExecutionContext {
    schema: Arc<Schema>,
    document: Arc<ExecutableDocument>,
    variables: VariableCollection,
    root_value: Val,
    services: Arc<ServiceMap>,
    batch_queue: Option<Arc<dyn BatchFetchQueue>>,
    cancellation: CancellationToken,
    max_depth: Option<usize>,
    expose_internal_errors: bool,
    errors: Mutex<Vec<FieldError>>,
    data_nulled: AtomicBool,
    collected: tokio::sync::Mutex<HashMap<CollectionKey, Arc<CollectedFields>>>,
}

/// A selection set is identified by its source position; together with
/// the concrete type name that pins down one flattening.
type CollectionKey = (String, usize, usize);

#[allow(clippy::too_many_arguments)]
impl ExecutionContext {
    pub(crate) fn new(
        schema: Arc<Schema>,
        document: Arc<ExecutableDocument>,
        variables: VariableCollection,
        root_value: Val,
        services: Arc<ServiceMap>,
        batch_queue: Option<Arc<dyn BatchFetchQueue>>,
        cancellation: CancellationToken,
        max_depth: Option<usize>,
        expose_internal_errors: bool,
    ) -> Self {
        Self {
            schema,
            document,
            variables,
            root_value,
            services,
            batch_queue,
            cancellation,
            max_depth,
            expose_internal_errors,
            errors: Mutex::new(vec![]),
            data_nulled: AtomicBool::new(false),
            collected: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// A fresh context for one subscription event: same schema, document,
    /// and variables; new root value, error sink, and a linked
    /// cancellation scope.
    pub(crate) fn child_for_event(&self, root_value: Val) -> Self {
        Self::new(
            self.schema.clone(),
            self.document.clone(),
            self.variables.clone(),
            root_value,
            self.services.clone(),
            self.batch_queue.clone(),
            self.cancellation.child_token(),
            self.max_depth,
            self.expose_internal_errors,
        )
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn variables(&self) -> &VariableCollection {
        &self.variables
    }

    pub fn root_value(&self) -> &Val {
        &self.root_value
    }

    pub(crate) fn services(&self) -> &ServiceMap {
        &self.services
    }

    pub(crate) fn batch_queue(&self) -> Option<&Arc<dyn BatchFetchQueue>> {
        self.batch_queue.as_ref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub(crate) fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// Flatten `selection_set` against `object`, memoized per (type,
    /// position). Collection errors are recorded once, when the entry is
    /// first computed.
    pub(crate) async fn collect_fields(
        &self,
        object: &ObjectType,
        selection_set: &Positioned<SelectionSet>,
    ) -> Arc<CollectedFields> {
        let key = (
            object.name.clone(),
            selection_set.pos.line,
            selection_set.pos.column,
        );

        let mut collected = self.collected.lock().await;
        if let Some(cached) = collected.get(&key) {
            return cached.clone();
        }

        let collector =
            SelectionCollector::new(&self.schema, &self.variables, &self.document.fragments);
        let result = Arc::new(collector.collect(object, selection_set));
        for error in &result.errors {
            self.push_error(FieldError::from(error));
        }
        collected.insert(key, result.clone());
        result
    }

    pub(crate) fn push_error(&self, error: FieldError) {
        self.errors.lock().unwrap().push(error);
    }

    /// Convert a resolver failure into a response error. Resolver
    /// messages are internal detail unless the engine was configured to
    /// expose them.
    pub(crate) fn resolver_failure(
        &self,
        error: ResolverError,
        path: &ResponsePath,
        pos: async_graphql_parser::Pos,
    ) -> FieldError {
        let message = if self.expose_internal_errors {
            error.message
        } else {
            "Internal server error".to_string()
        };
        let mut field_error = FieldError::new(message).at_path(path).at_pos(pos);
        if let Some(extensions) = error.extensions {
            field_error = field_error.with_extensions(extensions);
        }
        field_error
    }

    /// A non-null violation reached the response root: the entire data
    /// payload is null.
    pub(crate) fn null_data(&self) {
        self.data_nulled.store(true, Ordering::Relaxed);
    }

    pub(crate) fn data_is_nulled(&self) -> bool {
        self.data_nulled.load(Ordering::Relaxed)
    }

    pub(crate) fn take_errors(&self) -> Vec<FieldError> {
        std::mem::take(&mut *self.errors.lock().unwrap())
    }
}
