// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;
use std::time::Duration;

use async_graphql_parser::types::{ExecutableDocument, OperationType};
use async_graphql_parser::Pos;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::{error, instrument};

use crate::cache::CacheStorage;
use crate::error::{ExecutionError, FieldError, ValidationError};
use crate::execution::context::ExecutionContext;
use crate::execution::strategy::{execute_mutation, execute_query, seed_root_tasks};
use crate::execution::subscription::{execute_subscription, SubscriptionSource};
use crate::execution::task::ServiceMap;
use crate::loader::BatchFetchQueue;
use crate::response::QueryResponse;
use crate::schema::Schema;
use crate::validation::document_validator::{DocumentValidator, ValidatedOperation};
use crate::value::Val;

/// Engine-wide tunables, fixed at construction.
#[derive(Clone)]
pub struct EngineOptions {
    pub document_cache_capacity: usize,
    pub max_depth: Option<usize>,
    pub timeout: Option<Duration>,
    pub expose_internal_errors: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            document_cache_capacity: 128,
            max_depth: None,
            timeout: None,
            expose_internal_errors: false,
        }
    }
}

impl EngineOptions {
    pub fn with_document_cache_capacity(mut self, capacity: usize) -> Self {
        self.document_cache_capacity = capacity;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_expose_internal_errors(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }
}

/// One request against the engine. `query` is the only required part;
/// everything else is wiring the caller may attach per request.
pub struct OperationRequest {
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: Option<Map<String, Value>>,
    pub root_value: Option<Val>,
    pub services: ServiceMap,
    pub batch_queue: Option<Arc<dyn BatchFetchQueue>>,
    pub subscription_source: Option<Arc<dyn SubscriptionSource>>,
    pub cancellation: Option<CancellationToken>,
}

impl OperationRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: None,
            root_value: None,
            services: ServiceMap::default(),
            batch_queue: None,
            subscription_source: None,
            cancellation: None,
        }
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn with_variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = Some(variables);
        self
    }

    pub fn with_root_value(mut self, root_value: Val) -> Self {
        self.root_value = Some(root_value);
        self
    }

    pub fn with_services(mut self, services: ServiceMap) -> Self {
        self.services = services;
        self
    }

    pub fn with_batch_queue(mut self, batch_queue: Arc<dyn BatchFetchQueue>) -> Self {
        self.batch_queue = Some(batch_queue);
        self
    }

    pub fn with_subscription_source(mut self, source: Arc<dyn SubscriptionSource>) -> Self {
        self.subscription_source = Some(source);
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

/// The process-wide execution engine: owns the schema, the options, and
/// the parsed-document cache. A server constructs one at startup and
/// passes a reference into every request.
pub struct Engine {
    schema: Arc<Schema>,
    options: EngineOptions,
    document_cache: CacheStorage<String, Arc<ExecutableDocument>>,
}

impl Engine {
    pub fn new(schema: Schema) -> Self {
        Self::with_options(schema, EngineOptions::default())
    }

    pub fn with_options(schema: Schema, options: EngineOptions) -> Self {
        Self {
            schema: Arc::new(schema),
            document_cache: CacheStorage::new(options.document_cache_capacity),
            options,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Execute a query or mutation operation. Request-level failures
    /// (parse, operation selection, variable coercion) produce a
    /// data-less response; everything past that point produces partial
    /// data plus collected errors.
    #[instrument(name = "Engine::execute", skip_all)]
    pub async fn execute(&self, request: OperationRequest) -> QueryResponse {
        match self.execute_inner(request).await {
            Ok(response) => response,
            Err(ExecutionError::Validation(errors)) => {
                QueryResponse::request_failed(errors.iter().map(FieldError::from).collect())
            }
            Err(other) => QueryResponse::request_failed(vec![FieldError::new(other.to_string())]),
        }
    }

    async fn execute_inner(
        &self,
        request: OperationRequest,
    ) -> Result<QueryResponse, ExecutionError> {
        let document = self.parse_document(&request.query).await?;

        let validator = DocumentValidator::new(
            &self.schema,
            request.operation_name.clone(),
            request.variables.clone(),
        );
        let ValidatedOperation {
            name: _,
            typ,
            variables,
            selection_set,
        } = validator
            .validate(&document)
            .map_err(ExecutionError::Validation)?;

        if typ == OperationType::Subscription {
            return Err(ExecutionError::SubscriptionViaExecute);
        }

        let root_type = self
            .schema
            .root_type(typ)
            .ok_or(ValidationError::RootTypeNotFound(selection_set.pos))?;

        let caller_cancellation = request.cancellation.unwrap_or_default();
        // The operation runs under a child scope so a timeout can abort
        // this request without touching the caller's token.
        let scope = caller_cancellation.child_token();

        let ctx = ExecutionContext::new(
            self.schema.clone(),
            document.clone(),
            variables,
            request.root_value.unwrap_or(Val::Null),
            Arc::new(request.services),
            request.batch_queue,
            scope.clone(),
            self.options.max_depth,
            self.options.expose_internal_errors,
        );

        let (output, tasks) = seed_root_tasks(&ctx, root_type, selection_set).await;

        let work = async {
            match typ {
                OperationType::Query => execute_query(&ctx, tasks).await,
                OperationType::Mutation => execute_mutation(&ctx, tasks).await,
                OperationType::Subscription => unreachable!("rejected above"),
            }
        };

        match self.options.timeout {
            None => work.await,
            Some(limit) => {
                if tokio::time::timeout(limit, work).await.is_err() {
                    scope.cancel();
                    ctx.push_error(FieldError::new("Operation timed out"));
                }
            }
        }

        if caller_cancellation.is_cancelled() {
            ctx.push_error(FieldError::new("Operation was cancelled"));
        }

        let data = if ctx.data_is_nulled() {
            Val::Null
        } else {
            output.freeze()
        };
        Ok(QueryResponse::new(Some(data), ctx.take_errors()))
    }

    /// Execute a subscription operation: returns one discrete response
    /// per event pulled from the subscription source.
    #[instrument(name = "Engine::subscribe", skip_all)]
    pub async fn subscribe(
        &self,
        request: OperationRequest,
    ) -> Result<BoxStream<'static, QueryResponse>, ExecutionError> {
        let document = self.parse_document(&request.query).await?;

        let validator = DocumentValidator::new(
            &self.schema,
            request.operation_name.clone(),
            request.variables.clone(),
        );
        let ValidatedOperation {
            name: _,
            typ,
            variables,
            selection_set,
        } = validator
            .validate(&document)
            .map_err(ExecutionError::Validation)?;

        if typ != OperationType::Subscription {
            return Err(ExecutionError::NotASubscription);
        }

        let source = request
            .subscription_source
            .ok_or(ExecutionError::SubscriptionSourceMissing)?;

        let selection_set = selection_set.clone();
        let caller_cancellation = request.cancellation.unwrap_or_default();
        let scope = caller_cancellation.child_token();

        let ctx = ExecutionContext::new(
            self.schema.clone(),
            document.clone(),
            variables,
            request.root_value.unwrap_or(Val::Null),
            Arc::new(request.services),
            request.batch_queue,
            scope,
            self.options.max_depth,
            self.options.expose_internal_errors,
        );

        execute_subscription(ctx, selection_set, source).await
    }

    /// Parse the query text, reusing the cached document when the same
    /// text was executed before. Parse failures are not cached.
    async fn parse_document(
        &self,
        query: &str,
    ) -> Result<Arc<ExecutableDocument>, ExecutionError> {
        if let Some(document) = self.document_cache.get(&query.to_string()).await {
            return Ok(document);
        }
        let document = Arc::new(parse_query(query)?);
        self.document_cache
            .insert(query.to_string(), document.clone())
            .await;
        Ok(document)
    }
}

#[instrument(name = "engine::parse_query", skip_all)]
fn parse_query(query: &str) -> Result<ExecutableDocument, ValidationError> {
    async_graphql_parser::parse_query(query).map_err(|parse_error| {
        error!(%parse_error, "Failed to parse query");
        let (message, pos1, pos2) = match parse_error {
            async_graphql_parser::Error::Syntax {
                message,
                start,
                end,
            } => {
                // The syntax message is formatted with newlines; escape
                // them so the response stays single-line.
                let message = message.escape_debug();
                (format!("Syntax error: {message}"), start, end)
            }
            async_graphql_parser::Error::MultipleRoots { root, schema, pos } => {
                (format!("Multiple roots of {root} type"), schema, Some(pos))
            }
            async_graphql_parser::Error::MissingQueryRoot { pos } => {
                ("Missing query root".to_string(), pos, None)
            }
            async_graphql_parser::Error::MultipleOperations {
                anonymous,
                operation,
            } => (
                "Multiple operations".to_string(),
                anonymous,
                Some(operation),
            ),
            async_graphql_parser::Error::OperationDuplicated {
                operation: _,
                first,
                second,
            } => ("Operation duplicated".to_string(), first, Some(second)),
            async_graphql_parser::Error::FragmentDuplicated {
                fragment,
                first,
                second,
            } => (
                format!("Fragment {fragment} duplicated"),
                first,
                Some(second),
            ),
            async_graphql_parser::Error::MissingOperation => {
                ("Missing operation".to_string(), Pos::default(), None)
            }
            _ => ("Unknown error".to_string(), Pos::default(), None),
        };

        ValidationError::QueryParsingFailed(message, pos1, pos2)
    })
}
