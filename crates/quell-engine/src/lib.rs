// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Request-execution core for a typed, hierarchical query language.
//!
//! Given a parsed document and a schema whose field definitions carry
//! resolver delegates, the engine resolves each requested field,
//! assembles an insertion-ordered result tree mirroring the query shape,
//! and enforces the null-propagation and input-coercion rules of the
//! language. Scheduling is a cooperative wavefront: each level of the
//! query tree starts all of its resolvers, synchronizes any batched
//! fetches once, and only then awaits results.
//!
//! The parser ([`async_graphql_parser`]) and the schema builder are
//! external collaborators: this crate consumes their output and exposes
//! [`Engine::execute`] / [`Engine::subscribe`] plus the collaborator
//! traits ([`loader::BatchFetchQueue`], [`SubscriptionSource`]).

pub mod cache;
pub mod engine;
pub mod error;
pub mod execution;
pub mod field_resolver;
pub mod loader;
pub mod path;
pub mod response;
pub mod schema;
pub mod validation;
pub mod value;

pub use engine::{Engine, EngineOptions, OperationRequest};
pub use error::{ExecutionError, FieldError, ResolverError, ValidationError};
pub use execution::{ResolverContext, ServiceMap, SubscriptionRequest, SubscriptionSource};
pub use field_resolver::{FieldResolver, FnResolver};
pub use response::QueryResponse;
pub use schema::Schema;
pub use value::Val;
