// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;

use crate::error::ResolverError;
use crate::execution::ResolverContext;
use crate::value::Val;

/// A field's resolver delegate, bound into the schema by the schema
/// builder. Produces the field's raw value given the resolver context
/// (coerced arguments, parent value, request resources); the completer
/// turns that raw value into the result tree.
#[async_trait]
pub trait FieldResolver: Send + Sync {
    async fn resolve_field(&self, ctx: &ResolverContext<'_>) -> Result<Val, ResolverError>;
}

/// Adapter for synchronous resolver functions.
///
/// ```ignore
/// FieldDefinition::new("answer", Type::new("Int!").unwrap())
///     .with_resolver(FnResolver(|_ctx| Ok(Val::Number(42.into()))))
/// ```
pub struct FnResolver<F>(pub F);

#[async_trait]
impl<F> FieldResolver for FnResolver<F>
where
    F: Fn(&ResolverContext<'_>) -> Result<Val, ResolverError> + Send + Sync,
{
    async fn resolve_field(&self, ctx: &ResolverContext<'_>) -> Result<Val, ResolverError> {
        (self.0)(ctx)
    }
}
