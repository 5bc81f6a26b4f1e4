// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

pub mod collector;
pub mod context;
pub mod output;
pub mod subscription;
pub mod task;

pub(crate) mod completion;
pub(crate) mod strategy;

pub use collector::{CollectedFields, FieldSelection, SelectionCollector};
pub use context::ExecutionContext;
pub use subscription::{SubscriptionRequest, SubscriptionSource};
pub use task::{ResolverContext, ResolverTask, ServiceMap, SourceStack};
