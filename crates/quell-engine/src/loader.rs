// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use async_trait::async_trait;

/// Trigger contract of an external batched-fetch ("data loader")
/// provider.
///
/// Resolvers register same-kind fetch requests with the provider while a
/// wave starts; the scheduler calls [`trigger_all`](Self::trigger_all)
/// once per wave, after every task has started and before any result is
/// awaited, so that all registered units execute together. The provider
/// resets its pending set as part of the trigger.
#[async_trait]
pub trait BatchFetchQueue: Send + Sync {
    /// Whether any fetch units registered since the last trigger are
    /// still waiting.
    fn has_pending(&self) -> bool;

    /// Execute every pending unit together, complete their waiters, and
    /// reset.
    async fn trigger_all(&self);
}
