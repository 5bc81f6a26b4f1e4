// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

/// Take a user submitted query along with the operation name and
/// variables (from the request payload) and transform the query into an
/// executable form (in the process, validate the query).
pub mod document_validator;

pub mod arguments;
pub mod input;
pub mod variables;
