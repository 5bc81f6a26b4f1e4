// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use serde::Serialize;

use crate::error::FieldError;
use crate::value::Val;

/// The outcome of executing one operation: whatever data survived
/// null-bubbling, in selection order, plus every collected error. A
/// request-level failure (validation, coercion) carries no data at all.
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Val>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

impl QueryResponse {
    pub fn new(data: Option<Val>, errors: Vec<FieldError>) -> Self {
        Self { data, errors }
    }

    pub fn request_failed(errors: Vec<FieldError>) -> Self {
        Self { data: None, errors }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
