// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;
use std::sync::Arc;

use serde::{Serialize, Serializer};

/// One step of a response path: a field response key or a list index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl Serialize for PathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PathSegment::Field(name) => serializer.serialize_str(name),
            PathSegment::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

/// Immutable address of a value in the response tree: a cheap handle
/// over a parent-linked node.
///
/// Paths are extended by appending, never mutated; siblings share their
/// ancestor nodes. `depth` counts field segments only, which is what the
/// wave scheduler's depth limit is measured against.
#[derive(Clone, Debug)]
pub struct ResponsePath(Arc<PathNode>);

#[derive(Debug)]
struct PathNode {
    parent: Option<ResponsePath>,
    segment: PathSegment,
    depth: usize,
}

impl ResponsePath {
    pub fn root(field: impl Into<String>) -> Self {
        ResponsePath(Arc::new(PathNode {
            parent: None,
            segment: PathSegment::Field(field.into()),
            depth: 1,
        }))
    }

    pub fn field(&self, name: impl Into<String>) -> Self {
        ResponsePath(Arc::new(PathNode {
            parent: Some(self.clone()),
            segment: PathSegment::Field(name.into()),
            depth: self.0.depth + 1,
        }))
    }

    pub fn index(&self, index: usize) -> Self {
        ResponsePath(Arc::new(PathNode {
            parent: Some(self.clone()),
            segment: PathSegment::Index(index),
            depth: self.0.depth,
        }))
    }

    pub fn depth(&self) -> usize {
        self.0.depth
    }

    pub fn segment(&self) -> &PathSegment {
        &self.0.segment
    }

    /// Root-first list of segments, as rendered in error payloads.
    pub fn to_segments(&self) -> Vec<PathSegment> {
        let mut segments = match &self.0.parent {
            Some(parent) => parent.to_segments(),
            None => vec![],
        };
        segments.push(self.0.segment.clone());
        segments
    }
}

impl PartialEq for ResponsePath {
    fn eq(&self, other: &Self) -> bool {
        self.0.segment == other.0.segment
            && match (&self.0.parent, &other.0.parent) {
                (None, None) => true,
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
    }
}

impl Eq for ResponsePath {}

impl Display for ResponsePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(parent) = &self.0.parent {
            write!(f, "{parent}.")?;
        }
        match &self.0.segment {
            PathSegment::Field(name) => write!(f, "{name}"),
            PathSegment::Index(index) => write!(f, "{index}"),
        }
    }
}
