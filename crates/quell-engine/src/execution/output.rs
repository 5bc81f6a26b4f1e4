// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::value::Val;

/// A result-tree position while execution is in flight. `Pending` slots
/// belong to tasks that have not completed (they freeze to null if the
/// operation is cancelled under them).
#[derive(Debug, Clone)]
pub enum OutputValue {
    Pending,
    Null,
    Leaf(Val),
    List(OutputList),
    Object(OutputObject),
}

/// One level of the ordered result under construction. Keys are inserted
/// as `Pending` in selection order when the enclosing object opens, so
/// sibling completion order never affects response key order.
#[derive(Debug, Clone, Default)]
pub struct OutputObject(Arc<Mutex<IndexMap<String, OutputValue>>>);

impl OutputObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_pending(&self, key: &str) {
        let mut entries = self.0.lock().unwrap();
        entries.insert(key.to_string(), OutputValue::Pending);
    }

    pub fn set(&self, key: &str, value: OutputValue) {
        let mut entries = self.0.lock().unwrap();
        entries.insert(key.to_string(), value);
    }

    /// Freeze into the immutable result value. Pending children freeze to
    /// null (they were abandoned by cancellation or bubbling).
    pub fn freeze(&self) -> Val {
        let entries = self.0.lock().unwrap();
        Val::Object(
            entries
                .iter()
                .map(|(key, value)| (key.clone(), value.freeze()))
                .collect(),
        )
    }
}

/// An ordered sequence under construction; elements keep source
/// iteration order.
#[derive(Debug, Clone)]
pub struct OutputList(Arc<Mutex<Vec<OutputValue>>>);

impl OutputList {
    pub fn with_len(len: usize) -> Self {
        Self(Arc::new(Mutex::new(
            (0..len).map(|_| OutputValue::Pending).collect(),
        )))
    }

    pub fn set(&self, index: usize, value: OutputValue) {
        let mut elements = self.0.lock().unwrap();
        elements[index] = value;
    }

    pub fn freeze(&self) -> Val {
        let elements = self.0.lock().unwrap();
        Val::List(elements.iter().map(OutputValue::freeze).collect())
    }
}

impl OutputValue {
    pub fn freeze(&self) -> Val {
        match self {
            OutputValue::Pending | OutputValue::Null => Val::Null,
            OutputValue::Leaf(value) => value.clone(),
            OutputValue::List(list) => list.freeze(),
            OutputValue::Object(object) => object.freeze(),
        }
    }
}

/// Where a completed value lands, how the declared type treats null
/// there, and the enclosing slot chain that a non-null violation bubbles
/// through.
pub struct OutputSlot {
    target: SlotTarget,
    nullable: bool,
    parent: Option<Arc<OutputSlot>>,
}

pub enum SlotTarget {
    Field { object: OutputObject, key: String },
    Element { list: OutputList, index: usize },
}

impl OutputSlot {
    pub fn field(
        object: OutputObject,
        key: impl Into<String>,
        nullable: bool,
        parent: Option<Arc<OutputSlot>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            target: SlotTarget::Field {
                object,
                key: key.into(),
            },
            nullable,
            parent,
        })
    }

    pub fn element(
        list: OutputList,
        index: usize,
        nullable: bool,
        parent: Option<Arc<OutputSlot>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            target: SlotTarget::Element { list, index },
            nullable,
            parent,
        })
    }

    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn set(&self, value: OutputValue) {
        match &self.target {
            SlotTarget::Field { object, key } => object.set(key, value),
            SlotTarget::Element { list, index } => list.set(*index, value),
        }
    }

    /// Null the nearest enclosing nullable position, starting with this
    /// slot itself. Data beneath the nulled position is orphaned; late
    /// writes into it are harmless. Returns `false` when no nullable
    /// ancestor exists; the whole data payload must be nulled by the
    /// caller.
    #[must_use]
    pub fn propagate_null(&self) -> bool {
        if self.nullable {
            self.set(OutputValue::Null);
            return true;
        }
        match &self.parent {
            Some(parent) => parent.propagate_null(),
            None => false,
        }
    }
}
