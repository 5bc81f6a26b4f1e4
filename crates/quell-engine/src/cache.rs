// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::Mutex;

pub trait KeyType: Clone + fmt::Debug + Hash + Eq + Send + Sync {}
pub trait ValueType: Clone + Send + Sync {}

impl<K> KeyType for K where K: Clone + fmt::Debug + Hash + Eq + Send + Sync {}
impl<V> ValueType for V where V: Clone + Send + Sync {}

const NIL: usize = usize::MAX;

struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

struct Recency<K, V> {
    map: HashMap<K, usize>,
    nodes: Vec<Option<Node<K, V>>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    capacity: usize,
}

impl<K: KeyType, V: ValueType> Recency<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            free: vec![],
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    fn node(&self, handle: usize) -> &Node<K, V> {
        self.nodes[handle].as_ref().unwrap()
    }

    fn node_mut(&mut self, handle: usize) -> &mut Node<K, V> {
        self.nodes[handle].as_mut().unwrap()
    }

    fn detach(&mut self, handle: usize) {
        let (prev, next) = {
            let node = self.node(handle);
            (node.prev, node.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.node_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.node_mut(next).prev = prev;
        }
    }

    fn push_front(&mut self, handle: usize) {
        let old_head = self.head;
        {
            let node = self.node_mut(handle);
            node.prev = NIL;
            node.next = old_head;
        }
        if old_head != NIL {
            self.node_mut(old_head).prev = handle;
        }
        self.head = handle;
        if self.tail == NIL {
            self.tail = handle;
        }
    }

    fn promote(&mut self, handle: usize) {
        if self.head != handle {
            self.detach(handle);
            self.push_front(handle);
        }
    }

    fn evict_tail(&mut self) {
        let handle = self.tail;
        if handle == NIL {
            return;
        }
        self.detach(handle);
        let node = self.nodes[handle].take().unwrap();
        self.map.remove(&node.key);
        self.free.push(handle);
    }

    fn insert_front(&mut self, key: K, value: V) {
        if self.map.len() == self.capacity {
            self.evict_tail();
        }
        let node = Node {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        };
        let handle = match self.free.pop() {
            Some(handle) => {
                self.nodes[handle] = Some(node);
                handle
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.map.insert(key, handle);
        self.push_front(handle);
    }
}

/// Fixed-capacity LRU cache: a hash map of (key → rank handle) entries
/// plus a doubly linked recency list over slab-indexed nodes, giving
/// O(1) lookup, promote, and evict. The list mutation is the one guarded
/// critical section.
#[derive(Clone)]
pub struct CacheStorage<K: KeyType, V: ValueType> {
    inner: Arc<Mutex<Recency<K, V>>>,
}

impl<K: KeyType, V: ValueType> CacheStorage<K, V> {
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be non-zero");
        Self {
            inner: Arc::new(Mutex::new(Recency::new(capacity))),
        }
    }

    /// On a hit, promotes the entry to most-recently-used and returns the
    /// stored value without invoking `factory`. On a miss, evicts the
    /// least-recently-touched entry if at capacity, computes the value via
    /// `factory` (at most once per insertion), and stores it.
    pub async fn get_or_insert_with(&self, key: K, factory: impl FnOnce() -> V) -> V {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.map.get(&key).copied() {
            inner.promote(handle);
            return inner.node(handle).value.clone();
        }
        let value = factory();
        inner.insert_front(key, value.clone());
        value
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().await;
        match inner.map.get(key).copied() {
            Some(handle) => {
                inner.promote(handle);
                Some(inner.node(handle).value.clone())
            }
            None => None,
        }
    }

    pub async fn insert(&self, key: K, value: V) {
        let mut inner = self.inner.lock().await;
        match inner.map.get(&key).copied() {
            Some(handle) => {
                inner.node_mut(handle).value = value;
                inner.promote(handle);
            }
            None => inner.insert_front(key, value),
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.map.len()
    }
}
