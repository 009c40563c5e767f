//! LRU List Module
//!
//! Doubly-linked recency list with an O(1) key index.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use generational_arena::{Arena, Index};

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: Arc<V>,
    prev: Option<Index>,
    next: Option<Index>,
}

// == Recency List ==
/// Tracks entries in access order.
///
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// The `index` map always holds exactly the keys linked into the list.
#[derive(Debug)]
pub(crate) struct RecencyList<K, V> {
    /// Node storage
    nodes: Arena<Node<K, V>>,
    /// Key to node position
    index: HashMap<K, Index>,
    head: Option<Index>,
    tail: Option<Index>,
}

impl<K, V> RecencyList<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates a new empty recency list.
    pub fn new() -> Self {
        Self {
            nodes: Arena::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    fn unlink(&mut self, idx: Index) {
        let (prev, next) = {
            let node = &self.nodes[idx];
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }
    }

    fn link_front(&mut self, idx: Index) {
        let old_head = self.head;
        {
            let node = &mut self.nodes[idx];
            node.prev = None;
            node.next = old_head;
        }
        if let Some(h) = old_head {
            self.nodes[h].prev = Some(idx);
        }
        self.head = Some(idx);
        if self.tail.is_none() {
            self.tail = Some(idx);
        }
    }

    // == Push Front ==
    /// Inserts or replaces `key` and moves it to the front.
    ///
    /// Returns the previous value when the key was already present.
    pub fn push_front(&mut self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        if let Some(&idx) = self.index.get(&key) {
            let old = std::mem::replace(&mut self.nodes[idx].value, value);
            self.move_to_front(&key);
            return Some(old);
        }

        let idx = self.nodes.insert(Node {
            key: key.clone(),
            value,
            prev: None,
            next: None,
        });
        self.index.insert(key, idx);
        self.link_front(idx);
        None
    }

    // == Move To Front ==
    /// Marks a key as most recently used. Returns false if absent.
    pub fn move_to_front(&mut self, key: &K) -> bool {
        match self.index.get(key) {
            Some(&idx) => {
                if self.head != Some(idx) {
                    self.unlink(idx);
                    self.link_front(idx);
                }
                true
            }
            None => false,
        }
    }

    // == Get ==
    /// Returns the value for a key without changing order.
    pub fn get(&self, key: &K) -> Option<&Arc<V>> {
        self.index.get(key).map(|&idx| &self.nodes[idx].value)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    pub fn pop_back(&mut self) -> Option<(K, Arc<V>)> {
        let idx = self.tail?;
        self.unlink(idx);
        let node = self
            .nodes
            .remove(idx)
            .expect("recency list tail points at a freed node");
        self.index.remove(&node.key);
        Some((node.key, node.value))
    }

    // == Peek Back ==
    /// Returns the least recently used key without removing it.
    #[cfg(test)]
    pub fn peek_back(&self) -> Option<&K> {
        self.tail.map(|idx| &self.nodes[idx].key)
    }

    // == Length ==
    /// Returns the number of linked entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    // == Keys ==
    /// Returns keys from most to least recently used.
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let node = &self.nodes[idx];
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }
}
