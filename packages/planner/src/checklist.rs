// ABOUTME: Completion tracking for setup checklist items
// ABOUTME: The keying strategy (position or content hash) is swappable behind CompletionKeying

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::error::{PlannerError, Result};

/// Produces the key a completion mark is stored under.
///
/// Index keys do not survive a regenerated checklist that is reordered or
/// resized; content keys do, as long as the item text is unchanged.
pub trait CompletionKeying: Send + Sync {
    fn key(&self, index: usize, item: &str) -> String;
}

/// Positional keys
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexKeying;

impl CompletionKeying for IndexKeying {
    fn key(&self, index: usize, _item: &str) -> String {
        index.to_string()
    }
}

/// SHA-256 of the whitespace- and case-normalized item text
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentKeying;

impl CompletionKeying for ContentKeying {
    fn key(&self, _index: usize, item: &str) -> String {
        let normalized = item
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase();
        format!("{:x}", Sha256::digest(normalized.as_bytes()))
    }
}

impl CompletionKeying for Box<dyn CompletionKeying> {
    fn key(&self, index: usize, item: &str) -> String {
        (**self).key(index, item)
    }
}

/// Local completion state; never sent to or regenerated by the backend
#[derive(Default)]
pub struct ChecklistTracker<K = IndexKeying> {
    keying: K,
    completed: HashSet<String>,
}

impl<K: CompletionKeying> ChecklistTracker<K> {
    pub fn new(keying: K) -> Self {
        Self {
            keying,
            completed: HashSet::new(),
        }
    }

    /// Flip the mark for `items[index]`; returns the new completion state
    pub fn toggle(&mut self, index: usize, items: &[String]) -> Result<bool> {
        let item = items.get(index).ok_or(PlannerError::IndexOutOfRange {
            index,
            len: items.len(),
        })?;
        let key = self.keying.key(index, item);
        if self.completed.remove(&key) {
            Ok(false)
        } else {
            self.completed.insert(key);
            Ok(true)
        }
    }

    pub fn is_complete(&self, index: usize, items: &[String]) -> bool {
        items
            .get(index)
            .map(|item| self.completed.contains(&self.keying.key(index, item)))
            .unwrap_or(false)
    }

    pub fn completed_count(&self, items: &[String]) -> usize {
        (0..items.len())
            .filter(|&index| self.is_complete(index, items))
            .count()
    }

    pub fn clear(&mut self) {
        self.completed.clear();
    }
}
