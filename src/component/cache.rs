use std::collections::HashMap;

use super::DescriptorRef;
use crate::models::LogicalPath;

/// Every descriptor that has been loaded, keyed by logical path.
///
/// Entries are never evicted: a site has a bounded number of components and
/// keeping them avoids fetching anything twice.
#[derive(Debug, Default)]
pub struct ComponentCache {
    entries: HashMap<LogicalPath, DescriptorRef>,
}

impl ComponentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &LogicalPath) -> Option<DescriptorRef> {
        self.entries.get(path).cloned()
    }

    pub fn put(&mut self, path: LogicalPath, descriptor: DescriptorRef) {
        self.entries.insert(path, descriptor);
    }

    pub fn contains(&self, path: &LogicalPath) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached paths in sorted order.
    pub fn paths(&self) -> Vec<LogicalPath> {
        let mut paths: Vec<LogicalPath> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }
}
