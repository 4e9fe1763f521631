use std::collections::HashMap;

use super::DescriptorRef;
use crate::dom::NodeId;
use crate::models::LogicalPath;

/// A descriptor currently attached to the document.
///
/// Persistence belongs to the mount, not the descriptor: a cached component
/// nested in a page one time and in shared chrome the next takes whatever
/// its parent has at that moment.
#[derive(Debug, Clone)]
pub struct MountEntry {
    pub descriptor: DescriptorRef,
    /// Marker element the component replaced, for nested components.
    pub placeholder: Option<NodeId>,
    pub persistent: bool,
    /// Nesting level, 0 for pages and chrome.
    pub depth: usize,
}

/// Descriptors currently attached to the document, keyed by logical path.
#[derive(Debug, Default)]
pub struct MountSet {
    entries: HashMap<LogicalPath, MountEntry>,
}

impl MountSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: LogicalPath, entry: MountEntry) {
        self.entries.insert(path, entry);
    }

    pub fn contains(&self, path: &LogicalPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Remove and return every non-persistent entry, deepest first.
    ///
    /// Each nested component puts its placeholder back before its parent is
    /// taken out. Entries at the same depth come out in path order.
    pub fn drain_transient(&mut self) -> Vec<(LogicalPath, MountEntry)> {
        let transient: Vec<LogicalPath> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.persistent)
            .map(|(path, _)| path.clone())
            .collect();

        let mut drained: Vec<(LogicalPath, MountEntry)> = transient
            .into_iter()
            .filter_map(|path| self.entries.remove(&path).map(|entry| (path, entry)))
            .collect();
        drained.sort_by(|(a, a_entry), (b, b_entry)| {
            b_entry.depth.cmp(&a_entry.depth).then_with(|| a.cmp(b))
        });
        drained
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mounted paths in sorted order.
    pub fn paths(&self) -> Vec<LogicalPath> {
        let mut paths: Vec<LogicalPath> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }
}
