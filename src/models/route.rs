use std::collections::BTreeMap;

use super::path::LogicalPath;

/// Route key used when the location fragment is empty.
pub const DEFAULT_ROUTE: &str = "/";

/// Extract the route key from a location fragment.
///
/// Accepts either the raw fragment (`#/projects`) or the part after the `#`.
/// An empty fragment maps to [`DEFAULT_ROUTE`].
pub fn route_from_hash(hash: &str) -> String {
    let route = hash.strip_prefix('#').unwrap_or(hash);
    if route.is_empty() {
        DEFAULT_ROUTE.to_string()
    } else {
        route.to_string()
    }
}

/// Result of resolving a route key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub path: LogicalPath,
    /// `false` when the key was unknown and the not-found path was substituted.
    pub matched: bool,
}

/// Immutable mapping from route keys to page components.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: BTreeMap<String, LogicalPath>,
    not_found: LogicalPath,
}

impl RouteTable {
    pub fn new(
        routes: impl IntoIterator<Item = (String, LogicalPath)>,
        not_found: LogicalPath,
    ) -> Self {
        Self {
            routes: routes.into_iter().collect(),
            not_found,
        }
    }

    /// Look up a route key, falling back to the not-found page.
    pub fn resolve(&self, route: &str) -> ResolvedRoute {
        match self.routes.get(route) {
            Some(path) => ResolvedRoute {
                path: path.clone(),
                matched: true,
            },
            None => ResolvedRoute {
                path: self.not_found.clone(),
                matched: false,
            },
        }
    }

    pub fn not_found(&self) -> &LogicalPath {
        &self.not_found
    }

    /// Routes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LogicalPath)> {
        self.routes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
