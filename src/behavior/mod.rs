//! Behavior lifecycle protocol.
//!
//! A component's behavior resource, once attached, registers a [`Behavior`]
//! through the [`Registrar`] it is handed. The owning descriptor keeps that
//! handle, calls [`Behavior::run`] every time the component is mounted and
//! [`Behavior::cleanup`] when it is unmounted.
//!
//! Scheduled work cannot be killed from outside, so background tasks receive
//! a [`CancelToken`] and must check it before rescheduling themselves.

mod typing;

use std::collections::HashMap;

pub use tokio_util::sync::CancellationToken as CancelToken;
pub use typing::{TypingConfig, TypingEffect};

use crate::dom::{Document, NodeId, SharedDocument};
use crate::models::LogicalPath;

/// What a behavior can reach while running.
#[derive(Clone)]
pub struct BehaviorContext {
    pub document: SharedDocument,
    pub component: LogicalPath,
    /// Root element of the mounted component.
    pub root: NodeId,
}

/// Runtime object registered by a behavior resource.
pub trait Behavior {
    /// Start background activity. Called on every mount, including remounts
    /// from cache after a [`cleanup`](Behavior::cleanup).
    fn run(&mut self, ctx: &BehaviorContext);

    /// Cancel every pending scheduled task and restore whatever visible
    /// state the behavior changed.
    fn cleanup(&mut self, document: &mut Document);
}

/// Registration handle given to a behavior resource when it executes.
pub struct Registrar<'a> {
    component: &'a LogicalPath,
    source: &'a str,
    registered: Option<Box<dyn Behavior>>,
}

impl<'a> Registrar<'a> {
    fn new(component: &'a LogicalPath, source: &'a str) -> Self {
        Self {
            component,
            source,
            registered: None,
        }
    }

    /// Component whose behavior resource is executing.
    pub fn component(&self) -> &LogicalPath {
        self.component
    }

    /// Text of the behavior resource.
    pub fn source(&self) -> &str {
        self.source
    }

    /// Register the component's behavior. A second registration replaces the first.
    pub fn register(&mut self, behavior: impl Behavior + 'static) {
        if self.registered.is_some() {
            tracing::warn!("{} registered more than one behavior", self.component);
        }
        self.registered = Some(Box::new(behavior));
    }
}

type Factory = Box<dyn Fn(&mut Registrar<'_>)>;

/// Behaviors available to behavior resources, keyed by resource base name.
///
/// The base name is the last segment of the component's logical path, so
/// `routes/home/home.js` executes the entry registered as `home`.
#[derive(Default)]
pub struct BehaviorCatalog {
    factories: HashMap<String, Factory>,
}

impl BehaviorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the behaviors shipped with this crate.
    pub fn with_defaults() -> Self {
        Self::new().with("home", |registrar| {
            registrar.register(TypingEffect::new(TypingConfig::default()))
        })
    }

    pub fn insert(&mut self, name: impl Into<String>, factory: impl Fn(&mut Registrar<'_>) + 'static) {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn with(mut self, name: impl Into<String>, factory: impl Fn(&mut Registrar<'_>) + 'static) -> Self {
        self.insert(name, factory);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Execute a component's behavior resource and return what it registered.
    pub fn execute(&self, component: &LogicalPath, source: &str) -> Option<Box<dyn Behavior>> {
        let Some(factory) = self.factories.get(component.basename()) else {
            tracing::debug!("No behavior registered for {}", component);
            return None;
        };

        let mut registrar = Registrar::new(component, source);
        factory(&mut registrar);
        if registrar.registered.is_none() {
            tracing::debug!("Behavior resource for {} registered nothing", component);
        }
        registrar.registered
    }
}

impl std::fmt::Debug for BehaviorCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("BehaviorCatalog")
            .field("behaviors", &names)
            .finish()
    }
}
