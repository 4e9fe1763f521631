//! Navigation controller.
//!
//! [`App`] owns the document, the component cache and the mount set, and
//! turns route changes into unmount / resolve / mount / attach / enhance
//! passes. Everything runs on one thread: the stores sit behind `RefCell`s
//! that are never borrowed across an `.await`, and a single `navigating`
//! flag turns away navigations requested while one is in flight.

mod outcome;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::{FutureExt, LocalBoxFuture};
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

pub use outcome::{NavigationOutcome, NavigationReport};

use crate::behavior::BehaviorCatalog;
use crate::component::{
    ComponentCache, ComponentDescriptor, DescriptorRef, LoadError, LoadKind, MountEntry, MountSet,
};
use crate::config::SiteConfig;
use crate::dom::{Document, NodeId, SharedDocument};
use crate::enhance::recolor_graphics;
use crate::fetch::Fetcher;
use crate::models::{route_from_hash, ComponentSpec, LogicalPath, RouteTable};

/// Id given to the root element of every routed page.
pub const DEFAULT_PAGE_ID: &str = "container";

/// Id of the element pages are mounted into, when the document has one.
pub const DEFAULT_ROOT_ID: &str = "app";

/// Nested components deeper than this are not mounted.
pub const DEFAULT_MAX_DEPTH: usize = 16;

/// Components produced by one navigation, waiting to be attached.
#[derive(Default)]
struct Batch {
    items: Vec<(DescriptorRef, Option<NodeId>)>,
    mounted: Vec<LogicalPath>,
    fetched: Vec<LogicalPath>,
}

/// Clears the navigating flag however the navigation ends.
struct NavigatingGuard<'a>(&'a Cell<bool>);

impl<'a> NavigatingGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for NavigatingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Route-driven page composer.
pub struct App {
    routes: RouteTable,
    chrome: Vec<ComponentSpec>,
    page_dom_id: String,
    root_id: Option<String>,
    max_depth: usize,
    graphic_timeout: Option<Duration>,
    fetcher: Arc<dyn Fetcher>,
    catalog: BehaviorCatalog,
    document: SharedDocument,
    cache: RefCell<ComponentCache>,
    mounted: RefCell<MountSet>,
    navigating: Cell<bool>,
}

impl App {
    pub fn new(routes: RouteTable, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            routes,
            chrome: Vec::new(),
            page_dom_id: DEFAULT_PAGE_ID.to_string(),
            root_id: Some(DEFAULT_ROOT_ID.to_string()),
            max_depth: DEFAULT_MAX_DEPTH,
            graphic_timeout: None,
            fetcher,
            catalog: BehaviorCatalog::new(),
            document: Document::new().shared(),
            cache: RefCell::new(ComponentCache::new()),
            mounted: RefCell::new(MountSet::new()),
            navigating: Cell::new(false),
        }
    }

    /// Build from site configuration.
    ///
    /// When a content root id is configured, the shell document gets an empty
    /// element with that id to mount pages into. Without one, pages go
    /// straight into `<body>`.
    pub fn from_config(
        config: &SiteConfig,
        fetcher: Arc<dyn Fetcher>,
        catalog: BehaviorCatalog,
    ) -> Self {
        let mut app = Self::new(config.route_table(), fetcher)
            .with_catalog(catalog)
            .with_page_id(config.page_dom_id.clone())
            .with_max_depth(config.max_nesting_depth);

        for component in &config.persistent {
            app = app.with_chrome(component.to_spec());
        }
        if let Some(ms) = config.graphic_timeout_ms {
            app = app.with_graphic_timeout(Duration::from_millis(ms));
        }
        app.root_id = config.root_id.clone();
        if let Some(id) = &config.root_id {
            let mut shell = Document::new();
            let container = shell.create_element("div");
            if let Some(el) = shell.element_mut(container) {
                el.set_attr("id", id.as_str());
            }
            let body = shell.body();
            shell.append_child(body, container);
            app = app.with_document(shell);
        }
        app
    }

    /// Add a persistent component mounted ahead of every page.
    pub fn with_chrome(mut self, spec: ComponentSpec) -> Self {
        self.chrome.push(ComponentSpec {
            persistent: true,
            ..spec
        });
        self
    }

    pub fn with_catalog(mut self, catalog: BehaviorCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_page_id(mut self, id: impl Into<String>) -> Self {
        self.page_dom_id = id.into();
        self
    }

    /// Mount page content into the element with this id when it exists.
    pub fn with_root_id(mut self, id: impl Into<String>) -> Self {
        self.root_id = Some(id.into());
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Give up on graphics that take longer than this during the recolor pass.
    pub fn with_graphic_timeout(mut self, timeout: Duration) -> Self {
        self.graphic_timeout = Some(timeout);
        self
    }

    /// Start from an existing shell document.
    pub fn with_document(mut self, document: Document) -> Self {
        self.document = document.shared();
        self
    }

    pub fn document(&self) -> SharedDocument {
        self.document.clone()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn is_navigating(&self) -> bool {
        self.navigating.get()
    }

    pub fn is_cached(&self, path: &LogicalPath) -> bool {
        self.cache.borrow().contains(path)
    }

    pub fn cached_paths(&self) -> Vec<LogicalPath> {
        self.cache.borrow().paths()
    }

    pub fn is_mounted(&self, path: &LogicalPath) -> bool {
        self.mounted.borrow().contains(path)
    }

    pub fn mounted_paths(&self) -> Vec<LogicalPath> {
        self.mounted.borrow().paths()
    }

    pub fn descriptor(&self, path: &LogicalPath) -> Option<DescriptorRef> {
        self.cache.borrow().get(path)
    }

    // ============================================================
    // Navigation
    // ============================================================

    /// Navigate to a location fragment such as `#/projects`.
    pub async fn navigate_hash(&self, hash: &str) -> NavigationOutcome {
        self.navigate(&route_from_hash(hash)).await
    }

    /// Navigate to a route key.
    ///
    /// Returns [`NavigationOutcome::Dropped`] without touching any state when
    /// another navigation is still in progress.
    pub async fn navigate(&self, route: &str) -> NavigationOutcome {
        if self.navigating.get() {
            tracing::debug!("Dropping navigation to {}: navigation in progress", route);
            return NavigationOutcome::Dropped;
        }

        let _guard = NavigatingGuard::enter(&self.navigating);
        let id = Uuid::new_v4();
        let span = tracing::info_span!("navigate", %id, route);
        self.run_navigation(id, route).instrument(span).await
    }

    async fn run_navigation(&self, id: Uuid, route: &str) -> NavigationOutcome {
        let started_at = Utc::now();

        if let Some(target) = self.scroll_to_anchor(route) {
            tracing::info!("Scrolled to #{}", route);
            return NavigationOutcome::Scrolled { target };
        }

        let unmounted = self.unmount_transient();

        let resolved = self.routes.resolve(route);
        if !resolved.matched {
            tracing::info!("No route for {}, showing {}", route, resolved.path);
        }

        let mut batch = Batch::default();
        for spec in &self.chrome {
            if let Err(e) = self.mount(spec.clone(), None, 0, &mut batch).await {
                tracing::error!("Shared component {} unavailable: {}", spec.path, e);
            }
        }

        let not_found = self.routes.not_found().clone();
        let mut fell_back = !resolved.matched;
        let page = match self.mount_page(resolved.path.clone(), &mut batch).await {
            Ok(()) => Some(resolved.path),
            Err(e) if resolved.path != not_found => {
                tracing::warn!("{}; falling back to {}", e, not_found);
                fell_back = true;
                match self.mount_page(not_found.clone(), &mut batch).await {
                    Ok(()) => Some(not_found),
                    Err(e) => {
                        tracing::error!("Not-found page unavailable: {}", e);
                        None
                    }
                }
            }
            Err(e) => {
                tracing::error!("Not-found page unavailable: {}", e);
                None
            }
        };

        let roots = self.commit(&batch);
        let enhancement = (!roots.is_empty()).then(|| {
            tokio::task::spawn_local(recolor_graphics(
                self.document.clone(),
                self.fetcher.clone(),
                roots,
                self.graphic_timeout,
            ))
        });

        tracing::info!(
            "Composed {} ({} mounted, {} fetched, {} unmounted)",
            page.as_ref().map(LogicalPath::as_str).unwrap_or("nothing"),
            batch.mounted.len(),
            batch.fetched.len(),
            unmounted.len()
        );

        NavigationOutcome::Composed(NavigationReport {
            id,
            route: route.to_string(),
            page,
            fell_back,
            unmounted,
            mounted: batch.mounted,
            fetched: batch.fetched,
            enhancement,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Navigate to `initial_hash`, then to every location fragment received.
    ///
    /// Each navigation runs as its own task, so changes arriving while one is
    /// in flight are dropped exactly like concurrent [`navigate`](Self::navigate)
    /// calls. Resolves once the channel closes and every navigation finished.
    pub async fn listen(
        self: Rc<Self>,
        initial_hash: &str,
        mut changes: mpsc::Receiver<String>,
    ) -> Vec<NavigationOutcome> {
        let spawn = |app: Rc<Self>, hash: String| {
            tokio::task::spawn_local(async move { app.navigate_hash(&hash).await })
        };

        let mut handles = vec![spawn(self.clone(), initial_hash.to_string())];
        while let Some(hash) = changes.recv().await {
            handles.push(spawn(self.clone(), hash));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Navigation task failed: {}", e),
            }
        }
        outcomes
    }

    fn scroll_to_anchor(&self, route: &str) -> Option<NodeId> {
        let mut doc = self.document.borrow_mut();
        let target = doc.get_element_by_id(route)?;
        doc.scroll_into_view(target);
        Some(target)
    }

    fn unmount_transient(&self) -> Vec<LogicalPath> {
        let drained = self.mounted.borrow_mut().drain_transient();
        let mut doc = self.document.borrow_mut();
        drained
            .into_iter()
            .map(|(path, entry)| {
                entry
                    .descriptor
                    .borrow_mut()
                    .unload(&mut doc, entry.placeholder);
                path
            })
            .collect()
    }

    async fn mount_page(
        &self,
        path: LogicalPath,
        batch: &mut Batch,
    ) -> Result<(), LoadError> {
        let spec = ComponentSpec::page(path, self.page_dom_id.clone());
        self.mount(spec, None, 0, batch).await
    }

    /// Load a component (from cache when possible) and queue it for attachment,
    /// followed by the nested components its markup references.
    ///
    /// Persistence comes from `spec` on every mount, so a cached component
    /// takes it from whichever parent it is nested in this time.
    fn mount<'a>(
        &'a self,
        spec: ComponentSpec,
        placeholder: Option<NodeId>,
        depth: usize,
        batch: &'a mut Batch,
    ) -> LocalBoxFuture<'a, Result<(), LoadError>> {
        async move {
            let path = spec.path.clone();
            let persistent = spec.persistent;
            if self.mounted.borrow().contains(&path) {
                tracing::debug!("{} is already mounted", path);
                return Ok(());
            }

            let cached = self.cache.borrow().get(&path);
            let descriptor = cached.unwrap_or_else(|| ComponentDescriptor::new_ref(spec));

            match ComponentDescriptor::load(&descriptor, &self.document, self.fetcher.as_ref())
                .await?
            {
                LoadKind::Fetched => {
                    self.cache
                        .borrow_mut()
                        .put(path.clone(), descriptor.clone());
                    batch.fetched.push(path.clone());
                }
                LoadKind::Cached => tracing::debug!("Cache hit for {}", path),
            }

            self.mounted.borrow_mut().insert(
                path.clone(),
                MountEntry {
                    descriptor: descriptor.clone(),
                    placeholder,
                    persistent,
                    depth,
                },
            );
            batch.items.push((descriptor.clone(), placeholder));
            batch.mounted.push(path.clone());

            let children = descriptor.borrow().children().to_vec();
            for child in children {
                if depth >= self.max_depth {
                    tracing::warn!(
                        "Not mounting {} inside {}: nesting deeper than {}",
                        child.path,
                        path,
                        self.max_depth
                    );
                    continue;
                }
                let spec = ComponentSpec::child(child.path.clone(), persistent);
                if let Err(e) = self.mount(spec, Some(child.marker), depth + 1, batch).await {
                    tracing::warn!("Nested component {} unavailable: {}", child.path, e);
                }
            }

            Ok(())
        }
        .boxed_local()
    }

    /// Attach everything a navigation produced in one go, then start behaviors.
    ///
    /// Styles go to `<head>`, markup to the content root (or in place of its
    /// placeholder), scripts to the end of `<body>`. Returns the attached roots.
    fn commit(&self, batch: &Batch) -> Vec<NodeId> {
        let mut roots = Vec::new();
        {
            let mut doc = self.document.borrow_mut();
            let head = doc.head();
            let body = doc.body();
            let content_root = self
                .root_id
                .as_deref()
                .and_then(|id| doc.get_element_by_id(id))
                .unwrap_or(body);

            for (descriptor, _) in &batch.items {
                if let Some(style) = descriptor.borrow().style() {
                    doc.append_child(head, style);
                }
            }

            for (descriptor, placeholder) in &batch.items {
                let descriptor = descriptor.borrow();
                let Some(root) = descriptor.root() else {
                    continue;
                };
                match placeholder {
                    Some(marker) => {
                        if !doc.replace(*marker, root) {
                            tracing::warn!("Placeholder for {} is detached", descriptor.path());
                        }
                    }
                    None => doc.append_child(content_root, root),
                }
                roots.push(root);
            }

            for (descriptor, _) in &batch.items {
                if let Some(script) = descriptor.borrow().script() {
                    doc.append_child(body, script);
                }
            }
        }

        for (descriptor, _) in &batch.items {
            descriptor
                .borrow_mut()
                .start_behavior(&self.catalog, &self.document);
        }

        roots
    }
}
