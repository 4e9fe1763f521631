use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, Utc};

use super::{LoadError, ResourceLoadError};
use crate::behavior::{Behavior, BehaviorCatalog, BehaviorContext};
use crate::dom::{parse_markup, ChildRef, Document, NodeId, ParsedFragment, SharedDocument};
use crate::fetch::Fetcher;
use crate::models::{ComponentSpec, LogicalPath, ResourceKind};

/// Descriptor shared between the component cache and the mount set.
pub type DescriptorRef = Rc<RefCell<ComponentDescriptor>>;

/// How a call to [`ComponentDescriptor::load`] was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// Resources were fetched and parsed.
    Fetched,
    /// The descriptor already held its resources.
    Cached,
}

struct Resources {
    markup: Vec<u8>,
    style: Vec<u8>,
    behavior: Vec<u8>,
}

/// One loadable component and the document nodes it owns.
///
/// The markup is fetched and parsed at most once. After that the descriptor
/// keeps its root element, style node and script node for its whole lifetime
/// and only moves them in and out of the document.
pub struct ComponentDescriptor {
    spec: ComponentSpec,
    root: Option<NodeId>,
    children: Vec<ChildRef>,
    style: Option<NodeId>,
    script: Option<NodeId>,
    script_source: String,
    behavior: Option<Box<dyn Behavior>>,
    executed: bool,
    loaded_at: Option<DateTime<Utc>>,
}

impl ComponentDescriptor {
    pub fn new(spec: ComponentSpec) -> Self {
        Self {
            spec,
            root: None,
            children: Vec::new(),
            style: None,
            script: None,
            script_source: String::new(),
            behavior: None,
            executed: false,
            loaded_at: None,
        }
    }

    pub fn new_ref(spec: ComponentSpec) -> DescriptorRef {
        Rc::new(RefCell::new(Self::new(spec)))
    }

    pub fn path(&self) -> &LogicalPath {
        &self.spec.path
    }

    pub fn is_loaded(&self) -> bool {
        self.root.is_some()
    }

    /// Root element wrapping the component's markup.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn style(&self) -> Option<NodeId> {
        self.style
    }

    pub fn script(&self) -> Option<NodeId> {
        self.script
    }

    /// Nested components referenced from this component's markup.
    pub fn children(&self) -> &[ChildRef] {
        &self.children
    }

    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }

    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Make sure the descriptor holds its resources, fetching them on first use.
    ///
    /// No borrow of the descriptor or the document is held while fetching.
    pub async fn load(
        this: &DescriptorRef,
        document: &SharedDocument,
        fetcher: &dyn Fetcher,
    ) -> Result<LoadKind, LoadError> {
        let path = {
            let descriptor = this.borrow();
            if descriptor.is_loaded() {
                tracing::debug!("{} already loaded, reusing fragment", descriptor.path());
                return Ok(LoadKind::Cached);
            }
            descriptor.path().clone()
        };

        let resources = fetch_resources(&path, fetcher).await?;

        let mut doc = document.borrow_mut();
        let mut descriptor = this.borrow_mut();
        if descriptor.is_loaded() {
            return Ok(LoadKind::Cached);
        }
        descriptor.install(&mut doc, resources);
        tracing::info!("Loaded component {}", path);
        Ok(LoadKind::Fetched)
    }

    fn install(&mut self, doc: &mut Document, resources: Resources) {
        let path = self.spec.path.clone();

        let fragment = match parse_markup(doc, &resources.markup) {
            Ok(fragment) => {
                if fragment.repaired > 0 {
                    tracing::debug!(
                        "Parser repaired {} markup errors in {}",
                        fragment.repaired,
                        path
                    );
                }
                fragment
            }
            Err(source) => {
                let error = LoadError::Parse {
                    component: path.clone(),
                    source,
                };
                tracing::warn!("{}; mounting empty", error);
                ParsedFragment::default()
            }
        };

        let root = doc.create_element(self.spec.tag.as_str());
        if let Some(el) = doc.element_mut(root) {
            el.set_attr("id", self.spec.dom_id.as_str());
        }
        for node in fragment.nodes {
            doc.append_child(root, node);
        }

        let style = doc.create_element("style");
        if let Some(el) = doc.element_mut(style) {
            el.set_attr("data-component", path.as_str());
        }
        let css = doc.create_text(String::from_utf8_lossy(&resources.style));
        doc.append_child(style, css);

        let script = doc.create_element("script");
        if let Some(el) = doc.element_mut(script) {
            el.set_attr("type", "text/javascript");
            el.set_attr("src", path.resource(ResourceKind::Behavior));
            el.set_attr("data-component", path.as_str());
        }

        self.root = Some(root);
        self.children = fragment.children;
        self.style = Some(style);
        self.script = Some(script);
        self.script_source = String::from_utf8_lossy(&resources.behavior).into_owned();
        self.loaded_at = Some(Utc::now());
    }

    /// Execute the behavior resource on first attach, then (re)start the behavior.
    ///
    /// Must be called without an outstanding borrow of the document.
    pub fn start_behavior(&mut self, catalog: &BehaviorCatalog, document: &SharedDocument) {
        if !self.executed {
            self.behavior = catalog.execute(&self.spec.path, &self.script_source);
            self.executed = true;
        }

        let Some(root) = self.root else {
            return;
        };
        if let Some(behavior) = self.behavior.as_mut() {
            tracing::debug!("Running behavior for {}", self.spec.path);
            behavior.run(&BehaviorContext {
                document: document.clone(),
                component: self.spec.path.clone(),
                root,
            });
        }
    }

    /// Take the component out of the document.
    ///
    /// Runs the behavior's cleanup while the markup is still attached, then
    /// detaches markup, style and script. A nested component puts its
    /// placeholder back so the parent's fragment can be mounted again.
    pub fn unload(&mut self, doc: &mut Document, placeholder: Option<NodeId>) {
        if let Some(behavior) = self.behavior.as_mut() {
            behavior.cleanup(doc);
        }

        if let Some(root) = self.root {
            let restored = placeholder.is_some_and(|marker| doc.replace(root, marker));
            if !restored {
                doc.detach(root);
            }
        }
        if let Some(style) = self.style {
            doc.detach(style);
        }
        if let Some(script) = self.script {
            doc.detach(script);
        }
        tracing::debug!("Unloaded component {}", self.spec.path);
    }
}

impl std::fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("spec", &self.spec)
            .field("root", &self.root)
            .field("children", &self.children)
            .field("has_behavior", &self.behavior.is_some())
            .field("loaded_at", &self.loaded_at)
            .finish()
    }
}

/// Fetch the markup, style and behavior resources concurrently.
async fn fetch_resources(
    path: &LogicalPath,
    fetcher: &dyn Fetcher,
) -> Result<Resources, ResourceLoadError> {
    let fetch = |kind: ResourceKind| async move {
        let location = path.resource(kind);
        fetcher
            .fetch(&location)
            .await
            .map_err(|source| ResourceLoadError {
                component: path.clone(),
                kind,
                location,
                source,
            })
    };

    let (markup, style, behavior) = tokio::try_join!(
        fetch(ResourceKind::Markup),
        fetch(ResourceKind::Style),
        fetch(ResourceKind::Behavior),
    )?;

    Ok(Resources {
        markup,
        style,
        behavior,
    })
}
