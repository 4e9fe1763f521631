use serde::{Deserialize, Serialize};

use super::path::LogicalPath;

/// Element type used for a mounted component's root.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Tag {
    #[default]
    Div,
    Nav,
    Section,
    Header,
    Footer,
    Main,
    Aside,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Div => "div",
            Self::Nav => "nav",
            Self::Section => "section",
            Self::Header => "header",
            Self::Footer => "footer",
            Self::Main => "main",
            Self::Aside => "aside",
        }
    }
}

/// Identity of one mountable component.
///
/// Pages, shared chrome and nested children all share this shape; they differ
/// only in how their root is tagged and whether they survive navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSpec {
    pub path: LogicalPath,
    /// Id given to the mounted root element.
    pub dom_id: String,
    pub tag: Tag,
    /// Persistent components are never unmounted by navigation.
    pub persistent: bool,
}

impl ComponentSpec {
    /// A routed page, mounted under the shared page id.
    pub fn page(path: LogicalPath, dom_id: impl Into<String>) -> Self {
        Self {
            path,
            dom_id: dom_id.into(),
            tag: Tag::Div,
            persistent: false,
        }
    }

    /// Shared chrome such as a navigation bar.
    pub fn chrome(path: LogicalPath, tag: Tag, dom_id: impl Into<String>) -> Self {
        Self {
            path,
            dom_id: dom_id.into(),
            tag,
            persistent: true,
        }
    }

    /// A component discovered inside another component's markup.
    ///
    /// Children take their full logical path as id, so `components/button`
    /// and `widgets/button` stay distinct. They inherit the parent's
    /// persistence, so a child of shared chrome stays mounted with it.
    pub fn child(path: LogicalPath, persistent: bool) -> Self {
        let dom_id = path.as_str().to_string();
        Self {
            path,
            dom_id,
            tag: Tag::Div,
            persistent,
        }
    }
}

/// Shared chrome entry as written in site configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistentComponent {
    pub path: LogicalPath,
    #[serde(default)]
    pub tag: Tag,
    /// Defaults to the path's basename.
    #[serde(default)]
    pub dom_id: Option<String>,
}

impl PersistentComponent {
    pub fn to_spec(&self) -> ComponentSpec {
        let dom_id = self
            .dom_id
            .clone()
            .unwrap_or_else(|| self.path.basename().to_string());
        ComponentSpec::chrome(self.path.clone(), self.tag, dom_id)
    }
}
