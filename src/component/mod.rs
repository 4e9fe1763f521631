//! Component descriptors and the stores that track them.
//!
//! - [`ComponentDescriptor`]: one component's identity and owned nodes
//! - [`ComponentCache`]: every descriptor ever loaded
//! - [`MountSet`]: the descriptors currently attached to the document

mod cache;
mod descriptor;
mod mount;

use thiserror::Error;

pub use cache::ComponentCache;
pub use descriptor::{ComponentDescriptor, DescriptorRef, LoadKind};
pub use mount::{MountEntry, MountSet};

use crate::dom::ParseError;
use crate::fetch::FetchError;
use crate::models::{LogicalPath, ResourceKind};

/// A component resource could not be retrieved.
#[derive(Debug, Error)]
#[error("Failed to load {} for {}: {}", .kind.as_str(), .component, .source)]
pub struct ResourceLoadError {
    pub component: LogicalPath,
    pub kind: ResourceKind,
    pub location: String,
    #[source]
    pub source: FetchError,
}

/// Why a component did not load cleanly.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Resource(#[from] ResourceLoadError),

    /// Markup could not be decoded; the component mounts with an empty fragment.
    #[error("Unparseable markup for {component}: {source}")]
    Parse {
        component: LogicalPath,
        #[source]
        source: ParseError,
    },
}
