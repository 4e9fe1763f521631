//! Domain models for page composition.
//!
//! # Core Concepts
//!
//! - [`LogicalPath`]: identifier of a component and locator of its
//!   `{path}/{basename}.{html,css,js}` resource triplet.
//! - [`ComponentSpec`]: how a component is mounted (root tag, root id,
//!   persistence).
//! - [`RouteTable`]: immutable mapping from route keys to page components,
//!   with a designated not-found page.

mod component;
mod path;
mod route;

pub use component::*;
pub use path::*;
pub use route::*;
