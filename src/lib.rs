//! Client-side page composition.
//!
//! Pages are assembled from components, each a `{path}/{basename}` triplet of
//! markup, stylesheet and behavior. The [`app::App`] controller maps route
//! keys to page components, keeps shared chrome mounted across navigations,
//! caches every component it has loaded and mounts nested components in place
//! of their `$path` markers.

pub mod app;
pub mod behavior;
pub mod component;
pub mod config;
pub mod dom;
pub mod enhance;
pub mod fetch;
pub mod models;
pub mod serve;
