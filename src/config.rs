use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::{DEFAULT_MAX_DEPTH, DEFAULT_PAGE_ID, DEFAULT_ROOT_ID};
use crate::fetch::Source;
use crate::models::{LogicalPath, PersistentComponent, RouteTable, Tag};

const APP_NAME: &str = "page-composer";
const CONFIG_FILE: &str = "site.json";

/// Path of a site configuration file, overriding the user config directory.
pub const CONFIG_ENV: &str = "PAGE_COMPOSER_CONFIG";
/// Resource source, overriding whatever the configuration file says.
pub const SOURCE_ENV: &str = "PAGE_COMPOSER_SOURCE";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Route key {0:?} must start with '/'")]
    InvalidRoute(String),

    #[error("Persistent component {0} is listed more than once")]
    DuplicateComponent(LogicalPath),

    #[error("DOM id {0:?} is used by more than one component")]
    DuplicateDomId(String),

    #[error("max_nesting_depth must be at least 1")]
    ZeroDepth,
}

/// Site layout: which page each route shows and what stays mounted around it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Route key to page component.
    pub routes: BTreeMap<String, LogicalPath>,
    /// Page shown for unknown routes and pages that fail to load.
    pub not_found: LogicalPath,
    /// Chrome mounted ahead of every page, in order.
    pub persistent: Vec<PersistentComponent>,
    /// Id given to the root element of every page.
    pub page_dom_id: String,
    /// Element pages are mounted into; `None` mounts into `<body>`.
    pub root_id: Option<String>,
    /// Base URL or directory the component resources are read from.
    pub source: String,
    /// Give up on an embedded graphic after this many milliseconds.
    pub graphic_timeout_ms: Option<u64>,
    pub max_nesting_depth: usize,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            routes: BTreeMap::from([
                ("/".to_string(), LogicalPath::from_static("routes/home")),
                (
                    "/projects".to_string(),
                    LogicalPath::from_static("routes/projects"),
                ),
            ]),
            not_found: LogicalPath::from_static("routes/notfound"),
            persistent: vec![PersistentComponent {
                path: LogicalPath::from_static("components/navbar"),
                tag: Tag::Nav,
                dom_id: Some("navbar".to_string()),
            }],
            page_dom_id: DEFAULT_PAGE_ID.to_string(),
            root_id: Some(DEFAULT_ROOT_ID.to_string()),
            source: ".".to_string(),
            graphic_timeout_ms: None,
            max_nesting_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl SiteConfig {
    /// Load configuration.
    ///
    /// Looks at `explicit`, then `$PAGE_COMPOSER_CONFIG`, then
    /// `site.json` in the user config directory. Falls back to defaults when
    /// none of those exist. `$PAGE_COMPOSER_SOURCE` overrides the source.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => {
                tracing::debug!("No site configuration found, using defaults");
                Self::default()
            }
        };

        if let Ok(source) = std::env::var(SOURCE_ENV) {
            tracing::debug!("Source overridden by {}: {}", SOURCE_ENV, source);
            config.source = source;
        }

        config.validate()?;
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        get_config_path().filter(|path| path.exists())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::info!("Loaded site configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key) = self.routes.keys().find(|key| !key.starts_with('/')) {
            return Err(ConfigError::InvalidRoute(key.clone()));
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }

        let mut paths = HashSet::new();
        let mut ids = HashSet::from([self.page_dom_id.clone()]);
        for component in &self.persistent {
            if !paths.insert(&component.path) {
                return Err(ConfigError::DuplicateComponent(component.path.clone()));
            }
            let dom_id = component.to_spec().dom_id;
            if !ids.insert(dom_id.clone()) {
                return Err(ConfigError::DuplicateDomId(dom_id));
            }
        }
        Ok(())
    }

    pub fn route_table(&self) -> RouteTable {
        RouteTable::new(self.routes.clone(), self.not_found.clone())
    }

    pub fn source(&self) -> Source {
        Source::parse(&self.source)
    }
}

/// Default location of the configuration file, if the platform has a config directory.
pub fn get_config_path() -> Option<PathBuf> {
    let mut path = config_dir()?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_sample_site() {
        let config = SiteConfig::default();
        let routes = config.route_table();
        assert_eq!(routes.resolve("/").path.as_str(), "routes/home");
        assert_eq!(routes.resolve("/projects").path.as_str(), "routes/projects");
        assert_eq!(routes.resolve("/nope").path.as_str(), "routes/notfound");
        assert_eq!(config.persistent[0].to_spec().dom_id, "navbar");
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: SiteConfig = serde_json::from_str(
            r#"{ "routes": { "/": "pages/index" }, "source": "https://example.com" }"#,
        )
        .unwrap();
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.not_found.as_str(), "routes/notfound");
        assert_eq!(config.max_nesting_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(
            config.source(),
            Source::Http("https://example.com".to_string())
        );
    }

    #[test]
    fn invalid_logical_paths_are_rejected_when_parsing() {
        let result: Result<SiteConfig, _> =
            serde_json::from_str(r#"{ "routes": { "/": "routes//home" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_colliding_dom_ids() {
        let mut config = SiteConfig::default();
        config.persistent.push(PersistentComponent {
            path: LogicalPath::from_static("components/footer"),
            tag: Tag::Footer,
            dom_id: Some("navbar".to_string()),
        });
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateDomId("navbar".to_string()))
        );
    }

    #[test]
    fn validate_rejects_route_keys_without_slash() {
        let mut config = SiteConfig::default();
        config
            .routes
            .insert("about".to_string(), LogicalPath::from_static("routes/about"));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidRoute("about".to_string()))
        );
    }

    #[test]
    fn save_then_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("site.json");
        let mut config = SiteConfig::default();
        config.graphic_timeout_ms = Some(2500);

        config.save(&path).unwrap();
        assert_eq!(SiteConfig::from_file(&path).unwrap(), config);
    }
}
