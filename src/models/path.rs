use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating a logical path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("logical path is empty")]
    Empty,

    #[error("logical path {0:?} has an empty segment")]
    EmptySegment(String),

    #[error("logical path {0:?} contains a relative segment")]
    Relative(String),
}

/// Identifier of a mountable component, doubling as its resource directory.
///
/// A logical path is a `/`-separated list of non-empty segments such as
/// `routes/home` or `components/navbar`. The component's resources live at
/// `{path}/{basename}.{html,css,js}`, so `routes/home` resolves to
/// `routes/home/home.html` and friends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalPath(String);

impl LogicalPath {
    /// Validate and wrap a logical path. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PathError::Empty);
        }

        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(trimmed.to_string()));
            }
            if segment == "." || segment == ".." {
                return Err(PathError::Relative(trimmed.to_string()));
            }
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Wrap a path literal.
    ///
    /// # Panics
    ///
    /// Panics if `raw` is not a valid logical path.
    pub fn from_static(raw: &'static str) -> Self {
        match Self::parse(raw) {
            Ok(path) => path,
            Err(e) => panic!("invalid logical path literal: {}", e),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last segment of the path, used to name the resource files.
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// `{path}/{basename}`, the common prefix of every resource file.
    pub fn resource_stem(&self) -> String {
        format!("{}/{}", self.0, self.basename())
    }

    /// Full resource location for one kind of resource.
    pub fn resource(&self, kind: ResourceKind) -> String {
        format!("{}.{}", self.resource_stem(), kind.extension())
    }
}

impl fmt::Display for LogicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LogicalPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LogicalPath> for String {
    fn from(path: LogicalPath) -> Self {
        path.0
    }
}

impl std::str::FromStr for LogicalPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The three resources every component is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Markup,
    Style,
    Behavior,
}

impl ResourceKind {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markup => "html",
            Self::Style => "css",
            Self::Behavior => "js",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markup => "markup",
            Self::Style => "style",
            Self::Behavior => "behavior",
        }
    }
}
