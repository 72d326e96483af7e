//! Parse and serialize paths.
//!
//! A [Path] splits a path string into its `pathname`, `search`, and `hash` components. Write
//! operations on a [crate::History] accept a [Target]: either a bare path string (parsed lazily by
//! [Target::resolve]) or an already structured [Descriptor].

use crate::{Error, State};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Schemes recognized as the start of a fully qualified URL.
const SCHEMES: [&str; 2] = ["http://", "https://"];

/// The `pathname`, `search`, and `hash` components of a path.
///
/// `search` keeps its leading `?` and `hash` keeps its leading `#` (both are empty when absent).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Path {
    pub pathname: String,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub hash: String,
}

impl Path {
    /// Create a [Path] with only a `pathname`.
    pub fn new(pathname: impl Into<String>) -> Self {
        Self {
            pathname: pathname.into(),
            search: String::new(),
            hash: String::new(),
        }
    }
}

impl Default for Path {
    fn default() -> Self {
        Self::new("/")
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.chars().any(|c| c.is_ascii_control()) {
            return Err(Error::ControlCharacter(s.into()));
        }
        if extract_path(s).len() != s.len() {
            return Err(Error::QualifiedUrl(s.into()));
        }

        let (rest, hash) = match s.find('#') {
            Some(index) => s.split_at(index),
            None => (s, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(index) => rest.split_at(index),
            None => (rest, ""),
        };
        let pathname = if pathname.is_empty() { "/" } else { pathname };

        Ok(Self {
            pathname: pathname.into(),
            search: search.into(),
            hash: hash.into(),
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.pathname, self.search, self.hash)
    }
}

/// Strip the scheme and host from a fully qualified URL, returning the path that follows.
///
/// Strings that do not start with `http://` or `https://` are returned unchanged.
pub fn extract_path(url: &str) -> &str {
    let lower = url.get(..8).unwrap_or(url).to_ascii_lowercase();
    let Some(scheme) = SCHEMES.iter().find(|scheme| lower.starts_with(**scheme)) else {
        return url;
    };
    let rest = &url[scheme.len()..];
    let host = rest.find('/').unwrap_or(rest.len());
    &rest[host..]
}

/// The payload of a write operation: a [Path] plus optional [State].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    #[serde(flatten)]
    pub path: Path,
    #[serde(default)]
    pub state: Option<State>,
}

impl Descriptor {
    pub fn new(path: Path) -> Self {
        Self { path, state: None }
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = Some(state);
        self
    }
}

impl From<Path> for Descriptor {
    fn from(path: Path) -> Self {
        Self::new(path)
    }
}

/// Where a write operation should navigate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    /// A path string, parsed on [Target::resolve].
    Path(String),
    Descriptor(Descriptor),
}

impl Target {
    /// Parse the target (if necessary) into a [Descriptor].
    pub fn resolve(self) -> Result<Descriptor, Error> {
        match self {
            Self::Path(path) => Ok(Descriptor::new(path.parse()?)),
            Self::Descriptor(descriptor) => Ok(descriptor),
        }
    }
}

impl From<&str> for Target {
    fn from(path: &str) -> Self {
        Self::Path(path.into())
    }
}

impl From<String> for Target {
    fn from(path: String) -> Self {
        Self::Path(path)
    }
}

impl From<Path> for Target {
    fn from(path: Path) -> Self {
        Self::Descriptor(path.into())
    }
}

impl From<Descriptor> for Target {
    fn from(descriptor: Descriptor) -> Self {
        Self::Descriptor(descriptor)
    }
}
