//! Mount a [crate::History] under a path prefix (a "basename").
//!
//! [History] wraps an engine so that callers interact with paths as if the application were
//! mounted at `/`:
//!
//! - Every [Location] flowing out of the engine (to listeners, transition hooks, and
//!   [crate::History::create_location]) is passed through [History::strip], which removes the
//!   basename from its `pathname` and records the matched prefix in [Location::basename].
//! - Every [Target] flowing into the engine (navigations and serialization) is passed through
//!   [History::prepend], which adds the basename in front of its `pathname`.
//!
//! All other operations are forwarded to the engine unchanged.
//!
//! # Matching
//!
//! The basename is matched against the raw characters of `pathname` (not path segments), so a
//! basename of `/app` also matches `/applet` (leaving `let`). A location that does not start with
//! the basename is not an error: its `pathname` is left untouched and its [Location::basename] is
//! set to the empty string to signal that it falls outside of the mounted application.
//!
//! # Example
//!
//! ```
//! use commonware_history::{basename, environment::Headless, memory, History as _};
//!
//! let history = basename::History::new(
//!     memory::History::new,
//!     basename::Config {
//!         basename: Some("/app".into()),
//!         history: memory::Config::default(),
//!     },
//!     &Headless,
//! )
//! .unwrap();
//!
//! history.push("/users".into()).unwrap();
//! assert_eq!(history.inner().location().pathname, "/app/users");
//! assert_eq!(history.create_href("/settings".into()).unwrap(), "/app/settings");
//! ```

use crate::{
    deprecation::{Deprecation, Sink},
    environment::Environment,
    path::extract_path,
    Action, Continuation, Descriptor, Error, Listener, Location, State, Target, TransitionHook,
    Unlisten,
};
use serde::Deserialize;
use std::rc::Rc;
use tracing::debug;

/// Configuration for a [History].
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config<C> {
    /// The prefix the application is mounted under.
    ///
    /// If `None`, the basename is inferred from the document's declared base (when the
    /// [Environment] exposes one). An explicit empty string disables both the prefix and inference.
    #[serde(default)]
    pub basename: Option<String>,

    /// Options forwarded unchanged to the wrapped history's constructor.
    #[serde(flatten)]
    pub history: C,
}

/// Remove `basename` from the start of `location.pathname`.
fn strip(basename: Option<&str>, mut location: Location) -> Location {
    if location.basename.is_some() {
        return location;
    }
    let Some(basename) = basename else {
        location.basename = Some(String::new());
        return location;
    };

    match location.pathname.strip_prefix(basename) {
        Some(rest) => {
            location.pathname = if rest.is_empty() {
                "/".into()
            } else {
                rest.into()
            };
            location.basename = Some(basename.into());
        }
        None => location.basename = Some(String::new()),
    }
    location
}

/// Join `basename` and the pathname of `to` with exactly one separator.
fn prepend(basename: Option<&str>, to: Target) -> Result<Descriptor, Error> {
    let mut descriptor = to.resolve()?;
    let Some(basename) = basename else {
        return Ok(descriptor);
    };

    let separator = if basename.ends_with('/') { "" } else { "/" };
    let pathname = &descriptor.path.pathname;
    let pathname = pathname.strip_prefix('/').unwrap_or(pathname);
    descriptor.path.pathname = format!("{basename}{separator}{pathname}");
    Ok(descriptor)
}

/// A wrapper around a [crate::History] that is mounted under a basename.
#[derive(Clone)]
pub struct History<H> {
    inner: H,
    basename: Option<Rc<str>>,

    push_state: Deprecation,
    replace_state: Deprecation,
}

impl<H: crate::History> History<H> {
    /// Build the wrapped history with `create` and mount it under the configured (or inferred)
    /// basename.
    pub fn new<C, F>(
        create: F,
        config: Config<C>,
        environment: &impl Environment,
    ) -> Result<Self, Error>
    where
        F: FnOnce(C) -> Result<H, Error>,
    {
        let Config { basename, history } = config;
        let basename = match basename {
            Some(basename) => Some(basename),
            None if environment.can_use_dom() => environment.base_href().map(|href| {
                let basename = extract_path(&href).to_string();
                debug!(%href, %basename, "inferred basename from document base");
                basename
            }),
            None => None,
        };
        Ok(Self::wrap(create(history)?, basename))
    }

    /// Mount an existing history under `basename` (no inference is performed).
    pub fn wrap(inner: H, basename: Option<String>) -> Self {
        Self {
            inner,
            basename: basename.filter(|basename| !basename.is_empty()).map(Rc::from),
            push_state: Deprecation::new("push_state is deprecated; use push instead"),
            replace_state: Deprecation::new("replace_state is deprecated; use replace instead"),
        }
    }

    /// Report calls to deprecated operations to `sink` instead of the log.
    pub fn with_deprecation_sink(mut self, sink: Sink) -> Self {
        self.push_state = Deprecation::with_sink(self.push_state.message(), sink.clone());
        self.replace_state = Deprecation::with_sink(self.replace_state.message(), sink);
        self
    }

    /// The resolved basename (`None` if the history is mounted at the root).
    pub fn basename(&self) -> Option<&str> {
        self.basename.as_deref()
    }

    /// The wrapped history.
    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Remove the basename from a [Location] produced by the wrapped history.
    ///
    /// Locations that already carry a [Location::basename] are returned unchanged, so stripping is
    /// idempotent. After this call, [Location::basename] is always `Some`.
    pub fn strip(&self, location: Location) -> Location {
        strip(self.basename(), location)
    }

    /// Add the basename to a [Target] before handing it to the wrapped history.
    pub fn prepend(&self, to: Target) -> Result<Descriptor, Error> {
        prepend(self.basename(), to)
    }

    /// Navigate to `path` with `state`.
    #[deprecated(note = "use push instead")]
    pub fn push_state(&self, state: Option<State>, path: impl Into<Target>) -> Result<(), Error> {
        let push = self
            .push_state
            .wrap(|(state, path): (Option<State>, Target)| -> Result<(), Error> {
                let descriptor = with_state(path.resolve()?, state);
                crate::History::push(self, descriptor.into())
            });
        push((state, path.into()))
    }

    /// Replace the current entry with `path` and `state`.
    #[deprecated(note = "use replace instead")]
    pub fn replace_state(
        &self,
        state: Option<State>,
        path: impl Into<Target>,
    ) -> Result<(), Error> {
        let replace = self
            .replace_state
            .wrap(|(state, path): (Option<State>, Target)| -> Result<(), Error> {
                let descriptor = with_state(path.resolve()?, state);
                crate::History::replace(self, descriptor.into())
            });
        replace((state, path.into()))
    }
}

/// Attach `state` to `descriptor` unless the descriptor already carries its own.
fn with_state(mut descriptor: Descriptor, state: Option<State>) -> Descriptor {
    descriptor.state = descriptor.state.or(state);
    descriptor
}

impl<H: crate::History> crate::History for History<H> {
    fn listen_before(&self, mut hook: TransitionHook) -> Unlisten {
        let basename = self.basename.clone();
        self.inner.listen_before(Box::new(
            move |location: &Location, next: Continuation| {
                let location = strip(basename.as_deref(), location.clone());
                hook(&location, next)
            },
        ))
    }

    fn listen(&self, mut listener: Listener) -> Unlisten {
        let basename = self.basename.clone();
        self.inner
            .listen(Box::new(move |location: &Location| {
                listener(&strip(basename.as_deref(), location.clone()))
            }))
    }

    fn push(&self, to: Target) -> Result<(), Error> {
        self.inner.push(self.prepend(to)?.into())
    }

    fn replace(&self, to: Target) -> Result<(), Error> {
        self.inner.replace(self.prepend(to)?.into())
    }

    fn go(&self, n: isize) {
        self.inner.go(n)
    }

    fn go_back(&self) {
        self.inner.go_back()
    }

    fn go_forward(&self) {
        self.inner.go_forward()
    }

    fn can_go(&self, n: isize) -> bool {
        self.inner.can_go(n)
    }

    fn create_path(&self, to: Target) -> Result<String, Error> {
        self.inner.create_path(self.prepend(to)?.into())
    }

    fn create_href(&self, to: Target) -> Result<String, Error> {
        self.inner.create_href(self.prepend(to)?.into())
    }

    fn create_location(
        &self,
        to: Target,
        action: Action,
        key: Option<String>,
    ) -> Result<Location, Error> {
        let location = self
            .inner
            .create_location(self.prepend(to)?.into(), action, key)?;
        Ok(self.strip(location))
    }

    fn create_key(&self) -> String {
        self.inner.create_key()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
