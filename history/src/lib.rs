//! Mount navigation history under a path prefix.
//!
//! A [History] tracks and mutates the current navigation [Location] (backed by a browser URL bar,
//! an in-memory list, a hash fragment, ...). [basename::History] wraps any [History] so that callers
//! can treat the application as if it were mounted at `/`: the configured prefix is stripped from
//! every [Location] the engine emits and prepended to every path handed to the engine.
//!
//! # Status
//!
//! `commonware-history` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

#![doc(
    html_logo_url = "https://commonware.xyz/imgs/rustdoc_logo.svg",
    html_favicon_url = "https://commonware.xyz/favicon.ico"
)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod basename;
pub mod deprecation;
pub mod environment;
pub mod memory;
pub mod mocks;
pub mod path;
pub use path::{Descriptor, Path, Target};

/// Arbitrary state attached to a [Location] by the caller that navigated to it.
pub type State = serde_json::Value;

/// Errors that can occur when interacting with a [History].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("expected pathname + search + hash, found fully qualified url: {0}")]
    QualifiedUrl(String),
    #[error("path contains control character: {0:?}")]
    ControlCharacter(String),
}

/// The kind of navigation that produced a [Location].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Push,
    Replace,
    Pop,
}

/// A point in navigation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
    pub state: Option<State>,
    pub action: Action,
    pub key: Option<String>,

    /// The prefix matched against `pathname` by [basename::History].
    ///
    /// `None` until the location has been observed through a [basename::History]. An empty string
    /// means the location falls outside of the mounted path.
    pub basename: Option<String>,
}

impl Location {
    /// Returns the [Path] (pathname, search, and hash) of the location.
    pub fn path(&self) -> Path {
        Path {
            pathname: self.pathname.clone(),
            search: self.search.clone(),
            hash: self.hash.clone(),
        }
    }
}

/// The outcome of a [TransitionHook].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Continue with the next hook (or commit the navigation if none remain).
    Allow,
    /// Cancel the navigation.
    Block,
    /// Ask the user to confirm the navigation with the given message.
    Prompt(String),
}

/// Resumes a pending navigation with a [Verdict].
///
/// If a [Continuation] is dropped without being resumed, the navigation never completes.
pub struct Continuation(Box<dyn FnOnce(Verdict)>);

impl Continuation {
    pub fn new(f: impl FnOnce(Verdict) + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn resume(self, verdict: Verdict) {
        (self.0)(verdict)
    }
}

/// Invoked after a navigation has been committed.
pub type Listener = Box<dyn FnMut(&Location)>;

/// Invoked before a navigation is committed. The hook may resume the [Continuation] immediately
/// or hold on to it and resume it later.
pub type TransitionHook = Box<dyn FnMut(&Location, Continuation)>;

/// Adapt a synchronous closure into a [TransitionHook] that resumes with the returned [Verdict].
pub fn hook(mut f: impl FnMut(&Location) -> Verdict + 'static) -> TransitionHook {
    Box::new(move |location: &Location, next: Continuation| {
        next.resume(f(location))
    })
}

/// Removes a [Listener] or [TransitionHook] from the [History] it was registered with.
///
/// Dropping an [Unlisten] leaves the subscription in place.
#[must_use = "dropping an Unlisten keeps the subscription registered"]
pub struct Unlisten(Box<dyn FnOnce()>);

impl Unlisten {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn unlisten(self) {
        (self.0)()
    }
}

/// Interface to read and mutate the current navigation [Location].
///
/// Implementations are single-threaded and use interior mutability: every operation takes `&self`
/// and clones of a [History] observe the same navigation stack.
pub trait History: Clone + 'static {
    /// Register a [TransitionHook] run before every navigation.
    fn listen_before(&self, hook: TransitionHook) -> Unlisten;

    /// Register a [Listener] notified after every navigation.
    fn listen(&self, listener: Listener) -> Unlisten;

    /// Navigate to a new entry after the current one.
    fn push(&self, to: Target) -> Result<(), Error>;

    /// Navigate by overwriting the current entry.
    fn replace(&self, to: Target) -> Result<(), Error>;

    /// Move `n` entries through the stack (negative values move back).
    fn go(&self, n: isize);

    fn go_back(&self) {
        self.go(-1)
    }

    fn go_forward(&self) {
        self.go(1)
    }

    /// Returns true if [History::go] with `n` would land on an existing entry.
    fn can_go(&self, n: isize) -> bool;

    /// Serialize `to` into a path string.
    fn create_path(&self, to: Target) -> Result<String, Error>;

    /// Serialize `to` into a string suitable for an anchor's `href`.
    fn create_href(&self, to: Target) -> Result<String, Error>;

    /// Build a [Location] from `to`. A fresh key is generated if `key` is `None`.
    fn create_location(
        &self,
        to: Target,
        action: Action,
        key: Option<String>,
    ) -> Result<Location, Error>;

    /// Generate a new, unique-enough key for a [Location].
    fn create_key(&self) -> String;

    /// Number of entries in the navigation stack.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    /// Run the tests shared by every [History] implementation.
    ///
    /// `history` must start with a single entry at `/` and no registered listeners.
    pub(crate) fn run_history_tests<H: History>(history: H) {
        test_listen_receives_current(&history);
        test_push_and_replace(&history);
        test_go(&history);
        test_hooks_block(&history);
        test_hooks_prompt_without_confirm(&history);
        test_unlisten(&history);
        test_create_location(&history);
        test_create_path(&history);
        test_parse_error(&history);
    }

    fn record<H: History>(history: &H) -> (Rc<RefCell<Vec<Location>>>, Unlisten) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let unlisten = history.listen(Box::new({
            let seen = seen.clone();
            move |location: &Location| seen.borrow_mut().push(location.clone())
        }));
        (seen, unlisten)
    }

    fn test_listen_receives_current<H: History>(history: &H) {
        let (seen, unlisten) = record(history);
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].pathname, "/");
        drop(seen);
        unlisten.unlisten();
    }

    fn test_push_and_replace<H: History>(history: &H) {
        let (seen, unlisten) = record(history);
        let start = history.len();

        history.push("/users?page=2#top".into()).unwrap();
        assert_eq!(history.len(), start + 1);
        {
            let seen = seen.borrow();
            let last = seen.last().unwrap();
            assert_eq!(last.pathname, "/users");
            assert_eq!(last.search, "?page=2");
            assert_eq!(last.hash, "#top");
            assert_eq!(last.action, Action::Push);
            assert!(last.key.is_some());
        }

        let descriptor = Descriptor::new(Path::new("/settings")).with_state(State::from(7));
        history.replace(descriptor.into()).unwrap();
        assert_eq!(history.len(), start + 1);
        {
            let seen = seen.borrow();
            let last = seen.last().unwrap();
            assert_eq!(last.pathname, "/settings");
            assert_eq!(last.state, Some(State::from(7)));
            assert_eq!(last.action, Action::Replace);
        }
        unlisten.unlisten();
    }

    fn test_go<H: History>(history: &H) {
        history.push("/a".into()).unwrap();
        history.push("/b".into()).unwrap();
        let (seen, unlisten) = record(history);

        assert!(history.can_go(-1));
        assert!(!history.can_go(1));
        history.go_back();
        assert_eq!(seen.borrow().last().unwrap().pathname, "/a");
        assert_eq!(seen.borrow().last().unwrap().action, Action::Pop);
        history.go_forward();
        assert_eq!(seen.borrow().last().unwrap().pathname, "/b");

        // Out of range navigation is ignored
        let before = seen.borrow().len();
        history.go(100);
        assert_eq!(seen.borrow().len(), before);
        unlisten.unlisten();
    }

    fn test_hooks_block<H: History>(history: &H) {
        let (seen, unlisten) = record(history);
        let before = seen.borrow().len();
        let len = history.len();

        let blocker = history.listen_before(hook(|location| {
            if location.pathname == "/forbidden" {
                Verdict::Block
            } else {
                Verdict::Allow
            }
        }));
        history.push("/forbidden".into()).unwrap();
        assert_eq!(seen.borrow().len(), before);
        assert_eq!(history.len(), len);

        history.push("/allowed".into()).unwrap();
        assert_eq!(seen.borrow().len(), before + 1);

        blocker.unlisten();
        history.push("/forbidden".into()).unwrap();
        assert_eq!(seen.borrow().last().unwrap().pathname, "/forbidden");
        unlisten.unlisten();
    }

    fn test_hooks_prompt_without_confirm<H: History>(history: &H) {
        let (seen, unlisten) = record(history);
        let prompt = history.listen_before(hook(|_| Verdict::Prompt("leave?".into())));
        history.push("/prompted".into()).unwrap();
        assert_eq!(seen.borrow().last().unwrap().pathname, "/prompted");
        prompt.unlisten();
        unlisten.unlisten();
    }

    fn test_unlisten<H: History>(history: &H) {
        let (seen, unlisten) = record(history);
        let before = seen.borrow().len();
        unlisten.unlisten();
        history.push("/after-unlisten".into()).unwrap();
        assert_eq!(seen.borrow().len(), before);
    }

    fn test_create_location<H: History>(history: &H) {
        let location = history
            .create_location("/x?y=1".into(), Action::Replace, Some("fixed".into()))
            .unwrap();
        assert_eq!(location.pathname, "/x");
        assert_eq!(location.search, "?y=1");
        assert_eq!(location.action, Action::Replace);
        assert_eq!(location.key.as_deref(), Some("fixed"));

        let location = history
            .create_location("/x".into(), Action::Pop, None)
            .unwrap();
        assert!(location.key.is_some());
    }

    fn test_create_path<H: History>(history: &H) {
        assert_eq!(history.create_path("/x?y=1#z".into()).unwrap(), "/x?y=1#z");
    }

    fn test_parse_error<H: History>(history: &H) {
        let len = history.len();
        assert!(matches!(
            history.push("https://example.com/x".into()),
            Err(Error::QualifiedUrl(_))
        ));
        assert_eq!(history.len(), len);
    }
}
