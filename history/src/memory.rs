//! In-memory [crate::History] implementation.
//!
//! Entries are kept in a stack with a cursor. Navigations run every registered
//! [TransitionHook] (in registration order) before they are committed and notify every
//! registered [Listener] (in registration order) afterwards.

use crate::{
    Action, Continuation, Descriptor, Error, History as _, Listener, Location, Target,
    TransitionHook, Unlisten, Verdict,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Deserialize;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};
use tracing::{debug, trace, warn};

/// Characters used to generate [Location] keys.
const KEY_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Asks the user to confirm a navigation that a [TransitionHook] resolved with
/// [Verdict::Prompt]. Returns true if the navigation may proceed.
pub type Confirm = Rc<dyn Fn(&str) -> bool>;

/// Configuration for a [History].
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial entries of the stack. An empty list is treated as a single entry at `/`.
    pub entries: Vec<Target>,

    /// Index of the current entry (defaults to the last entry, clamped to the stack).
    pub index: Option<usize>,

    /// Length of generated keys.
    pub key_length: usize,

    /// Seed of the generator used for keys.
    pub seed: u64,

    #[serde(skip)]
    pub confirm: Option<Confirm>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            entries: vec![Target::from("/")],
            index: None,
            key_length: 6,
            seed: 0,
            confirm: None,
        }
    }
}

type Hooks = Rc<Vec<Rc<RefCell<TransitionHook>>>>;

struct Stack {
    entries: Vec<Location>,
    index: usize,
}

impl Stack {
    fn target(&self, n: isize) -> Option<usize> {
        self.index
            .checked_add_signed(n)
            .filter(|index| *index < self.entries.len())
    }

    fn current(&self) -> &Location {
        &self.entries[self.index]
    }
}

struct Inner {
    stack: RefCell<Stack>,
    rng: RefCell<StdRng>,
    key_length: usize,
    confirm: Option<Confirm>,

    next_id: Cell<u64>,
    hooks: RefCell<Vec<(u64, Rc<RefCell<TransitionHook>>)>>,
    listeners: RefCell<Vec<(u64, Rc<RefCell<Listener>>)>>,
}

impl Inner {
    fn next_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn finish(
        &self,
        verdict: Verdict,
        location: &Location,
        commit: impl FnOnce(&mut Stack, &Location) -> bool,
    ) {
        let allowed = match verdict {
            Verdict::Allow => true,
            Verdict::Block => false,
            Verdict::Prompt(message) => match &self.confirm {
                Some(confirm) => confirm(&message),
                None => true,
            },
        };
        if !allowed {
            debug!(pathname = %location.pathname, action = ?location.action, "transition blocked");
            return;
        }

        {
            let mut stack = self.stack.borrow_mut();
            if !commit(&mut *stack, location) {
                warn!(
                    pathname = %location.pathname,
                    action = ?location.action,
                    index = stack.index,
                    len = stack.entries.len(),
                    "dropping stale transition"
                );
                return;
            }
            trace!(
                pathname = %location.pathname,
                action = ?location.action,
                index = stack.index,
                len = stack.entries.len(),
                "transition committed"
            );
        }
        self.notify(location);
    }

    fn notify(&self, location: &Location) {
        let listeners: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            match listener.try_borrow_mut() {
                Ok(mut listener) => (*listener)(location),
                Err(_) => debug!(pathname = %location.pathname, "skipping re-entrant listener"),
            }
        }
    }
}

/// Progress of a single [TransitionHook] call.
enum Resume {
    /// The hook is still running.
    Running,
    /// The hook resumed before returning.
    Ready(Verdict, Box<dyn FnOnce(Verdict)>),
    /// The hook returned without resuming.
    Returned,
}

/// Run `hooks[position..]` against `location`, stopping at the first verdict other than
/// [Verdict::Allow], and hand the final verdict to `done`.
///
/// A verdict resumed while its hook is still running is applied once the hook returns, so no
/// hook is borrowed while the navigation commits and listeners run.
fn run_hooks(
    hooks: Hooks,
    position: usize,
    location: Rc<Location>,
    done: Box<dyn FnOnce(Verdict)>,
) {
    let Some(hook) = hooks.get(position).cloned() else {
        return done(Verdict::Allow);
    };
    let Ok(mut call) = hook.try_borrow_mut() else {
        debug!(position, "skipping re-entrant transition hook");
        return run_hooks(hooks, position + 1, location, done);
    };

    let proceed: Box<dyn FnOnce(Verdict)> = Box::new({
        let location = location.clone();
        move |verdict: Verdict| match verdict {
            Verdict::Allow => run_hooks(hooks, position + 1, location, done),
            verdict => done(verdict),
        }
    });
    let resume = Rc::new(RefCell::new(Resume::Running));
    let next = Continuation::new({
        let resume = resume.clone();
        move |verdict: Verdict| {
            let mut state = resume.borrow_mut();
            if matches!(*state, Resume::Running) {
                *state = Resume::Ready(verdict, proceed);
            } else {
                drop(state);
                proceed(verdict);
            }
        }
    });
    (*call)(location.as_ref(), next);
    drop(call);

    let state = resume.replace(Resume::Returned);
    if let Resume::Ready(verdict, proceed) = state {
        proceed(verdict);
    }
}

fn random_key(rng: &mut StdRng, length: usize) -> String {
    (0..length)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

fn location(descriptor: Descriptor, action: Action, key: String) -> Location {
    let Descriptor { path, state } = descriptor;
    Location {
        pathname: path.pathname,
        search: path.search,
        hash: path.hash,
        state,
        action,
        key: Some(key),
        basename: None,
    }
}

/// A [crate::History] backed by an in-memory stack of entries.
#[derive(Clone)]
pub struct History {
    inner: Rc<Inner>,
}

impl History {
    pub fn new(config: Config) -> Result<Self, Error> {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let targets = if config.entries.is_empty() {
            vec![Target::from("/")]
        } else {
            config.entries
        };

        let mut entries = Vec::with_capacity(targets.len());
        for target in targets {
            let key = random_key(&mut rng, config.key_length);
            entries.push(location(target.resolve()?, Action::Pop, key));
        }
        let last = entries.len() - 1;
        let index = config.index.unwrap_or(last).min(last);
        debug!(len = entries.len(), index, "created memory history");

        Ok(Self {
            inner: Rc::new(Inner {
                stack: RefCell::new(Stack { entries, index }),
                rng: RefCell::new(rng),
                key_length: config.key_length,
                confirm: config.confirm,
                next_id: Cell::new(0),
                hooks: RefCell::new(Vec::new()),
                listeners: RefCell::new(Vec::new()),
            }),
        })
    }

    /// The current entry.
    pub fn location(&self) -> Location {
        self.inner.stack.borrow().current().clone()
    }

    /// All entries of the stack.
    pub fn entries(&self) -> Vec<Location> {
        self.inner.stack.borrow().entries.clone()
    }

    /// Index of the current entry.
    pub fn index(&self) -> usize {
        self.inner.stack.borrow().index
    }

    fn transition(
        &self,
        location: Location,
        commit: impl FnOnce(&mut Stack, &Location) -> bool + 'static,
    ) {
        let hooks: Vec<_> = self
            .inner
            .hooks
            .borrow()
            .iter()
            .map(|(_, hook)| hook.clone())
            .collect();
        let location = Rc::new(location);
        let done: Box<dyn FnOnce(Verdict)> = Box::new({
            let inner = self.inner.clone();
            let location = location.clone();
            move |verdict| inner.finish(verdict, &location, commit)
        });
        run_hooks(Rc::new(hooks), 0, location, done);
    }
}

impl crate::History for History {
    fn listen_before(&self, hook: TransitionHook) -> Unlisten {
        let id = self.inner.next_id();
        self.inner
            .hooks
            .borrow_mut()
            .push((id, Rc::new(RefCell::new(hook))));

        let inner = Rc::downgrade(&self.inner);
        Unlisten::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.hooks.borrow_mut().retain(|(other, _)| *other != id);
            }
        })
    }

    fn listen(&self, listener: Listener) -> Unlisten {
        let id = self.inner.next_id();
        let listener = Rc::new(RefCell::new(listener));
        self.inner
            .listeners
            .borrow_mut()
            .push((id, listener.clone()));

        // New listeners observe the current location immediately
        let current = self.location();
        (*listener.borrow_mut())(&current);

        let inner = Rc::downgrade(&self.inner);
        Unlisten::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.listeners.borrow_mut().retain(|(other, _)| *other != id);
            }
        })
    }

    fn push(&self, to: Target) -> Result<(), Error> {
        let location = self.create_location(to, Action::Push, None)?;
        self.transition(location, |stack, location| {
            stack.index += 1;
            stack.entries.truncate(stack.index);
            stack.entries.push(location.clone());
            true
        });
        Ok(())
    }

    fn replace(&self, to: Target) -> Result<(), Error> {
        let location = self.create_location(to, Action::Replace, None)?;
        self.transition(location, |stack, location| {
            let index = stack.index;
            stack.entries[index] = location.clone();
            true
        });
        Ok(())
    }

    fn go(&self, n: isize) {
        let location = {
            let stack = self.inner.stack.borrow();
            let Some(index) = stack.target(n) else {
                warn!(
                    n,
                    index = stack.index,
                    len = stack.entries.len(),
                    "cannot go outside of history"
                );
                return;
            };
            let mut location = stack.entries[index].clone();
            location.action = Action::Pop;
            location
        };

        // The stack may change while hooks are pending: only commit if `n` still lands on the
        // entry the hooks approved
        self.transition(location, move |stack, location| {
            match stack.target(n) {
                Some(index) if stack.entries[index].key == location.key => {
                    stack.index = index;
                    true
                }
                _ => false,
            }
        });
    }

    fn can_go(&self, n: isize) -> bool {
        self.inner.stack.borrow().target(n).is_some()
    }

    fn create_path(&self, to: Target) -> Result<String, Error> {
        Ok(to.resolve()?.path.to_string())
    }

    fn create_href(&self, to: Target) -> Result<String, Error> {
        self.create_path(to)
    }

    fn create_location(
        &self,
        to: Target,
        action: Action,
        key: Option<String>,
    ) -> Result<Location, Error> {
        let descriptor = to.resolve()?;
        let key = key.unwrap_or_else(|| self.create_key());
        Ok(location(descriptor, action, key))
    }

    fn create_key(&self) -> String {
        random_key(&mut self.inner.rng.borrow_mut(), self.inner.key_length)
    }

    fn len(&self) -> usize {
        self.inner.stack.borrow().entries.len()
    }
}
