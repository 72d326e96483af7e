//! A [crate::History] that records every call it receives.

use crate::{
    Action, Continuation, Descriptor, Error, Listener, Location, Target, TransitionHook, Unlisten,
    Verdict,
};
use std::{cell::RefCell, rc::Rc};

/// A call received by a mock [History].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Push(Descriptor),
    Replace(Descriptor),
    Go(isize),
    CreatePath(Descriptor),
    CreateHref(Descriptor),
    CreateLocation(Descriptor, Action, Option<String>),
}

/// A mock [crate::History].
///
/// Write operations are recorded (with their resolved payload) instead of performed. Registered
/// listeners and hooks are only invoked by [History::emit] and [History::confirm].
#[derive(Clone, Default)]
pub struct History {
    calls: Rc<RefCell<Vec<Call>>>,
    hooks: Rc<RefCell<Vec<TransitionHook>>>,
    listeners: Rc<RefCell<Vec<Listener>>>,
}

impl History {
    /// Calls received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Notify every registered listener of `location`.
    pub fn emit(&self, location: &Location) {
        for listener in self.listeners.borrow_mut().iter_mut() {
            listener(location);
        }
    }

    /// Run every registered hook against `location`, returning the verdicts they resumed with.
    pub fn confirm(&self, location: &Location) -> Vec<Verdict> {
        let verdicts = Rc::new(RefCell::new(Vec::new()));
        for hook in self.hooks.borrow_mut().iter_mut() {
            let verdicts = verdicts.clone();
            hook(
                location,
                Continuation::new(move |verdict| verdicts.borrow_mut().push(verdict)),
            );
        }
        let verdicts = verdicts.borrow().clone();
        verdicts
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl crate::History for History {
    fn listen_before(&self, hook: TransitionHook) -> Unlisten {
        self.hooks.borrow_mut().push(hook);
        Unlisten::new(|| {})
    }

    fn listen(&self, listener: Listener) -> Unlisten {
        self.listeners.borrow_mut().push(listener);
        Unlisten::new(|| {})
    }

    fn push(&self, to: Target) -> Result<(), Error> {
        self.record(Call::Push(to.resolve()?));
        Ok(())
    }

    fn replace(&self, to: Target) -> Result<(), Error> {
        self.record(Call::Replace(to.resolve()?));
        Ok(())
    }

    fn go(&self, n: isize) {
        self.record(Call::Go(n));
    }

    fn can_go(&self, _: isize) -> bool {
        false
    }

    fn create_path(&self, to: Target) -> Result<String, Error> {
        let descriptor = to.resolve()?;
        let path = descriptor.path.to_string();
        self.record(Call::CreatePath(descriptor));
        Ok(path)
    }

    fn create_href(&self, to: Target) -> Result<String, Error> {
        let descriptor = to.resolve()?;
        let href = format!("#{}", descriptor.path);
        self.record(Call::CreateHref(descriptor));
        Ok(href)
    }

    fn create_location(
        &self,
        to: Target,
        action: Action,
        key: Option<String>,
    ) -> Result<Location, Error> {
        let descriptor = to.resolve()?;
        self.record(Call::CreateLocation(descriptor.clone(), action, key.clone()));
        let Descriptor { path, state } = descriptor;
        Ok(Location {
            pathname: path.pathname,
            search: path.search,
            hash: path.hash,
            state,
            action,
            key,
            basename: None,
        })
    }

    fn create_key(&self) -> String {
        "mock".into()
    }

    fn len(&self) -> usize {
        1
    }
}
