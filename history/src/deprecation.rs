//! Report usage of deprecated operations.

use std::rc::Rc;
use tracing::warn;

/// Receives the message of every emitted [Deprecation].
pub type Sink = Rc<dyn Fn(&'static str)>;

/// The default [Sink]: log the message at `warn`.
pub fn log() -> Sink {
    Rc::new(|message: &'static str| warn!("{message}"))
}

/// A notice emitted each time a deprecated operation is called.
#[derive(Clone)]
pub struct Deprecation {
    message: &'static str,
    sink: Sink,
}

impl Deprecation {
    pub fn new(message: &'static str) -> Self {
        Self::with_sink(message, log())
    }

    pub fn with_sink(message: &'static str, sink: Sink) -> Self {
        Self { message, sink }
    }

    pub fn message(&self) -> &'static str {
        self.message
    }

    /// Emit the notice. Never interrupts the caller.
    pub fn emit(&self) {
        (self.sink)(self.message)
    }

    /// Wrap `f` so that the notice is emitted before every invocation.
    pub fn wrap<A, R>(&self, f: impl Fn(A) -> R) -> impl Fn(A) -> R {
        let deprecation = self.clone();
        move |args: A| {
            deprecation.emit();
            f(args)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_macros::test_traced;
    use std::cell::RefCell;

    fn recording() -> (Sink, Rc<RefCell<Vec<&'static str>>>) {
        let seen: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let sink: Sink = Rc::new({
            let seen = seen.clone();
            move |message: &'static str| seen.borrow_mut().push(message)
        });
        (sink, seen)
    }

    #[test]
    fn test_emit_every_call() {
        let (sink, seen) = recording();
        let deprecation = Deprecation::with_sink("old is deprecated; use new instead", sink);
        deprecation.emit();
        deprecation.emit();
        assert_eq!(
            *seen.borrow(),
            vec![deprecation.message(), deprecation.message()]
        );
    }

    #[test]
    fn test_wrap_forwards() {
        let (sink, seen) = recording();
        let deprecation = Deprecation::with_sink("double is deprecated", sink);
        let double = deprecation.wrap(|x: u32| x * 2);
        assert_eq!(double(21), 42);
        assert_eq!(double(1), 2);
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test_traced("WARN")]
    fn test_default_sink_logs() {
        // Logging must not panic or interrupt the caller
        let deprecation = Deprecation::new("logged is deprecated");
        let value = deprecation.wrap(|()| 7)(());
        assert_eq!(value, 7);
    }
}
