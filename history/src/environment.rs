//! Inspect the runtime a [crate::History] is mounted in.

/// Capabilities of the runtime used to infer a basename when none is configured.
pub trait Environment {
    /// Returns true if the runtime exposes a document whose declared base can be inspected.
    fn can_use_dom(&self) -> bool;

    /// Returns the `href` of the first base element declared by the document, if any.
    fn base_href(&self) -> Option<String>;
}

/// A runtime without a document (e.g. a server or a test harness).
#[derive(Clone, Copy, Debug, Default)]
pub struct Headless;

impl Environment for Headless {
    fn can_use_dom(&self) -> bool {
        false
    }

    fn base_href(&self) -> Option<String> {
        None
    }
}

/// A document whose first base element (if any) has the given `href`.
#[derive(Clone, Debug, Default)]
pub struct Document {
    pub base_href: Option<String>,
}

impl Document {
    pub fn new(base_href: Option<String>) -> Self {
        Self { base_href }
    }
}

impl Environment for Document {
    fn can_use_dom(&self) -> bool {
        true
    }

    fn base_href(&self) -> Option<String> {
        self.base_href.clone()
    }
}
