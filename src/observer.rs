//! Diagnostic hook for finalized element sequences.
//!
//! Callers register observers on a registry they own and pass it to the
//! observed breaking entry points; there is no process-global state. When no
//! observer is registered the hook is a no-op and sequences are not walked.

use crate::element::ElementList;

/// Receives every finalized element sequence handed to an observed breaking
/// call, before the search runs.
///
/// `category` names the producing stage; `id` is an optional caller-side
/// identifier for the sequence (a flow name, a paragraph id).
pub trait ElementListObserver {
    fn observe(&mut self, list: &ElementList, category: &str, id: Option<&str>);
}

/// Owned collection of observers, applied in registration order.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Vec<Box<dyn ElementListObserver>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Box<dyn ElementListObserver>) {
        self.observers.push(observer);
    }

    /// Whether any observer is registered (lets callers skip preparing
    /// diagnostic data nobody will see).
    pub fn is_active(&self) -> bool {
        !self.observers.is_empty()
    }

    pub fn observe(&mut self, list: &ElementList, category: &str, id: Option<&str>) {
        for observer in &mut self.observers {
            observer.observe(list, category, id);
        }
    }
}

/// Observer that logs a one-line summary of each sequence it sees.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingObserver;

impl ElementListObserver for LoggingObserver {
    fn observe(&mut self, list: &ElementList, category: &str, id: Option<&str>) {
        log::debug!(
            "observed sequence category={} id={} elements={}",
            category,
            id.unwrap_or("-"),
            list.len()
        );
    }
}
