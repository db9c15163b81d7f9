//! Ordered, re-entrant listener list for a single event kind.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;
use weft_common::IdSequence;

type Callback<A, R> = Rc<RefCell<Box<dyn FnMut(&A) -> R>>>;

struct Entry<A, R> {
    id: u64,
    once: bool,
    callback: Callback<A, R>,
}

impl<A, R> Clone for Entry<A, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            once: self.once,
            callback: Rc::clone(&self.callback),
        }
    }
}

/// Listeners for one event kind.
///
/// Every method takes `&self`; callbacks may add, remove or fire on the
/// same list while they run. A pass always works on the registrations
/// that existed when it started.
pub struct Listeners<A, R = ()> {
    entries: RefCell<Vec<Entry<A, R>>>,
    ids: IdSequence,
    on_clear: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl<A, R> Default for Listeners<A, R> {
    fn default() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            ids: IdSequence::new(),
            on_clear: RefCell::new(None),
        }
    }
}

impl<A, R> Listeners<A, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, callback: impl FnMut(&A) -> R + 'static) -> u64 {
        self.push(callback, false)
    }

    /// Like [`add`](Self::add), removed right before its first invocation.
    pub fn once(&self, callback: impl FnMut(&A) -> R + 'static) -> u64 {
        self.push(callback, true)
    }

    /// Returns whether a registration was removed.
    pub fn remove(&self, id: u64) -> bool {
        let removed = {
            let mut entries = self.entries.borrow_mut();
            entries
                .iter()
                .position(|e| e.id == id)
                .map(|index| entries.remove(index))
        };
        removed.is_some()
    }

    /// Drop every registration and run the on-clear hook, if one is set.
    pub fn clear(&self) {
        let dropped = std::mem::take(&mut *self.entries.borrow_mut());
        drop(dropped);

        let hook = self.on_clear.borrow_mut().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    /// Install a hook run by the next [`clear`](Self::clear). Replaces any
    /// previous hook.
    pub fn on_clear(&self, hook: impl FnOnce() + 'static) {
        *self.on_clear.borrow_mut() = Some(Box::new(hook));
    }

    pub fn empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Invoke every listener in registration order and collect the results.
    pub fn fire(&self, args: &A) -> Vec<R> {
        let mut results = Vec::new();
        self.run(args, |result| {
            results.push(result);
            false
        });
        results
    }

    /// Invoke listeners in order until one returns `policy`.
    ///
    /// Returns `true` if some listener did; later listeners are not called.
    pub fn until(&self, args: &A, policy: R) -> bool
    where
        R: PartialEq,
    {
        self.run(args, |result| result == policy)
    }

    fn push(&self, callback: impl FnMut(&A) -> R + 'static, once: bool) -> u64 {
        let id = self.ids.next_id();
        self.entries.borrow_mut().push(Entry {
            id,
            once,
            callback: Rc::new(RefCell::new(Box::new(callback))),
        });
        id
    }

    /// Returns whether `stop` asked to end the pass early.
    fn run(&self, args: &A, mut stop: impl FnMut(R) -> bool) -> bool {
        let snapshot: Vec<Entry<A, R>> = self.entries.borrow().clone();

        for entry in snapshot {
            // A nested pass may already have consumed this one.
            if entry.once && !self.remove(entry.id) {
                continue;
            }

            let result = match entry.callback.try_borrow_mut() {
                Ok(mut callback) => callback(args),
                Err(_) => {
                    warn!(listener = entry.id, "listener re-entered from itself, skipping");
                    continue;
                }
            };

            if stop(result) {
                return true;
            }
        }
        false
    }
}

impl<A, R> std::fmt::Debug for Listeners<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
