use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use super::message::{error_text, result_text, to_value};
use super::Outbox;

struct Completion {
    id: u64,
    name: String,
    done: AtomicBool,
    outbox: Outbox,
}

impl Completion {
    /// Sends `text` unless a result was already sent.
    fn finish(&self, text: impl FnOnce() -> String) {
        if self.done.swap(true, Ordering::AcqRel) {
            debug!(id = self.id, function = %self.name, "call already completed, ignoring");
            return;
        }
        (self.outbox)(text());
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if !self.done.load(Ordering::Acquire) {
            debug!(
                id = self.id,
                function = %self.name,
                "executor dropped without a result, caller stays pending"
            );
        }
    }
}

/// Completes one page-to-native call.
///
/// Exactly one `resolve` or `reject` reaches the page; anything after the
/// first is ignored. Clones share the same completion and may be moved to
/// other threads.
pub struct Executor<R> {
    completion: Arc<Completion>,
    _result: PhantomData<fn(R)>,
}

impl<R> Clone for Executor<R> {
    fn clone(&self) -> Self {
        Self {
            completion: Arc::clone(&self.completion),
            _result: PhantomData,
        }
    }
}

impl<R: Serialize> Executor<R> {
    pub(crate) fn new(id: u64, name: &str, outbox: Outbox) -> Self {
        Self {
            completion: Arc::new(Completion {
                id,
                name: name.to_string(),
                done: AtomicBool::new(false),
                outbox,
            }),
            _result: PhantomData,
        }
    }

    pub fn id(&self) -> u64 {
        self.completion.id
    }

    pub fn is_done(&self) -> bool {
        self.completion.done.load(Ordering::Acquire)
    }

    pub fn resolve(&self, value: R) {
        let id = self.completion.id;
        self.completion
            .finish(|| result_text(id, to_value(&value)));
    }

    pub fn reject<E: Serialize>(&self, error: E) {
        let id = self.completion.id;
        self.completion.finish(|| error_text(id, to_value(&error)));
    }
}

impl<R> std::fmt::Debug for Executor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("id", &self.completion.id)
            .field("function", &self.completion.name)
            .field("done", &self.completion.done.load(Ordering::Acquire))
            .finish()
    }
}
