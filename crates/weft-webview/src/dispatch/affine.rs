use std::mem::ManuallyDrop;
use std::thread::{self, ThreadId};

use tracing::warn;

/// A value that may only be touched on the thread that created it.
///
/// The cell itself can be shared and moved freely; [`get`](Self::get)
/// returns `None` anywhere but the owning thread. Dropping it elsewhere
/// leaks the value instead of running its destructor on the wrong thread.
pub struct Affine<T> {
    owner: ThreadId,
    value: ManuallyDrop<T>,
}

// SAFETY: the only way to reach `value` is `get`, which checks that the
// caller is on `owner`. All references to `T` are therefore created on a
// single thread, and `Drop` only runs `T`'s destructor there as well.
unsafe impl<T> Send for Affine<T> {}
// SAFETY: see above; shared access off the owning thread yields nothing.
unsafe impl<T> Sync for Affine<T> {}

impl<T> Affine<T> {
    pub fn new(value: T) -> Self {
        Self {
            owner: thread::current().id(),
            value: ManuallyDrop::new(value),
        }
    }

    pub fn is_owner(&self) -> bool {
        thread::current().id() == self.owner
    }

    pub fn get(&self) -> Option<&T> {
        if self.is_owner() {
            Some(&self.value)
        } else {
            None
        }
    }
}

impl<T> Drop for Affine<T> {
    fn drop(&mut self) {
        if self.is_owner() {
            // SAFETY: on the owning thread, and `value` is never used again.
            unsafe { ManuallyDrop::drop(&mut self.value) }
        } else {
            warn!(
                owner = ?self.owner,
                "thread-affine value dropped off its owning thread, leaking it"
            );
        }
    }
}
