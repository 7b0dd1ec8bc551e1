//! Store change callbacks.
//!
//! A [`StoreTrigger`] is the coarse-grained counterpart of the dependency
//! graph: one callback per store, fired once for every successful mutation
//! made through a ref or wrapper that captured it. Stores use it to bump
//! their change signal.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::runtime::Runtime;

/// A captured "something in this store changed" callback.
#[derive(Clone)]
pub struct StoreTrigger {
    inner: Arc<TriggerInner>,
}

struct TriggerInner {
    id: u64,
    runtime: Runtime,
    callback: Box<dyn Fn() + Send + Sync>,
}

impl StoreTrigger {
    pub fn new<F>(runtime: &Runtime, callback: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self {
            inner: Arc::new(TriggerInner {
                id: COUNTER.fetch_add(1, Ordering::Relaxed),
                runtime: runtime.clone(),
                callback: Box::new(callback),
            }),
        }
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Invoke the callback, unless the runtime is applying silent writes.
    pub fn fire(&self) {
        if self.inner.runtime.is_silent() {
            tracing::trace!(trigger = self.inner.id, "store trigger suppressed");
            return;
        }
        (self.inner.callback)();
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for StoreTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StoreTrigger").field(&self.inner.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn fire_invokes_callback() {
        let rt = Runtime::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let trigger = StoreTrigger::new(&rt, move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        trigger.fire();
        trigger.fire();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn silent_writes_suppress_fire() {
        let rt = Runtime::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let trigger = StoreTrigger::new(&rt, move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        rt.silently(|| trigger.fire());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        trigger.fire();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
