//! Observer adapter.
//!
//! The contract an external binding (a UI layer, a server-sent-events
//! bridge, ...) needs to follow a store: subscribe to its change signal and
//! read the signal's current number. A changed number is the only thing
//! the observer has to act on.

use super::definition::Export;
use crate::reactive::{Ref, Subscription};

/// Call `on_change` after every change-signal advance, until the returned
/// guard drops.
pub fn subscribe<F>(change_signal: &Ref<u64>, on_change: F) -> Subscription
where
    F: Fn() + Send + Sync + 'static,
{
    change_signal.subscribe(on_change)
}

/// Current value of a change signal. Never tracked.
pub fn read_snapshot(change_signal: &Ref<u64>) -> u64 {
    change_signal.get_untracked()
}

/// Subscribe to a setup-store export. Only ref exports notify; anything
/// else yields an inert subscription.
pub fn subscribe_export<F>(export: &Export, on_change: F) -> Subscription
where
    F: Fn() + Send + Sync + 'static,
{
    match export {
        Export::Ref(r) => r.subscribe(on_change),
        _ => Subscription::noop(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Runtime;
    use crate::value::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn subscription_follows_the_signal() {
        let rt = Runtime::new();
        let signal = Ref::new(&rt, 0u64);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();

        let subscription = subscribe(&signal, move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        signal.update(|n| n + 1);
        assert_eq!(read_snapshot(&signal), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(subscription);
        signal.update(|n| n + 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_ref_exports_never_notify() {
        let subscription = subscribe_export(&Export::Value(Value::from(1.0)), || {});
        assert!(!subscription.is_attached());
    }
}
