//! Observer registration and deferred event fan-out.
//!
//! Events are collected while the pool lock is held and dispatched only
//! after it is released, so a callback may call back into the pool (or
//! unregister itself) without deadlocking.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::traits::PoolObserver;
use crate::types::Hash256;

/// A pool state change to broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PoolEvent {
    Deposited(Hash256),
    Removed(Hash256),
}

/// Registered observers.
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: RwLock<Vec<Arc<dyn PoolObserver>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Returns false if it is already registered.
    pub fn add(&self, observer: Arc<dyn PoolObserver>) -> bool {
        let mut observers = self.observers.write();
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Unregister an observer. Returns false if it was not registered.
    pub fn remove(&self, observer: &Arc<dyn PoolObserver>) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        observers.len() != before
    }

    /// Deliver `events` to a snapshot of the current observers.
    ///
    /// The registry lock is released before any callback runs, so
    /// callbacks may add or remove observers.
    pub fn dispatch(&self, events: &[PoolEvent]) {
        if events.is_empty() {
            return;
        }
        let snapshot: Vec<_> = self.observers.read().clone();
        for event in events {
            for observer in &snapshot {
                match event {
                    PoolEvent::Deposited(id) => observer.tx_deposited(id),
                    PoolEvent::Removed(id) => observer.tx_removed(id),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        log: Mutex<Vec<(char, Hash256)>>,
    }

    impl PoolObserver for RecordingObserver {
        fn tx_deposited(&self, id: &Hash256) {
            self.log.lock().push(('d', *id));
        }

        fn tx_removed(&self, id: &Hash256) {
            self.log.lock().push(('r', *id));
        }
    }

    #[test]
    fn add_rejects_duplicates() {
        let registry = ObserverRegistry::new();
        let obs: Arc<dyn PoolObserver> = Arc::new(RecordingObserver::default());
        assert!(registry.add(Arc::clone(&obs)));
        assert!(!registry.add(Arc::clone(&obs)));
    }

    #[test]
    fn remove_unknown_returns_false() {
        let registry = ObserverRegistry::new();
        let obs: Arc<dyn PoolObserver> = Arc::new(RecordingObserver::default());
        assert!(!registry.remove(&obs));
    }

    #[test]
    fn dispatch_preserves_event_order() {
        let registry = ObserverRegistry::new();
        let obs = Arc::new(RecordingObserver::default());
        registry.add(obs.clone() as Arc<dyn PoolObserver>);

        let a = Hash256([1; 32]);
        let b = Hash256([2; 32]);
        registry.dispatch(&[
            PoolEvent::Deposited(a),
            PoolEvent::Deposited(b),
            PoolEvent::Removed(a),
        ]);

        assert_eq!(*obs.log.lock(), vec![('d', a), ('d', b), ('r', a)]);
    }

    #[test]
    fn removed_observer_gets_nothing() {
        let registry = ObserverRegistry::new();
        let obs = Arc::new(RecordingObserver::default());
        let dyn_obs: Arc<dyn PoolObserver> = obs.clone();
        registry.add(Arc::clone(&dyn_obs));
        registry.remove(&dyn_obs);

        registry.dispatch(&[PoolEvent::Deposited(Hash256([1; 32]))]);
        assert!(obs.log.lock().is_empty());
    }

    #[test]
    fn observer_may_unregister_itself_during_dispatch() {
        struct SelfRemoving {
            registry: Arc<ObserverRegistry>,
            me: Mutex<Option<Arc<dyn PoolObserver>>>,
        }

        impl PoolObserver for SelfRemoving {
            fn tx_deposited(&self, _id: &Hash256) {
                if let Some(me) = self.me.lock().take() {
                    self.registry.remove(&me);
                }
            }

            fn tx_removed(&self, _id: &Hash256) {}
        }

        let registry = Arc::new(ObserverRegistry::new());
        let obs = Arc::new(SelfRemoving {
            registry: Arc::clone(&registry),
            me: Mutex::new(None),
        });
        let dyn_obs: Arc<dyn PoolObserver> = obs.clone();
        *obs.me.lock() = Some(Arc::clone(&dyn_obs));
        registry.add(dyn_obs);

        // Must not deadlock, and the second dispatch reaches nobody.
        registry.dispatch(&[PoolEvent::Deposited(Hash256([1; 32]))]);
        registry.dispatch(&[PoolEvent::Deposited(Hash256([2; 32]))]);
    }
}
