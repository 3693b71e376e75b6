//! Change notification.
//!
//! [`ChangeNotifier`] keeps two ordered listener lists: one per key and one
//! wildcard list that sees every event. [`ChangeNotifier::notify`] walks
//! the key's list first and the wildcard list second, each in registration
//! order. A listener that returns an error or panics is logged and skipped;
//! the rest of the dispatch carries on.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use crate::error::StoreResult;

/// Where a change came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOrigin {
    /// A mutation made through this [`CachedStorage`](crate::CachedStorage).
    Local,
    /// A mutation made by another connection or execution context.
    External,
}

/// A single key mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// Value before the change, `None` if the key did not exist.
    pub old_value: Option<String>,
    /// Value after the change, `None` if the key was removed.
    pub new_value: Option<String>,
    pub origin: ChangeOrigin,
}

impl StorageEvent {
    pub fn local(key: &str, old_value: Option<String>, new_value: Option<String>) -> Self {
        Self {
            key: key.to_string(),
            old_value,
            new_value,
            origin: ChangeOrigin::Local,
        }
    }
}

/// Error type listeners may return.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// What a listener returns.
pub type ListenerResult = Result<(), ListenerError>;

type Listener = Box<dyn FnMut(&StorageEvent) -> ListenerResult + Send>;

/// Identifies a registration in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer#{}", self.0)
    }
}

struct Registration {
    id: ObserverId,
    listener: Listener,
}

/// Outcome of a single [`ChangeNotifier::notify`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that ran to completion.
    pub delivered: usize,
    /// Listeners that returned an error or panicked.
    pub failed: usize,
}

/// Observer registry.
///
/// Registrations live as long as the notifier; there is no unsubscribe.
#[derive(Default)]
pub struct ChangeNotifier {
    by_key: HashMap<String, Vec<Registration>>,
    wildcard: Vec<Registration>,
    next_id: u64,
    subscribed: bool,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for changes to `key`.
    pub fn observe<F>(&mut self, key: &str, listener: F) -> ObserverId
    where
        F: FnMut(&StorageEvent) -> ListenerResult + Send + 'static,
    {
        let registration = self.register(Box::new(listener));
        let id = registration.id;
        self.by_key
            .entry(key.to_string())
            .or_default()
            .push(registration);
        debug!(%id, key, "observer registered");
        id
    }

    /// Register `listener` for changes to every key.
    pub fn observe_all<F>(&mut self, listener: F) -> ObserverId
    where
        F: FnMut(&StorageEvent) -> ListenerResult + Send + 'static,
    {
        let registration = self.register(Box::new(listener));
        let id = registration.id;
        self.wildcard.push(registration);
        debug!(%id, "wildcard observer registered");
        id
    }

    /// Run `subscribe` the first time this is called and never again once
    /// it succeeds. A failed attempt is retried on the next call.
    pub fn ensure_subscribed<F>(&mut self, subscribe: F) -> StoreResult<()>
    where
        F: FnOnce() -> StoreResult<()>,
    {
        if self.subscribed {
            return Ok(());
        }
        subscribe()?;
        self.subscribed = true;
        debug!("external change feed wired");
        Ok(())
    }

    /// Whether the external feed has been wired.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    /// Deliver `event` to the key's listeners, then to wildcard listeners.
    pub fn notify(&mut self, event: &StorageEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        if let Some(listeners) = self.by_key.get_mut(&event.key) {
            for registration in listeners.iter_mut() {
                dispatch_one(registration, event, &mut report);
            }
        }
        for registration in self.wildcard.iter_mut() {
            dispatch_one(registration, event, &mut report);
        }

        report
    }

    fn register(&mut self, listener: Listener) -> Registration {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        Registration { id, listener }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("keys", &self.by_key.len())
            .field("wildcard", &self.wildcard.len())
            .field("subscribed", &self.subscribed)
            .finish()
    }
}

fn dispatch_one(registration: &mut Registration, event: &StorageEvent, report: &mut DispatchReport) {
    let id = registration.id;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| (registration.listener)(event)));
    match outcome {
        Ok(Ok(())) => report.delivered += 1,
        Ok(Err(err)) => {
            report.failed += 1;
            warn!(%id, key = %event.key, %err, "observer failed");
        }
        Err(_) => {
            report.failed += 1;
            warn!(%id, key = %event.key, "observer panicked");
        }
    }
}

// ── tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::StoreError;

    fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&'static str) -> Listener) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let shared = Arc::clone(&log);
        let make = move |name: &'static str| -> Listener {
            let log = Arc::clone(&shared);
            Box::new(move |event: &StorageEvent| -> ListenerResult {
                log.lock().unwrap().push(format!("{name}:{}", event.key));
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn key_listeners_fire_in_registration_order_then_wildcards() {
        let (log, make) = recorder();
        let mut notifier = ChangeNotifier::new();
        notifier.observe_all(make("all1"));
        notifier.observe("k", make("l1"));
        notifier.observe("k", make("l2"));
        notifier.observe_all(make("all2"));
        notifier.observe("other", make("other"));

        let report = notifier.notify(&StorageEvent::local("k", None, Some("v".into())));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["l1:k", "l2:k", "all1:k", "all2:k"]
        );
        assert_eq!(report, DispatchReport { delivered: 4, failed: 0 });
    }

    #[test]
    fn failing_listener_does_not_stop_dispatch() {
        let (log, make) = recorder();
        let mut notifier = ChangeNotifier::new();
        notifier.observe("k", |_event: &StorageEvent| -> ListenerResult {
            Err("listener refused".into())
        });
        notifier.observe("k", |_event: &StorageEvent| -> ListenerResult {
            panic!("listener blew up")
        });
        notifier.observe("k", make("after"));

        let report = notifier.notify(&StorageEvent::local("k", None, None));

        assert_eq!(*log.lock().unwrap(), vec!["after:k"]);
        assert_eq!(report, DispatchReport { delivered: 1, failed: 2 });
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut notifier = ChangeNotifier::new();
        let a = notifier.observe("k", |_: &StorageEvent| Ok(()));
        let b = notifier.observe_all(|_: &StorageEvent| Ok(()));
        assert!(b > a);
        assert_eq!(a.to_string(), "observer#0");
    }

    #[test]
    fn ensure_subscribed_runs_once() {
        let mut notifier = ChangeNotifier::new();
        let mut calls = 0;
        for _ in 0..3 {
            notifier
                .ensure_subscribed(|| {
                    calls += 1;
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(calls, 1);
        assert!(notifier.is_subscribed());
    }

    #[test]
    fn ensure_subscribed_retries_after_failure() {
        let mut notifier = ChangeNotifier::new();
        let result =
            notifier.ensure_subscribed(|| Err(StoreError::Unavailable("offline".into())));
        assert!(result.is_err());
        assert!(!notifier.is_subscribed());

        notifier.ensure_subscribed(|| Ok(())).unwrap();
        assert!(notifier.is_subscribed());
    }
}
