//! Event dispatch bus.
//!
//! Each session owns one [`EventBus`]. Listeners are either typed (called for
//! one concrete event type) or wildcard (called for every event). For every
//! dispatched event all wildcard listeners run first, then the typed
//! listeners for that event's kind, each group in registration order.
//!
//! Listeners are awaited one after another. A listener that returns an error
//! or panics never stops the remaining listeners; its failure is handed back
//! to the caller of [`EventBus::dispatch`] as a [`LiveError::Listener`].

use crate::error::{BoxError, LiveError};
use crate::events::{EventKind, LiveEvent, LiveEventType};
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Error type listeners may return.
pub type ListenerError = BoxError;

/// Result type listeners return.
pub type ListenerResult = std::result::Result<(), ListenerError>;

type ErasedListener = Arc<
    dyn Fn(&LiveEvent, CancellationToken) -> Option<BoxFuture<'static, ListenerResult>>
        + Send
        + Sync,
>;

/// Handle returned when a listener is registered, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Per-session registry of event listeners.
#[derive(Default)]
pub struct EventBus {
    wildcard: RwLock<Vec<(ListenerId, ErasedListener)>>,
    typed: RwLock<HashMap<EventKind, Vec<(ListenerId, ErasedListener)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a listener for one concrete event type.
    ///
    /// ```rust,ignore
    /// bus.add_listener(|evt: TurnComplete, _cancel| async move {
    ///     println!("turn complete");
    ///     Ok(())
    /// });
    /// ```
    pub fn add_listener<E, F, Fut>(&self, listener: F) -> ListenerId
    where
        E: LiveEventType,
        F: Fn(E, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        let erased: ErasedListener = Arc::new(move |event: &LiveEvent, cancel: CancellationToken| {
            E::from_event(event).cloned().map(|event| listener(event, cancel).boxed())
        });
        let id = self.next_id();
        self.typed.write().entry(E::KIND).or_default().push((id, erased));
        id
    }

    /// Register a listener that receives every event.
    pub fn add_wildcard_listener<F, Fut>(&self, listener: F) -> ListenerId
    where
        F: Fn(LiveEvent, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ListenerResult> + Send + 'static,
    {
        let erased: ErasedListener = Arc::new(move |event: &LiveEvent, cancel: CancellationToken| {
            Some(listener(event.clone(), cancel).boxed())
        });
        let id = self.next_id();
        self.wildcard.write().push((id, erased));
        id
    }

    /// Remove a typed or wildcard listener. Returns `false` if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        {
            let mut wildcard = self.wildcard.write();
            if let Some(pos) = wildcard.iter().position(|(lid, _)| *lid == id) {
                wildcard.remove(pos);
                return true;
            }
        }
        let mut typed = self.typed.write();
        for listeners in typed.values_mut() {
            if let Some(pos) = listeners.iter().position(|(lid, _)| *lid == id) {
                listeners.remove(pos);
                return true;
            }
        }
        false
    }

    /// Number of listeners that would receive an event of `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.wildcard.read().len() + self.typed.read().get(&kind).map_or(0, Vec::len)
    }

    /// Deliver an event to every matching listener.
    ///
    /// Returns the failures of the listeners that errored or panicked.
    pub async fn dispatch(&self, event: LiveEvent, cancel: &CancellationToken) -> Vec<LiveError> {
        let kind = event.kind();
        // Snapshot so listeners can (de)register while we await them.
        let listeners: Vec<(ListenerId, ErasedListener)> = {
            let wildcard = self.wildcard.read();
            let typed = self.typed.read();
            wildcard.iter().chain(typed.get(&kind).into_iter().flatten()).cloned().collect()
        };

        let mut failed = Vec::new();
        for (id, listener) in listeners {
            let started =
                std::panic::catch_unwind(AssertUnwindSafe(|| listener(&event, cancel.clone())));
            let outcome = match started {
                Ok(None) => continue,
                Ok(Some(fut)) => match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(result) => result.map_err(|e| LiveError::listener(e.to_string())),
                    Err(panic) => Err(LiveError::listener(panic_message(panic.as_ref()))),
                },
                Err(panic) => Err(LiveError::listener(panic_message(panic.as_ref()))),
            };

            if let Err(error) = outcome {
                tracing::debug!(?kind, listener = id.0, %error, "Event listener failed");
                failed.push(error);
            }
        }
        failed
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("listener panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("listener panicked: {}", s)
    } else {
        "listener panicked".to_string()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let typed: usize = self.typed.read().values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("wildcard", &self.wildcard.read().len())
            .field("typed", &typed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{SessionReady, Transcription, TranscriptionDirection, TurnComplete};
    use parking_lot::Mutex;

    fn recorder() -> Arc<Mutex<Vec<String>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn wildcard_runs_before_typed() {
        let bus = EventBus::new();
        let log = recorder();

        let l = log.clone();
        bus.add_listener(move |_: TurnComplete, _| {
            let l = l.clone();
            async move {
                l.lock().push("typed".to_string());
                Ok(())
            }
        });
        let l = log.clone();
        bus.add_wildcard_listener(move |_, _| {
            let l = l.clone();
            async move {
                l.lock().push("wildcard".to_string());
                Ok(())
            }
        });

        let failed = bus.dispatch(TurnComplete.into(), &CancellationToken::new()).await;
        assert!(failed.is_empty());
        assert_eq!(*log.lock(), vec!["wildcard", "typed"]);
    }

    #[tokio::test]
    async fn typed_listener_only_sees_its_kind() {
        let bus = EventBus::new();
        let log = recorder();

        let l = log.clone();
        bus.add_listener(move |evt: Transcription, _| {
            let l = l.clone();
            async move {
                l.lock().push(evt.text);
                Ok(())
            }
        });

        let cancel = CancellationToken::new();
        bus.dispatch(SessionReady.into(), &cancel).await;
        bus.dispatch(
            Transcription { direction: TranscriptionDirection::Output, text: "hi".into() }.into(),
            &cancel,
        )
        .await;

        assert_eq!(*log.lock(), vec!["hi"]);
    }

    #[tokio::test]
    async fn failing_listeners_are_isolated() {
        let bus = EventBus::new();
        let log = recorder();

        bus.add_listener(|_: TurnComplete, _| async { Err("boom".into()) });
        bus.add_listener(|_: TurnComplete, _| async { panic!("kaboom") });
        let l = log.clone();
        bus.add_listener(move |_: TurnComplete, _| {
            let l = l.clone();
            async move {
                l.lock().push("ran".to_string());
                Ok(())
            }
        });

        let failed = bus.dispatch(TurnComplete.into(), &CancellationToken::new()).await;
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().all(|e| matches!(e, LiveError::Listener(_))));
        assert_eq!(*log.lock(), vec!["ran"]);
    }

    #[tokio::test]
    async fn remove_listener_stops_delivery() {
        let bus = EventBus::new();
        let log = recorder();

        let l = log.clone();
        let id = bus.add_wildcard_listener(move |_, _| {
            let l = l.clone();
            async move {
                l.lock().push("x".to_string());
                Ok(())
            }
        });
        assert_eq!(bus.listener_count(EventKind::TurnComplete), 1);
        assert!(bus.remove_listener(id));
        assert!(!bus.remove_listener(id));
        assert_eq!(bus.listener_count(EventKind::TurnComplete), 0);

        bus.dispatch(TurnComplete.into(), &CancellationToken::new()).await;
        assert!(log.lock().is_empty());
    }
}
