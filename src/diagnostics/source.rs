//! Named event sources and the process-wide "source appeared" broadcast.
//!
//! A [`DiagnosticSource`] pushes `(key, payload)` events to its subscribers,
//! synchronously, on whichever thread calls [`DiagnosticSource::write`]. Every source
//! announces itself on an [`AllSources`] registry when it is created, and observers of
//! that registry learn about sources that already exist as well as those created later.

use super::payload::DiagnosticPayload;
use super::subscription::Subscription;
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, RwLock, Weak};

/// Receives the events published by a single [`DiagnosticSource`]
pub trait EventObserver: Send + Sync {
    /// Called for every event written to the source
    fn on_event(&self, key: &str, payload: &dyn DiagnosticPayload);

    /// Called when the source reports a failure of its own
    fn on_error(&self, _error: &(dyn Error + Send + Sync)) {}

    /// Called when the source will publish nothing further
    fn on_completed(&self) {}
}

/// Receives every [`DiagnosticSource`] that appears in a registry
pub trait SourceObserver: Send + Sync {
    /// Called once per source, for existing sources at subscription time and for
    /// every source created afterwards
    fn on_source(&self, source: &Arc<DiagnosticSource>);

    fn on_error(&self, _error: &(dyn Error + Send + Sync)) {}

    fn on_completed(&self) {}
}

type EventSubscribers = Vec<(u64, Arc<dyn EventObserver>)>;
type SourceSubscribers = Vec<(u64, Arc<dyn SourceObserver>)>;

/// A named publisher of diagnostic events
pub struct DiagnosticSource {
    name: String,
    subscribers: RwLock<EventSubscribers>,
    next_id: AtomicU64,
}

impl DiagnosticSource {
    /// Create a source and announce it on the process-wide registry
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::new_in(AllSources::global(), name)
    }

    /// Create a source and announce it on `registry`
    pub fn new_in(registry: &AllSources, name: impl Into<String>) -> Arc<Self> {
        let source = Arc::new(Self {
            name: name.into(),
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        });
        registry.announce(&source);
        source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach an observer; events stop reaching it once the returned handle is released
    pub fn subscribe(self: &Arc<Self>, observer: Arc<dyn EventObserver>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));

        let source = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(source) = source.upgrade() {
                source
                    .subscribers
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(existing, _)| *existing != id);
            }
        })
    }

    /// Whether anyone is listening
    ///
    /// Publishers check this before building a payload that nobody would see.
    pub fn is_enabled(&self) -> bool {
        !self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Publish an event to every current subscriber
    pub fn write(&self, key: &str, payload: &dyn DiagnosticPayload) {
        for observer in self.snapshot() {
            observer.on_event(key, payload);
        }
    }

    /// Forward a failure of the source itself to every subscriber
    pub fn report_error(&self, error: &(dyn Error + Send + Sync)) {
        for observer in self.snapshot() {
            observer.on_error(error);
        }
    }

    /// Tell every subscriber that the source is finished
    pub fn complete(&self) {
        for observer in self.snapshot() {
            observer.on_completed();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    // Observers run without the lock held so they may subscribe or release re-entrantly.
    fn snapshot(&self) -> Vec<Arc<dyn EventObserver>> {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

impl fmt::Debug for DiagnosticSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticSource")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Registry broadcasting the appearance of every [`DiagnosticSource`]
///
/// Sources are held weakly, so dropping the last `Arc` to a source removes it.
pub struct AllSources {
    sources: Mutex<Vec<Weak<DiagnosticSource>>>,
    observers: Mutex<SourceSubscribers>,
    next_id: AtomicU64,
}

impl AllSources {
    /// Create a private registry, independent of the process-wide one
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sources: Mutex::new(Vec::new()),
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        })
    }

    /// The process-wide registry
    pub fn global() -> &'static Arc<AllSources> {
        static GLOBAL: OnceLock<Arc<AllSources>> = OnceLock::new();
        GLOBAL.get_or_init(AllSources::new)
    }

    /// Attach an observer and replay every live source to it
    pub fn subscribe(self: &Arc<Self>, observer: Arc<dyn SourceObserver>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Registering while the source list is locked means a concurrently created
        // source is either in the replay or delivered by `announce`, never both.
        let existing: Vec<Arc<DiagnosticSource>> = {
            let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
            self.observers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((id, Arc::clone(&observer)));
            sources.retain(|source| source.strong_count() > 0);
            sources.iter().filter_map(Weak::upgrade).collect()
        };

        for source in &existing {
            observer.on_source(source);
        }

        let registry = Arc::downgrade(self);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .observers
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(existing, _)| *existing != id);
            }
        })
    }

    /// Names of the sources that are still alive
    pub fn source_names(&self) -> Vec<String> {
        self.sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .map(|source| source.name().to_string())
            .collect()
    }

    /// Forward a registry-level failure to every observer
    pub fn report_error(&self, error: &(dyn Error + Send + Sync)) {
        for observer in self.snapshot() {
            observer.on_error(error);
        }
    }

    /// Tell every observer that no further sources will be announced
    pub fn complete(&self) {
        for observer in self.snapshot() {
            observer.on_completed();
        }
    }

    fn announce(&self, source: &Arc<DiagnosticSource>) {
        let observers = {
            let mut sources = self.sources.lock().unwrap_or_else(PoisonError::into_inner);
            sources.retain(|existing| existing.strong_count() > 0);
            sources.push(Arc::downgrade(source));
            self.snapshot()
        };

        for observer in observers {
            observer.on_source(source);
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn SourceObserver>> {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect()
    }
}

impl fmt::Debug for AllSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllSources")
            .field("sources", &self.source_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingObserver {
        events: Mutex<Vec<String>>,
        errors: AtomicUsize,
        completions: AtomicUsize,
    }

    impl EventObserver for CountingObserver {
        fn on_event(&self, key: &str, _payload: &dyn DiagnosticPayload) {
            self.events.lock().unwrap().push(key.to_string());
        }

        fn on_error(&self, _error: &(dyn Error + Send + Sync)) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_completed(&self) {
            self.completions.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct NameCollector {
        names: Mutex<Vec<String>>,
    }

    impl SourceObserver for NameCollector {
        fn on_source(&self, source: &Arc<DiagnosticSource>) {
            self.names.lock().unwrap().push(source.name().to_string());
        }
    }

    #[test]
    fn test_write_reaches_subscriber() {
        let registry = AllSources::new();
        let source = DiagnosticSource::new_in(&registry, "test.source");
        let observer = Arc::new(CountingObserver::default());

        let _subscription = source.subscribe(observer.clone());
        source.write("Key.One", &"payload");
        source.write("Key.Two", &1_u8);

        assert_eq!(*observer.events.lock().unwrap(), vec!["Key.One", "Key.Two"]);
    }

    #[test]
    fn test_release_stops_delivery() {
        let registry = AllSources::new();
        let source = DiagnosticSource::new_in(&registry, "test.source");
        let observer = Arc::new(CountingObserver::default());

        let subscription = source.subscribe(observer.clone());
        assert!(source.is_enabled());

        subscription.release();
        assert!(!source.is_enabled());

        source.write("Key.One", &"payload");
        assert!(observer.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_release_after_source_dropped() {
        let registry = AllSources::new();
        let source = DiagnosticSource::new_in(&registry, "test.source");
        let subscription = source.subscribe(Arc::new(CountingObserver::default()));

        drop(source);
        subscription.release();
    }

    #[test]
    fn test_error_and_completion_forwarded() {
        let registry = AllSources::new();
        let source = DiagnosticSource::new_in(&registry, "test.source");
        let observer = Arc::new(CountingObserver::default());
        let _subscription = source.subscribe(observer.clone());

        let error = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        source.report_error(&error);
        source.complete();

        assert_eq!(observer.errors.load(Ordering::SeqCst), 1);
        assert_eq!(observer.completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registry_replays_existing_sources() {
        let registry = AllSources::new();
        let _first = DiagnosticSource::new_in(&registry, "first");
        let collector = Arc::new(NameCollector::default());

        let _subscription = registry.subscribe(collector.clone());
        let _second = DiagnosticSource::new_in(&registry, "second");

        assert_eq!(*collector.names.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_registry_forgets_dropped_sources() {
        let registry = AllSources::new();
        let kept = DiagnosticSource::new_in(&registry, "kept");
        drop(DiagnosticSource::new_in(&registry, "dropped"));

        assert_eq!(registry.source_names(), vec![kept.name().to_string()]);
    }

    #[test]
    fn test_registry_release_stops_announcements() {
        let registry = AllSources::new();
        let collector = Arc::new(NameCollector::default());

        let subscription = registry.subscribe(collector.clone());
        subscription.release();
        let _source = DiagnosticSource::new_in(&registry, "late");

        assert!(collector.names.lock().unwrap().is_empty());
    }
}
