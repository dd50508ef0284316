//! Subscription handles.

use std::fmt;
use std::sync::{Mutex, PoisonError};

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Handle for an active attachment to an event source
///
/// Releasing runs the detach action exactly once. Further calls, including the
/// implicit one on drop, are no-ops. [`Subscription::empty`] is the null handle and
/// is always safe to release.
pub struct Subscription {
    release: Mutex<Option<ReleaseFn>>,
}

impl Subscription {
    /// Create a handle that runs `release` when released or dropped
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Mutex::new(Some(Box::new(release))),
        }
    }

    /// A handle attached to nothing
    pub fn empty() -> Self {
        Self {
            release: Mutex::new(None),
        }
    }

    /// Detach from the source
    pub fn release(&self) {
        // Take under the lock, run outside it, so the detach action may re-enter.
        let release = self
            .release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(release) = release {
            release();
        }
    }

    /// Whether the handle no longer holds an attachment
    pub fn is_released(&self) -> bool {
        self.release
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_subscription() -> (Subscription, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let subscription = Subscription::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        (subscription, count)
    }

    #[test]
    fn test_release_runs_once() {
        let (subscription, count) = counting_subscription();
        assert!(!subscription.is_released());

        subscription.release();
        subscription.release();

        assert!(subscription.is_released());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let (subscription, count) = counting_subscription();
        drop(subscription);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_after_release_does_not_rerun() {
        let (subscription, count) = counting_subscription();
        subscription.release();
        drop(subscription);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_subscription() {
        let subscription = Subscription::empty();
        assert!(subscription.is_released());
        subscription.release();
        subscription.release();
    }
}
