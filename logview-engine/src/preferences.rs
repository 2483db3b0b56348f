//! Filter preferences.
//!
//! Where the user's filter is stored is not the engine's concern; it only
//! needs the current value and a notification when it changes. The owner of
//! the preference holds a [`FilterPreferences`]; the engine holds a
//! `watch::Receiver<Filter>` obtained from [`FilterPreferences::subscribe`].

use logview_types::{Filter, FilterError};
use tokio::sync::watch;

/// Owner side of the filter preference.
#[derive(Debug)]
pub struct FilterPreferences {
    tx: watch::Sender<Filter>,
}

impl FilterPreferences {
    /// Start with `initial`.
    pub fn new(initial: Filter) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// The filter as currently configured.
    pub fn current(&self) -> Filter {
        *self.tx.borrow()
    }

    /// Replace the filter and notify subscribers.
    ///
    /// Invalid filters are rejected before anyone sees them. Setting the same
    /// filter again does not notify.
    pub fn set(&self, filter: Filter) -> Result<(), FilterError> {
        filter.validate()?;
        self.tx.send_if_modified(|current| {
            if *current == filter {
                return false;
            }
            *current = filter;
            true
        });
        Ok(())
    }

    /// A receiver that sees every later change.
    pub fn subscribe(&self) -> watch::Receiver<Filter> {
        self.tx.subscribe()
    }
}

impl Default for FilterPreferences {
    fn default() -> Self {
        Self::new(Filter::unbounded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logview_types::Timestamp;

    #[test]
    fn starts_with_initial_filter() {
        let prefs = FilterPreferences::default();
        assert_eq!(prefs.current(), Filter::unbounded());
    }

    #[tokio::test]
    async fn set_notifies_subscribers() {
        let prefs = FilterPreferences::default();
        let mut rx = prefs.subscribe();

        let next = Filter::absolute(Timestamp::new(1), Timestamp::new(2)).unwrap();
        prefs.set(next).unwrap();

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), next);
    }

    #[test]
    fn same_filter_does_not_notify() {
        let prefs = FilterPreferences::default();
        let rx = prefs.subscribe();
        prefs.set(Filter::unbounded()).unwrap();
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let prefs = FilterPreferences::default();
        let rx = prefs.subscribe();
        let bad = Filter {
            kind: logview_types::FilterKind::AbsoluteRange,
            earliest: Timestamp::new(9),
            latest: Timestamp::new(1),
        };
        assert!(prefs.set(bad).is_err());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(prefs.current(), Filter::unbounded());
    }
}
