//! Deduplicated warnings.
//!
//! A print job touches every page with the same layers, so the same oddity
//! (an unexpected bucket order, an unsupported tile option) tends to repeat
//! once per page. A [`WarningSet`] forwards each unique message to
//! `log::warn!` a single time.
//!
//! Each job owns its own set, so jobs running side by side never reset or
//! suppress each other's warnings.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Warnings already emitted by one job.
#[derive(Debug, Default)]
pub struct WarningSet {
    seen: Mutex<HashSet<String>>,
}

impl WarningSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Warn about something once per unique `(component, message)` pair.
    ///
    /// Returns `true` if the warning was emitted, `false` if it was a repeat.
    ///
    /// # Example
    /// ```
    /// use tileprint_common::warning::WarningSet;
    ///
    /// let warnings = WarningSet::new();
    /// assert!(warnings.warn_once("composer", "overlay bucket followed by zoom 12 bucket"));
    /// assert!(!warnings.warn_once("composer", "overlay bucket followed by zoom 12 bucket"));
    /// ```
    pub fn warn_once(&self, component: &str, message: &str) -> bool {
        let key = format!("[{component}] {message}");
        let should_emit = self
            .seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);

        if should_emit {
            log::warn!(target: "tileprint", "[{component}] {message}");
        }
        should_emit
    }

    /// Number of distinct warnings emitted so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been emitted yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all recorded warnings.
    pub fn clear(&self) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_once_deduplicates() {
        let warnings = WarningSet::new();
        let message = "dedupe-test-unique-message";
        assert!(warnings.warn_once("test", message));
        assert!(!warnings.warn_once("test", message));
        assert!(warnings.warn_once("other", message));
        assert_eq!(warnings.len(), 2);

        warnings.clear();
        assert!(warnings.is_empty());
        assert!(warnings.warn_once("test", message));
    }

    #[test]
    fn test_sets_are_independent() {
        let first = WarningSet::new();
        let second = WarningSet::new();
        assert!(first.warn_once("composer", "same"));
        assert!(second.warn_once("composer", "same"));
        second.clear();
        assert!(!first.warn_once("composer", "same"));
    }
}
