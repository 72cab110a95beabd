//! Progress reporting for whole-surface extraction.
//!
//! The pipeline reports once per finished fold. Folds may finish out of order
//! when running in parallel, so the callback must be `Send + Sync` and should
//! not assume `done` increases by exactly one between calls on one thread.
//!
//! ```
//! use fundi::algo::progress::Progress;
//!
//! let progress = Progress::new(|done, total, message| {
//!     eprintln!("[{}/{}] {}", done, total, message);
//! });
//! progress.report(1, 3, "fold 2");
//! ```

/// Callback receiving `(done, total, message)` updates.
pub struct Progress {
    callback: Box<dyn Fn(usize, usize, &str) + Send + Sync>,
}

impl Progress {
    /// Wrap a callback.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(usize, usize, &str) + Send + Sync + 'static,
    {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Report that `done` of `total` units are finished.
    #[inline]
    pub fn report(&self, done: usize, total: usize, message: &str) {
        (self.callback)(done, total, message);
    }

    /// A reporter that discards updates.
    pub fn none() -> Self {
        Self::new(|_, _, _| {})
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::none()
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_callback_receives_updates() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let progress = Progress::new(move |done, total, _| {
            assert!(done <= total);
            seen.fetch_add(1, Ordering::Relaxed);
        });
        progress.report(1, 2, "a");
        progress.report(2, 2, "b");
        Progress::default().report(5, 5, "ignored");
        assert_eq!(calls.load(Ordering::Relaxed), 2);
    }
}
