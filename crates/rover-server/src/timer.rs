//! The reusable reconnect timer.
//!
//! The network manager arms it synchronously; the controller loop sleeps
//! until the stored deadline and calls back into the device when it passes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use rover_core::RetryTimer;

/// One-shot deadline shared between the timer and the controller loop.
#[derive(Debug, Clone, Default)]
pub struct RetryDeadline(Arc<Mutex<Option<Instant>>>);

impl RetryDeadline {
    pub fn get(&self) -> Option<Instant> {
        *self.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Disarms the deadline if it is still `expected`; returns whether it was.
    pub fn take_if(&self, expected: Instant) -> bool {
        let mut slot = self.0.lock().unwrap_or_else(|p| p.into_inner());
        if *slot == Some(expected) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn set(&self, deadline: Option<Instant>) {
        *self.0.lock().unwrap_or_else(|p| p.into_inner()) = deadline;
    }
}

/// [`RetryTimer`] backed by a [`RetryDeadline`].
#[derive(Debug, Clone)]
pub struct TokioRetryTimer {
    deadline: RetryDeadline,
}

impl TokioRetryTimer {
    pub fn new(deadline: RetryDeadline) -> Self {
        Self { deadline }
    }
}

impl RetryTimer for TokioRetryTimer {
    fn schedule(&mut self, delay: Duration) {
        self.deadline.set(Some(Instant::now() + delay));
    }

    fn cancel(&mut self) {
        self.deadline.set(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_schedule_replaces_previous_deadline() {
        let deadline = RetryDeadline::default();
        let mut timer = TokioRetryTimer::new(deadline.clone());

        timer.schedule(Duration::from_secs(5));
        let first = deadline.get().unwrap();
        timer.schedule(Duration::from_secs(1));
        let second = deadline.get().unwrap();
        assert!(second < first);

        assert!(!deadline.take_if(first));
        assert!(deadline.take_if(second));
        assert_eq!(deadline.get(), None);

        timer.schedule(Duration::from_secs(1));
        timer.cancel();
        assert_eq!(deadline.get(), None);
    }
}
