use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Countdown latch: `wait` completes once `count_down` has been called
/// `count` times
///
/// Counting down past zero is ignored. Everything a task did before its
/// `count_down` is visible to a waiter once `wait` returns.
#[derive(Debug)]
pub(crate) struct Latch {
    remaining: AtomicUsize,
    notify: Notify,
}

impl Latch {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
            notify: Notify::new(),
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub(crate) fn count_down(&self) {
        let previous = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if previous == Ok(1) {
            self.notify.notify_waiters();
        }
    }

    pub(crate) async fn wait(&self) {
        loop {
            // Register interest before checking, otherwise a release between
            // the check and the await would be missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_count_is_open() {
        let latch = Latch::new(0);
        tokio::time::timeout(Duration::from_millis(100), latch.wait())
            .await
            .expect("open latch should not block");
    }

    #[tokio::test]
    async fn test_count_down_saturates() {
        let latch = Latch::new(1);
        latch.count_down();
        latch.count_down();
        assert_eq!(latch.remaining(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_waiters_released_at_zero() {
        let latch = Arc::new(Latch::new(3));

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let latch = Arc::clone(&latch);
                tokio::spawn(async move { latch.wait().await })
            })
            .collect();

        for _ in 0..2 {
            latch.count_down();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(waiters.iter().all(|w| !w.is_finished()));

        latch.count_down();
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should be released")
                .unwrap();
        }
    }
}
