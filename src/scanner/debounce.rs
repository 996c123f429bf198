//! A trailing-edge debounce (`spec.md` §4.5): a burst of calls within the delay window collapses
//! into a single execution of the action, which fires only once no further call has arrived for
//! the full delay. Modeled on `github.com/bep/debounce`'s `debounce.New`, the library the original
//! scanner used for the same purpose.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Clone)]
pub struct Debounce {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Schedules `action` to run after the delay, unless a later call supersedes it first. Every
    /// call bumps the generation; only the call holding the newest generation when its sleep
    /// elapses actually runs `action`.
    pub fn call<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let my_generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if generation.load(Ordering::SeqCst) == my_generation {
                action();
            }
        });
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test(start_paused = true)]
    async fn burst_of_calls_within_window_fires_action_once() {
        // given
        let debounce = Debounce::new(Duration::from_millis(100));
        let count = Arc::new(AtomicUsize::new(0));

        // when: three calls in quick succession, well inside the debounce window
        for _ in 0..3 {
            let count = count.clone();
            debounce.call(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::advance(Duration::from_millis(10)).await;
        }
        tokio::time::advance(Duration::from_millis(200)).await;

        // then
        assert_eq!(1, count.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn calls_spaced_beyond_window_each_fire() {
        // given
        let debounce = Debounce::new(Duration::from_millis(50));
        let count = Arc::new(AtomicUsize::new(0));

        // when
        for _ in 0..2 {
            let count = count.clone();
            debounce.call(move || {
                count.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        // then
        assert_eq!(2, count.load(Ordering::SeqCst));
    }
}
