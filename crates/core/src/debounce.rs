//! Trailing-edge debounce for values that change while the user types.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};
use tracing::trace;

use crate::error::PortalError;

/// A debounce unit owned by a single input element.
///
/// Every [`feed`](Self::feed) aborts the pending countdown and schedules a new
/// one; only a countdown that runs for the full delay publishes a settle event.
/// Dropping the unit disposes it.
pub struct Debouncer<T> {
    delay: Duration,
    runtime: Handle,
    inner: Arc<Mutex<Inner<T>>>,
}

struct Inner<T> {
    raw: Option<T>,
    settled: T,
    // Bumped on every feed; a woken countdown only publishes if it still matches.
    generation: u64,
    pending: Option<JoinHandle<()>>,
    disposed: bool,
    listeners: Vec<mpsc::UnboundedSender<T>>,
}

impl<T> Debouncer<T>
where
    T: Clone + Send + 'static,
{
    /// Create a unit on the current Tokio runtime. `initial` is reported as the
    /// settled value until the first settle event.
    pub fn new(delay: Duration, initial: T) -> Result<Self, PortalError> {
        if delay.is_zero() {
            return Err(PortalError::ZeroDelay);
        }
        let runtime = Handle::try_current()?;
        Ok(Self {
            delay,
            runtime,
            inner: Arc::new(Mutex::new(Inner {
                raw: None,
                settled: initial,
                generation: 0,
                pending: None,
                disposed: false,
                listeners: Vec::new(),
            })),
        })
    }

    /// Record a new raw value and restart the countdown. No-op once disposed.
    pub fn feed(&self, value: T) {
        let mut inner = self.inner.lock();
        if inner.disposed {
            trace!("feed after dispose ignored");
            return;
        }
        if let Some(pending) = inner.pending.take() {
            pending.abort();
        }
        inner.generation = inner.generation.wrapping_add(1);
        inner.raw = Some(value.clone());

        let generation = inner.generation;
        let delay = self.delay;
        let shared = Arc::clone(&self.inner);
        inner.pending = Some(self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let mut inner = shared.lock();
            if inner.disposed || inner.generation != generation {
                return;
            }
            inner.pending = None;
            inner.settled = value.clone();
            inner
                .listeners
                .retain(|listener| listener.send(value.clone()).is_ok());
        }));
    }

    /// Latest value that held for the full delay, or the initial value.
    pub fn current_settled_value(&self) -> T {
        self.inner.lock().settled.clone()
    }

    /// Most recently fed value, settled or not.
    pub fn raw_value(&self) -> Option<T> {
        self.inner.lock().raw.clone()
    }

    /// Whether a countdown is running.
    pub fn is_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// Receiver yielding one value per settle event from now on. The channel
    /// closes when the unit is disposed.
    pub fn settle_events(&self) -> mpsc::UnboundedReceiver<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.inner.lock();
        if !inner.disposed {
            inner.listeners.push(tx);
        }
        rx
    }

    /// Cancel any pending countdown and stop accepting input.
    pub fn dispose(&self) {
        self.inner.lock().shut_down();
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.inner.lock().shut_down();
    }
}

impl<T> Inner<T> {
    fn shut_down(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        // Dropping the senders closes every settle receiver.
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tokio::{sync::mpsc::error::TryRecvError, time::sleep};

    const DELAY: Duration = Duration::from_millis(500);

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_into_last_value() -> Result<()> {
        let unit = Debouncer::new(DELAY, String::new())?;
        let mut events = unit.settle_events();

        unit.feed("a".to_string());
        sleep(ms(40)).await;
        unit.feed("ap".to_string());
        sleep(ms(40)).await;
        unit.feed("app".to_string());

        sleep(ms(499)).await;
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(unit.current_settled_value(), "");
        assert_eq!(unit.raw_value().as_deref(), Some("app"));

        sleep(ms(2)).await;
        assert_eq!(events.try_recv(), Ok("app".to_string()));
        assert_eq!(unit.current_settled_value(), "app");
        assert!(!unit.is_pending());

        sleep(ms(5_000)).await;
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn separated_feeds_settle_independently() -> Result<()> {
        let unit = Debouncer::new(DELAY, String::new())?;
        let mut events = unit.settle_events();

        unit.feed("first".to_string());
        sleep(ms(600)).await;
        unit.feed("second".to_string());
        sleep(ms(600)).await;

        assert_eq!(events.try_recv(), Ok("first".to_string()));
        assert_eq!(events.try_recv(), Ok("second".to_string()));
        assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn dispose_silences_pending_and_future_feeds() -> Result<()> {
        let unit = Debouncer::new(DELAY, String::new())?;
        let mut events = unit.settle_events();

        unit.feed("typed".to_string());
        unit.dispose();
        unit.feed("late".to_string());
        sleep(ms(2_000)).await;

        assert!(!unit.is_pending());
        assert_eq!(events.recv().await, None);
        assert_eq!(unit.current_settled_value(), "");
        assert_eq!(unit.raw_value().as_deref(), Some("typed"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_unit_cancels_the_countdown() -> Result<()> {
        let unit = Debouncer::new(DELAY, 0u32)?;
        let mut events = unit.settle_events();
        unit.feed(7);
        drop(unit);
        sleep(ms(1_000)).await;
        assert_eq!(events.recv().await, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn empty_values_settle_like_any_other() -> Result<()> {
        let unit = Debouncer::new(DELAY, "seed".to_string())?;
        let mut events = unit.settle_events();
        unit.feed(String::new());
        sleep(ms(501)).await;
        assert_eq!(events.try_recv(), Ok(String::new()));
        assert_eq!(unit.current_settled_value(), "");
        Ok(())
    }

    #[tokio::test]
    async fn zero_delay_is_rejected() {
        assert!(matches!(
            Debouncer::new(Duration::ZERO, ()),
            Err(PortalError::ZeroDelay)
        ));
    }

    #[test]
    fn requires_a_runtime() {
        assert!(matches!(
            Debouncer::new(DELAY, ()),
            Err(PortalError::NoRuntime(_))
        ));
    }
}
