//! Injectable time source.
//!
//! The scan poller only ever asks for "now" and "sleep for this long", so
//! tests can swap in [`VirtualTimeProvider`] and step through polling without
//! real timers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Boxed sleep future returned by [`TimeProvider::sleep`].
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Trait for providing time in tests and production
pub trait TimeProvider: Send + Sync + 'static {
    /// Get the current instant
    fn now(&self) -> Instant;

    /// Get the current UTC datetime
    fn utc_now(&self) -> DateTime<Utc>;

    /// Sleep for a duration (in tests, this waits on virtual time)
    fn sleep(&self, duration: Duration) -> Sleep;
}

/// Production time provider backed by the tokio timer
#[derive(Clone, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Virtual time provider for testing
///
/// In the default mode sleeps stay pending until [`advance`] moves virtual
/// time past their deadline. In auto-advancing mode every sleep jumps the
/// clock forward by its duration and completes immediately, which is enough
/// to drive a loop to completion while still recording each requested delay.
///
/// [`advance`]: VirtualTimeProvider::advance
#[derive(Clone, Debug)]
pub struct VirtualTimeProvider {
    inner: Arc<VirtualClock>,
}

#[derive(Debug)]
struct VirtualClock {
    base_instant: Instant,
    base_utc: DateTime<Utc>,
    offset: Mutex<Duration>,
    timers: Mutex<Vec<VirtualTimer>>,
    requested: Mutex<Vec<Duration>>,
    auto_advance: bool,
}

/// A virtual timer that can be resolved when time advances
#[derive(Debug)]
struct VirtualTimer {
    deadline: Duration,
    waker: Waker,
}

impl VirtualTimeProvider {
    /// Create a virtual clock whose sleeps wait for [`Self::advance`].
    pub fn new() -> Self {
        Self::build(false)
    }

    /// Create a virtual clock that advances itself on every sleep.
    pub fn auto_advancing() -> Self {
        Self::build(true)
    }

    fn build(auto_advance: bool) -> Self {
        Self {
            inner: Arc::new(VirtualClock {
                base_instant: Instant::now(),
                base_utc: Utc::now(),
                offset: Mutex::new(Duration::ZERO),
                timers: Mutex::new(Vec::new()),
                requested: Mutex::new(Vec::new()),
                auto_advance,
            }),
        }
    }

    /// Virtual time elapsed since the provider was created.
    pub fn elapsed(&self) -> Duration {
        *self.inner.offset.lock()
    }

    /// Advance time by a duration and wake expired timers.
    pub fn advance(&self, duration: Duration) {
        let now = {
            let mut offset = self.inner.offset.lock();
            *offset += duration;
            *offset
        };
        self.wake_expired_timers(now);
    }

    /// Advance time to the next timer deadline
    pub fn advance_to_next_timer(&self) -> Option<Duration> {
        let next = self
            .inner
            .timers
            .lock()
            .iter()
            .map(|timer| timer.deadline)
            .min()?;
        let current = self.elapsed();
        if next > current {
            let step = next - current;
            self.advance(step);
            Some(step)
        } else {
            self.wake_expired_timers(current);
            None
        }
    }

    /// Get the number of pending timers
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.lock().len()
    }

    /// Every duration passed to [`TimeProvider::sleep`], in call order.
    pub fn requested_sleeps(&self) -> Vec<Duration> {
        self.inner.requested.lock().clone()
    }

    fn wake_expired_timers(&self, now: Duration) {
        let expired: Vec<Waker> = {
            let mut timers = self.inner.timers.lock();
            let (expired, pending): (Vec<_>, Vec<_>) =
                timers.drain(..).partition(|timer| timer.deadline <= now);
            *timers = pending;
            expired.into_iter().map(|timer| timer.waker).collect()
        };
        for waker in expired {
            waker.wake();
        }
    }
}

impl Default for VirtualTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for VirtualTimeProvider {
    fn now(&self) -> Instant {
        self.inner.base_instant + self.elapsed()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let offset = chrono::Duration::from_std(self.elapsed())
            .unwrap_or(chrono::Duration::zero());
        self.inner.base_utc + offset
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        self.inner.requested.lock().push(duration);
        let deadline = self.elapsed() + duration;
        if self.inner.auto_advance {
            self.advance(duration);
        }
        Box::pin(VirtualSleep {
            provider: self.clone(),
            deadline,
            registered: false,
        })
    }
}

/// Future that completes when virtual time advances past a deadline
struct VirtualSleep {
    provider: VirtualTimeProvider,
    deadline: Duration,
    registered: bool,
}

impl Future for VirtualSleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.provider.elapsed() >= self.deadline {
            return Poll::Ready(());
        }
        if !self.registered {
            self.provider.inner.timers.lock().push(VirtualTimer {
                deadline: self.deadline,
                waker: cx.waker().clone(),
            });
            self.registered = true;
        }
        Poll::Pending
    }
}
