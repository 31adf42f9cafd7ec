//! Wall-clock time as a scope capability
//!
//! The [`Now`] factory reads whichever [`SharedClock`] is visible from the
//! scope doing the resolving, so a test or a replayed request can fork a
//! scope, pin a [`ManualClock`] on it and see that time everywhere below.

use std::fmt;
use std::sync::Arc;

use arbor_scope::Entry;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start the clock at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to `now`
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// The clock capability stored on a scope
#[derive(Clone)]
pub struct SharedClock(pub Arc<dyn Clock>);

impl SharedClock {
    /// Wrap `clock` for storage on a scope
    pub fn new<C: Clock + 'static>(clock: C) -> Self {
        Self(Arc::new(clock))
    }

    /// Current time of the wrapped clock
    pub fn now(&self) -> DateTime<Utc> {
        self.0.now()
    }
}

impl fmt::Debug for SharedClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedClock").field(&self.now()).finish()
    }
}

/// Time observed at resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Now(pub DateTime<Utc>);

/// Factory entry for [`Now`]. Falls back to the system clock when no
/// [`SharedClock`] is visible.
pub fn now_entry() -> Entry<Now> {
    Entry::factory(|scope| {
        let now = match scope.resolve::<SharedClock>() {
            Some(clock) => clock.now(),
            None => Utc::now(),
        };
        Arc::new(Now(now))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_scope::Scope;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(epoch());
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), epoch() + Duration::seconds(90));

        clock.set(epoch());
        assert_eq!(clock.now(), epoch());
    }

    #[test]
    fn test_now_uses_clock_visible_from_resolving_scope() {
        let root = Scope::root();
        root.set(SharedClock::new(SystemClock));
        root.insert(now_entry());

        let replay = root.fork();
        let manual = Arc::new(ManualClock::new(epoch()));
        replay.set(SharedClock(manual.clone()));

        let handler = replay.fork();
        assert_eq!(handler.resolve::<Now>().unwrap().0, epoch());

        manual.advance(Duration::minutes(5));
        assert_eq!(
            handler.resolve::<Now>().unwrap().0,
            epoch() + Duration::minutes(5)
        );
        assert!(root.resolve::<Now>().unwrap().0 > epoch());
    }

    #[test]
    fn test_now_without_clock() {
        let root = Scope::root();
        root.insert(now_entry());
        let before = Utc::now();
        assert!(root.resolve::<Now>().unwrap().0 >= before);
    }
}
