use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};

pub const DEFAULT_COOLDOWN_SECS: u64 = 600;

/// Per-conversation spacing between automated notifications.
///
/// Entries are overwritten on every recorded notification and never removed, so the map grows by
/// one entry per distinct conversation for the lifetime of the process.
#[derive(Debug)]
pub struct CooldownGate {
    window: TimeDelta,
    last_notified: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Default for CooldownGate {
    fn default() -> Self {
        Self::from_secs(DEFAULT_COOLDOWN_SECS)
    }
}

impl CooldownGate {
    pub fn from_secs(secs: u64) -> Self {
        let window = i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);
        Self { window, last_notified: Mutex::new(HashMap::new()) }
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// Read-only check; does not record anything.
    pub fn should_notify(&self, key: &str, now: DateTime<Utc>) -> bool {
        let entries = self.entries();
        self.is_open(entries.get(key), now)
    }

    pub fn record_notified(&self, key: &str, now: DateTime<Utc>) {
        self.entries().insert(key.to_owned(), now);
    }

    /// Check and record under a single lock so two concurrent events for the same key cannot
    /// both pass.
    pub fn try_acquire(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries();
        if !self.is_open(entries.get(key), now) {
            return false;
        }

        entries.insert(key.to_owned(), now);
        true
    }

    pub fn last_notified(&self, key: &str) -> Option<DateTime<Utc>> {
        self.entries().get(key).copied()
    }

    pub fn tracked_keys(&self) -> usize {
        self.entries().len()
    }

    fn is_open(&self, last: Option<&DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last {
            None => true,
            Some(last) => now.signed_duration_since(*last) >= self.window,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, DateTime<Utc>>> {
        self.last_notified.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::CooldownGate;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, 22, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn unknown_key_is_always_open() {
        let gate = CooldownGate::default();

        assert!(gate.should_notify("C1", at(0)));
        assert_eq!(gate.tracked_keys(), 0, "should_notify must not record");
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let gate = CooldownGate::from_secs(600);
        gate.record_notified("C1", at(0));

        assert!(!gate.should_notify("C1", at(1)));
        assert!(!gate.should_notify("C1", at(599)));
        assert!(gate.should_notify("C1", at(600)));
        assert!(gate.should_notify("C1", at(3_600)));
    }

    #[test]
    fn keys_are_tracked_independently() {
        let gate = CooldownGate::from_secs(600);
        gate.record_notified("C1", at(0));

        assert!(!gate.should_notify("C1", at(10)));
        assert!(gate.should_notify("C2", at(10)));
    }

    #[test]
    fn record_overwrites_previous_timestamp() {
        let gate = CooldownGate::from_secs(600);
        gate.record_notified("C1", at(0));
        gate.record_notified("C1", at(601));

        assert_eq!(gate.last_notified("C1"), Some(at(601)));
        assert_eq!(gate.tracked_keys(), 1);
        assert!(!gate.should_notify("C1", at(900)));
    }

    #[test]
    fn try_acquire_follows_the_dm_scenario() {
        let gate = CooldownGate::from_secs(600);

        assert!(gate.try_acquire("C1", at(0)));
        assert_eq!(gate.last_notified("C1"), Some(at(0)));
        assert!(!gate.try_acquire("C1", at(300)));
        assert_eq!(gate.last_notified("C1"), Some(at(0)));
        assert!(gate.try_acquire("C1", at(601)));
        assert_eq!(gate.last_notified("C1"), Some(at(601)));
    }

    #[test]
    fn earlier_clock_reading_stays_closed() {
        let gate = CooldownGate::from_secs(600);
        gate.record_notified("C1", at(1_000));

        assert!(!gate.should_notify("C1", at(0)));
    }

    #[test]
    fn concurrent_acquire_admits_exactly_one() {
        let gate = Arc::new(CooldownGate::from_secs(600));
        let now = at(0);

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let gate = Arc::clone(&gate);
                std::thread::spawn(move || gate.try_acquire("C1", now))
            })
            .collect();
        let admitted =
            handles.into_iter().map(|handle| handle.join().expect("thread")).filter(|ok| *ok);

        assert_eq!(admitted.count(), 1);
    }

    #[test]
    fn oversized_window_saturates() {
        let gate = CooldownGate::from_secs(u64::MAX);
        gate.record_notified("C1", at(0));

        assert!(!gate.should_notify("C1", at(86_400 * 365)));
    }
}
