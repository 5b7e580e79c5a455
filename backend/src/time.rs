use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// Wall-clock source for reconciliation timestamps.
///
/// Never hands out a value earlier than one it already issued, so a clock
/// step backwards cannot backdate a record's `lastUpdated`.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock that will not issue anything earlier than `floor`.
    ///
    /// Used on startup with the newest `lastUpdated` already persisted, so
    /// records that outlive the process are never backdated.
    pub fn starting_at(floor: Option<DateTime<Utc>>) -> Self {
        Self {
            last: Mutex::new(floor),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.observe(Utc::now())
    }

    /// Clamps `wall` against the last issued instant and records the result.
    pub fn observe(&self, wall: DateTime<Utc>) -> DateTime<Utc> {
        let mut last = self.last.lock();
        let out = match *last {
            Some(prev) if prev > wall => prev,
            _ => wall,
        };
        *last = Some(out);
        out
    }
}

/// Milliseconds since the unix epoch, as stored in the database.
pub fn to_epoch_ms(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

pub fn from_epoch_ms(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}
