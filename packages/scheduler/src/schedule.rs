//! Fixed-period recurring trigger.

use chrono::{DateTime, TimeDelta, Utc};

/// A recurring trigger anchored at its registration time.
///
/// The first trigger is due one period after registration. After each
/// trigger the next due instant advances by exactly one period, so the
/// cadence does not drift with run duration. If more than one period was
/// missed, the missed triggers collapse into the one that just fired.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    period: TimeDelta,
    next_due: DateTime<Utc>,
    last_fired: Option<DateTime<Utc>>,
}

impl DailySchedule {
    /// Registers a once-per-day trigger at `now`.
    #[must_use]
    pub fn daily(now: DateTime<Utc>) -> Self {
        Self {
            period: TimeDelta::days(1),
            next_due: now + TimeDelta::days(1),
            last_fired: None,
        }
    }

    #[must_use]
    pub const fn next_due(&self) -> DateTime<Utc> {
        self.next_due
    }

    #[must_use]
    pub const fn last_fired(&self) -> Option<DateTime<Utc>> {
        self.last_fired
    }

    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_due
    }

    /// Records a trigger observed at `now` and moves to the next boundary
    /// after `now`. Returns how many missed boundaries were skipped.
    pub fn mark_fired(&mut self, now: DateTime<Utc>) -> u32 {
        self.last_fired = Some(now);

        let mut next = self.next_due + self.period;
        let mut skipped = 0;
        while next <= now {
            next += self.period;
            skipped += 1;
        }
        self.next_due = next;
        skipped
    }
}
