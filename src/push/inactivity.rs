use crate::types::employee::Employee;

use time::{Duration, OffsetDateTime, PrimitiveDateTime, Weekday};

pub const DEFAULT_WINDOW_DAYS: u32 = 15;
/// Longest accepted window, in days of either kind.
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// How far back both activity signals must lie before an employee is
/// reminded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InactivityWindow {
    CalendarDays(u32),
    /// Monday through Friday only; weekends do not count toward the window.
    WorkingDays(u32),
}

impl Default for InactivityWindow {
    fn default() -> Self {
        InactivityWindow::CalendarDays(DEFAULT_WINDOW_DAYS)
    }
}

impl InactivityWindow {
    /// Saturates at the earliest representable instant instead of
    /// overflowing.
    pub fn cutoff(&self, now: OffsetDateTime) -> OffsetDateTime {
        match *self {
            InactivityWindow::CalendarDays(days) => now
                .checked_sub(Duration::days(i64::from(days)))
                .unwrap_or_else(earliest),
            InactivityWindow::WorkingDays(0) => now,
            InactivityWindow::WorkingDays(days) => {
                // Walk back the first 1..=5 working days one by one; from a
                // working day, every further 5 working days span one week.
                let leading = (days - 1) % 5 + 1;
                let weeks = (days - leading) / 5;
                let mut cutoff = now;
                let mut remaining = leading;
                while remaining > 0 {
                    cutoff = match cutoff.checked_sub(Duration::days(1)) {
                        Some(cutoff) => cutoff,
                        None => return earliest(),
                    };
                    if !is_weekend(cutoff.weekday()) {
                        remaining -= 1;
                    }
                }
                cutoff
                    .checked_sub(Duration::weeks(i64::from(weeks)))
                    .unwrap_or_else(earliest)
            }
        }
    }
}

fn earliest() -> OffsetDateTime {
    PrimitiveDateTime::MIN.assume_utc()
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Saturday | Weekday::Sunday)
}

/// Both the last login and the last profile update must be strictly older
/// than `cutoff`. Missing timestamps count as the Unix epoch.
pub fn is_inactive(employee: &Employee, cutoff: OffsetDateTime) -> bool {
    let last_login = employee.last_login.unwrap_or(OffsetDateTime::UNIX_EPOCH);
    let last_update = employee.updated_at.unwrap_or(OffsetDateTime::UNIX_EPOCH);
    last_login < cutoff && last_update < cutoff
}
