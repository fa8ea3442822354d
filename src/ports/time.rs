use std::time::Duration;

use time::{OffsetDateTime, UtcOffset};

/// Clock used by the scheduler and the activity hooks. Tests substitute a
/// clock whose sleeps only finish when triggered.
pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime;

    /// Current instant as wall-clock time at `offset`.
    fn now_at(&self, offset: UtcOffset) -> OffsetDateTime {
        self.now().to_offset(offset)
    }

    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;
}
