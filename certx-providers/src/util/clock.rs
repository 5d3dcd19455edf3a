use std::sync::Arc;

use time::{OffsetDateTime, UtcOffset};

/// Source of the current instant. Its offset is what "local time" means for end-of-day
/// expiration checks.
pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

pub fn system_clock(offset: UtcOffset) -> Clock {
    Arc::new(move || OffsetDateTime::now_utc().to_offset(offset))
}

pub fn fixed_clock(now: OffsetDateTime) -> Clock {
    Arc::new(move || now)
}
