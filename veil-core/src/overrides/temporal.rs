use chrono::{DateTime, Utc};

use crate::capability::ClockProvider;
use crate::timezone::{ResolvedDateTimeOptions, TemporalOverride};

/// Clock whose offset accessor and formatter resolver both report the
/// one [`TemporalOverride`] resolved at install time.
pub struct ProfileClock {
    inner: Box<dyn ClockProvider>,
    temporal: TemporalOverride,
}

impl ProfileClock {
    pub fn new(inner: Box<dyn ClockProvider>, temporal: TemporalOverride) -> Self {
        Self { inner, temporal }
    }
}

impl ClockProvider for ProfileClock {
    fn now(&self) -> DateTime<Utc> {
        self.inner.now()
    }

    fn timezone_offset(&self) -> i32 {
        self.temporal.offset_minutes()
    }

    fn resolved_options(&self) -> ResolvedDateTimeOptions {
        let mut options = self.inner.resolved_options();
        self.temporal.apply_to(&mut options);
        options
    }
}
