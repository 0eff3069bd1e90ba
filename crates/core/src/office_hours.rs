use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::errors::DomainError;

pub const DEFAULT_START_HOUR: u32 = 14;
pub const DEFAULT_END_HOUR: u32 = 9;

/// Daily out-of-office window evaluated in a fixed IANA timezone.
///
/// The window opens at `start_hour` and closes at `end_hour` local time. When the start hour is
/// later than the end hour the window wraps past midnight, so `14..9` covers the afternoon, the
/// night, and the early morning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfficeHours {
    start_hour: u32,
    end_hour: u32,
    timezone: Tz,
}

impl Default for OfficeHours {
    fn default() -> Self {
        Self { start_hour: DEFAULT_START_HOUR, end_hour: DEFAULT_END_HOUR, timezone: Tz::UTC }
    }
}

impl OfficeHours {
    pub fn new(start_hour: u32, end_hour: u32, timezone: Tz) -> Result<Self, DomainError> {
        for (field, value) in [("start_hour", start_hour), ("end_hour", end_hour)] {
            if value > 23 {
                return Err(DomainError::InvalidHour { field, value });
            }
        }
        if start_hour == end_hour {
            return Err(DomainError::EmptyOfficeHoursWindow { hour: start_hour });
        }

        Ok(Self { start_hour, end_hour, timezone })
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        now.with_timezone(&self.timezone).hour()
    }

    pub fn is_out_of_office(&self, now: DateTime<Utc>) -> bool {
        self.hour_is_out_of_office(self.local_hour(now))
    }

    pub fn hour_is_out_of_office(&self, hour: u32) -> bool {
        use std::cmp::Ordering::*;

        match self.start_hour.cmp(&self.end_hour) {
            Greater => hour >= self.start_hour || hour < self.end_hour,
            Less => hour >= self.start_hour && hour < self.end_hour,
            // rejected by `new`; an empty window never reports out of office
            Equal => false,
        }
    }
}

pub fn parse_timezone(value: &str) -> Option<Tz> {
    value.trim().parse::<Tz>().ok()
}
