//! Conversion of wall-clock times between the `local` and `JST` event zones.

use chrono::offset::LocalResult;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use crate::constants::JST_ZONE;
use crate::error::{DaybookError, DaybookResult};
use crate::event::{EventTimezone, TimeOfDay};

/// A converted wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZonedTime {
    pub date: NaiveDate,
    pub time: TimeOfDay,
    /// Days the conversion moved across midnight: -1, 0 or 1.
    pub day_offset: i64,
}

/// Converts times between the environment's zone and Japan Standard Time.
///
/// The local zone is resolved once at construction. Use [`TimeZoneConverter::new`]
/// to pin it (tests, or a configured override).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeZoneConverter {
    local: Tz,
}

impl TimeZoneConverter {
    pub fn new(local: Tz) -> Self {
        TimeZoneConverter { local }
    }

    /// Use the zone the process runs in, or UTC if it can't be determined.
    pub fn system() -> Self {
        let local = match iana_time_zone::get_timezone() {
            Ok(name) => name.parse::<Tz>().unwrap_or_else(|_| {
                tracing::warn!(zone = %name, "unknown system timezone, using UTC");
                Tz::UTC
            }),
            Err(err) => {
                tracing::warn!(%err, "could not determine system timezone, using UTC");
                Tz::UTC
            }
        };
        tracing::debug!(zone = %local, "resolved local timezone");

        TimeZoneConverter { local }
    }

    pub fn local_zone(&self) -> Tz {
        self.local
    }

    pub fn zone(&self, timezone: EventTimezone) -> Tz {
        match timezone {
            EventTimezone::Local => self.local,
            EventTimezone::Jst => JST_ZONE,
        }
    }

    /// Convert an `HH:mm` time between zones, as it would be today in the
    /// source zone.
    ///
    /// Only the time is returned: a conversion across midnight lands on a
    /// different calendar day, which [`TimeZoneConverter::to_zone_on`] reports.
    pub fn to_zone(
        &self,
        time: &str,
        from: EventTimezone,
        to: EventTimezone,
    ) -> DaybookResult<String> {
        let parsed: TimeOfDay = time.parse()?;
        if from == to {
            return Ok(parsed.to_string());
        }

        let today = Utc::now().with_timezone(&self.zone(from)).date_naive();
        Ok(self.convert(today, parsed, from, to)?.time.to_string())
    }

    /// Convert an `HH:mm` time on a given source-zone date.
    pub fn to_zone_on(
        &self,
        time: &str,
        from: EventTimezone,
        to: EventTimezone,
        date: NaiveDate,
    ) -> DaybookResult<ZonedTime> {
        let parsed: TimeOfDay = time.parse()?;
        self.convert(date, parsed, from, to)
    }

    pub fn convert(
        &self,
        date: NaiveDate,
        time: TimeOfDay,
        from: EventTimezone,
        to: EventTimezone,
    ) -> DaybookResult<ZonedTime> {
        if from == to {
            return Ok(ZonedTime {
                date,
                time,
                day_offset: 0,
            });
        }

        let target = self.instant(date, time, from)?.with_timezone(&self.zone(to));
        let target_date = target.date_naive();

        Ok(ZonedTime {
            date: target_date,
            time: TimeOfDay::from(target.time()),
            day_offset: (target_date - date).num_days(),
        })
    }

    /// The absolute instant of a wall-clock date and time in an event zone.
    ///
    /// Times skipped by a DST transition are rejected; repeated times resolve
    /// to their first occurrence.
    pub fn instant(
        &self,
        date: NaiveDate,
        time: TimeOfDay,
        timezone: EventTimezone,
    ) -> DaybookResult<DateTime<Utc>> {
        let tz = self.zone(timezone);
        match tz.from_local_datetime(&date.and_time(time.as_naive())) {
            LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
            LocalResult::None => Err(DaybookError::InvalidTime(format!(
                "{} {} does not exist in {}",
                date, time, tz
            ))),
        }
    }

    /// Render an event time for display in the local zone.
    pub fn format_event_time(&self, time: Option<&TimeOfDay>, timezone: EventTimezone) -> String {
        let Some(time) = time else {
            return String::new();
        };

        let today = Utc::now().with_timezone(&self.zone(timezone)).date_naive();
        match self.convert(today, *time, timezone, EventTimezone::Local) {
            Ok(zoned) => zoned.time.to_string(),
            Err(_) => time.to_string(),
        }
    }
}

impl Default for TimeZoneConverter {
    fn default() -> Self {
        TimeZoneConverter::system()
    }
}
