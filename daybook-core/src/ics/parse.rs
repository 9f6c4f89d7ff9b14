//! ICS import using the icalendar crate's parser.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::parser::{Component, Property, read_calendar, unfold};
use icalendar::{CalendarDateTime, DatePerhapsTime};

use crate::category::{CategoryRef, EventCategory};
use crate::constants::{DEFAULT_CATEGORY_COLOR, IMPORTED_CATEGORY_ID, JST_ZONE};
use crate::event::{Event, EventTimezone, Reminder, ReminderKind, TimeOfDay};
use crate::export::ExportFormat;
use crate::import::ImportResult;
use crate::timezone::TimeZoneConverter;

pub const INVALID_ICS: &str = "Invalid ICS format";

/// Import every VEVENT of a calendar document as a single, non-recurring event.
///
/// UTC and foreign-zone start times are converted to the local zone;
/// `Asia/Tokyo` start times are kept as JST.
pub fn from_ics(text: &str, converter: &TimeZoneConverter) -> ImportResult {
    let looks_like_calendar = text
        .trim_start()
        .get(..15)
        .is_some_and(|s| s.eq_ignore_ascii_case("BEGIN:VCALENDAR"));
    if !looks_like_calendar {
        tracing::warn!("import document is not an iCalendar document");
        return ImportResult::failed(INVALID_ICS);
    }

    let unfolded = unfold(text);
    let calendar = match read_calendar(&unfolded) {
        Ok(calendar) => calendar,
        Err(err) => {
            tracing::warn!(%err, "unreadable iCalendar document");
            return ImportResult::failed(INVALID_ICS);
        }
    };

    let mut vevents = Vec::new();
    collect_vevents(&calendar.components, &mut vevents);

    let now = Utc::now();
    let mut events = Vec::new();
    let mut errors = Vec::new();

    for (index, vevent) in vevents.into_iter().enumerate() {
        let position = index + 1;
        match to_event(vevent, converter, now) {
            Some(event) => events.push(event),
            None => {
                tracing::debug!(position, "skipping VEVENT without summary or start");
                errors.push(format!("Event {position}: Missing required fields"));
            }
        }
    }

    let result = ImportResult::from_records(events, errors);
    result.log_summary(ExportFormat::Ics);
    result
}

fn collect_vevents<'c, 'a>(components: &'c [Component<'a>], out: &mut Vec<&'c Component<'a>>) {
    for component in components {
        if component.name == "VEVENT" {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

fn to_event(vevent: &Component, converter: &TimeZoneConverter, now: DateTime<Utc>) -> Option<Event> {
    let title = vevent
        .find_prop("SUMMARY")
        .map(|p| p.val.to_string())
        .filter(|s| !s.trim().is_empty())?;
    let (date, time, timezone) = parse_start(vevent.find_prop("DTSTART")?, converter)?;

    let text_prop = |name: &str| {
        vevent
            .find_prop(name)
            .map(|p| p.val.to_string())
            .filter(|s| !s.is_empty())
    };

    let id = vevent
        .find_prop("UID")
        .map(|p| p.val.to_string())
        .filter(|uid| !uid.is_empty())
        .unwrap_or_else(|| format!("imported-{}", uuid::Uuid::new_v4()));

    let category_name = text_prop("CATEGORIES")
        .and_then(|c| c.split(',').next().map(str::trim).map(str::to_string))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "Imported".to_string());

    // Reminders from VALARM components
    let reminders: Vec<Reminder> = vevent
        .components
        .iter()
        .filter(|c| c.name == "VALARM")
        .filter_map(|alarm| {
            let trigger: &str = alarm.find_prop("TRIGGER")?.val.as_ref();
            let minutes = parse_trigger_minutes(trigger)?;
            let kind = match alarm.find_prop("ACTION").map(|p| p.val.to_string()) {
                Some(action) if action == "EMAIL" => ReminderKind::Email,
                _ => ReminderKind::Notification,
            };
            Some(Reminder::new(kind, minutes))
        })
        .collect();

    Some(Event {
        id,
        title,
        description: text_prop("DESCRIPTION"),
        date,
        time,
        location: text_prop("LOCATION"),
        color: None,
        category: CategoryRef::Category(EventCategory {
            id: IMPORTED_CATEGORY_ID.to_string(),
            name: category_name,
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            icon: None,
        }),
        is_recurring: false,
        recurrence_type: None,
        recurrence_end: None,
        timezone,
        reminders,
        created_at: now,
        updated_at: now,
    })
}

/// Parse DTSTART into a date, optional time and event zone.
///
/// DATE values carry no time. UTC and foreign-zone date-times are moved to
/// the local zone; `Asia/Tokyo` keeps its wall clock as JST. Floating times
/// and unknown TZIDs keep their wall clock as local.
fn parse_start(
    prop: &Property,
    converter: &TimeZoneConverter,
) -> Option<(NaiveDate, Option<TimeOfDay>, EventTimezone)> {
    let to_local = |instant: DateTime<Utc>| {
        let local = instant.with_timezone(&converter.local_zone());
        (
            local.date_naive(),
            Some(TimeOfDay::from(local.time())),
            EventTimezone::Local,
        )
    };
    let wall_clock = |dt: NaiveDateTime, timezone| {
        (dt.date(), Some(TimeOfDay::from(dt.time())), timezone)
    };

    match DatePerhapsTime::try_from(prop).ok()? {
        DatePerhapsTime::Date(date) => Some((date, None, EventTimezone::Local)),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(to_local(dt)),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(dt)) => {
            Some(wall_clock(dt, EventTimezone::Local))
        }
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            if tzid == JST_ZONE.name() {
                return Some(wall_clock(date_time, EventTimezone::Jst));
            }
            match tzid.parse::<Tz>() {
                Ok(zone) => {
                    let instant = zone.from_local_datetime(&date_time).earliest()?;
                    Some(to_local(instant.with_timezone(&Utc)))
                }
                Err(_) => {
                    tracing::debug!(tzid = %tzid, "unknown TZID, keeping wall-clock time");
                    Some(wall_clock(date_time, EventTimezone::Local))
                }
            }
        }
    }
}

/// Parse a TRIGGER value to minutes before the event (-PT30M, -P1D, etc.).
/// Triggers after the start can't be expressed as a reminder.
fn parse_trigger_minutes(value: &str) -> Option<u32> {
    let duration_str = value.strip_prefix('-')?;

    let duration = iso8601::duration(duration_str).ok()?;
    let std_duration: std::time::Duration = duration.into();

    u32::try_from(std_duration.as_secs() / 60).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportOptions;
    use crate::ics::to_ics;

    fn converter() -> TimeZoneConverter {
        TimeZoneConverter::new(Tz::UTC)
    }

    #[test]
    fn test_roundtrip_generated_document() {
        let event = Event {
            id: "event-123".to_string(),
            title: "Planning; Q3".to_string(),
            description: Some("Agenda:\n1. Budget\n2. C:\\shared".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
            time: None,
            location: Some("Room 4, HQ".to_string()),
            color: None,
            category: CategoryRef::default(),
            is_recurring: false,
            recurrence_type: None,
            recurrence_end: None,
            timezone: EventTimezone::Local,
            reminders: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let ics = to_ics(
            std::slice::from_ref(&event),
            &ExportOptions::new(ExportFormat::Ics),
            Utc::now(),
        );
        let result = from_ics(&ics, &converter());

        assert!(result.success, "Errors: {:?}", result.errors);
        let imported = &result.events[0];
        assert_eq!(imported.id, event.id);
        assert_eq!(imported.title, event.title);
        assert_eq!(imported.date, event.date);
        assert_eq!(imported.time, None);
        assert_eq!(imported.description, event.description);
        assert_eq!(imported.location, event.location);
    }

    #[test]
    fn test_parse_timed_events_and_alarms() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:TEST\r\n\
BEGIN:VEVENT\r\n\
UID:utc-1\r\n\
SUMMARY:UTC meeting\r\n\
DTSTART:20240101T100000Z\r\n\
BEGIN:VALARM\r\n\
ACTION:DISPLAY\r\n\
TRIGGER:-PT30M\r\n\
END:VALARM\r\n\
BEGIN:VALARM\r\n\
ACTION:EMAIL\r\n\
TRIGGER:-P1D\r\n\
END:VALARM\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:tokyo-1\r\n\
SUMMARY:Tokyo call\r\n\
DTSTART;TZID=Asia/Tokyo:20240102T090000\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:ny-1\r\n\
SUMMARY:New York lunch\r\n\
DTSTART;TZID=America/New_York:20240103T120000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let result = from_ics(ics, &converter());
        assert!(result.success, "Errors: {:?}", result.errors);
        assert_eq!(result.events_added, 3);

        let utc = &result.events[0];
        assert_eq!(utc.time, TimeOfDay::new(10, 0));
        assert_eq!(utc.timezone, EventTimezone::Local);
        let reminder_minutes: Vec<u32> = utc.reminders.iter().map(|r| r.time).collect();
        assert_eq!(reminder_minutes, vec![30, 1440]);
        assert_eq!(utc.reminders[1].kind, ReminderKind::Email);

        let tokyo = &result.events[1];
        assert_eq!(tokyo.time, TimeOfDay::new(9, 0));
        assert_eq!(tokyo.timezone, EventTimezone::Jst);

        // EST is UTC-5
        let ny = &result.events[2];
        assert_eq!(ny.time, TimeOfDay::new(17, 0));
        assert_eq!(ny.date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
    }

    #[test]
    fn test_vevent_without_summary_is_skipped() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:no-summary\r\n\
DTSTART:20240101\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:ok\r\n\
SUMMARY:Fine\r\n\
DTSTART;VALUE=DATE:20240102\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let result = from_ics(ics, &converter());
        assert!(!result.success);
        assert_eq!(result.events_added, 1);
        assert_eq!(result.errors, vec!["Event 1: Missing required fields"]);
    }

    #[test]
    fn test_text_values_are_decoded_once() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:text-1\r\n\
SUMMARY:Lunch\\, then walk\\; maybe\r\n\
DESCRIPTION:Share at \\\\\\\\nas\\\\docs\\nBring laptop\r\n\
LOCATION:Cafe\\, 2nd floor\r\n\
DTSTART;VALUE=DATE:20240301\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let result = from_ics(ics, &converter());
        assert!(result.success, "Errors: {:?}", result.errors);
        let event = &result.events[0];
        assert_eq!(event.title, "Lunch, then walk; maybe");
        assert_eq!(
            event.description.as_deref(),
            Some("Share at \\\\nas\\docs\nBring laptop")
        );
        assert_eq!(event.location.as_deref(), Some("Cafe, 2nd floor"));
    }

    #[test]
    fn test_floating_and_unknown_zone_keep_wall_clock() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Floating\r\n\
DTSTART:20240105T083000\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
SUMMARY:Custom zone\r\n\
DTSTART;TZID=Company/Headquarters:20240106T140000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let result = from_ics(ics, &converter());
        assert!(result.success, "Errors: {:?}", result.errors);
        for (event, expected) in result.events.iter().zip([(5, 8, 30), (6, 14, 0)]) {
            let (day, hour, minute) = expected;
            assert_eq!(event.date, NaiveDate::from_ymd_opt(2024, 1, day).unwrap());
            assert_eq!(event.time, TimeOfDay::new(hour, minute));
            assert_eq!(event.timezone, EventTimezone::Local);
        }
    }

    #[test]
    fn test_not_a_calendar_fails_wholesale() {
        let result = from_ics("not a calendar", &converter());
        assert!(!result.success);
        assert_eq!(result.errors, vec![INVALID_ICS]);
        assert_eq!(result.events_added, 0);
    }

    #[test]
    fn test_parse_trigger_minutes() {
        assert_eq!(parse_trigger_minutes("-PT15M"), Some(15));
        assert_eq!(parse_trigger_minutes("-PT1H"), Some(60));
        assert_eq!(parse_trigger_minutes("PT15M"), None);
    }
}
