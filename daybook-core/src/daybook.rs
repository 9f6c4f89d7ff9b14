//! The top-level handle tying configuration, storage and the calendar
//! operations together.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::DaybookConfig;
use crate::error::{DaybookError, DaybookResult};
use crate::event::{self, Event, EventDraft, EventPatch};
use crate::export::{self, ExportFormat, ExportOptions};
use crate::import::{self, ImportResult};
use crate::occurrence::{self, Occurrence};
use crate::reminder::ReminderScheduler;
use crate::store::{self, EventStore, JsonFileStore};
use crate::timezone::TimeZoneConverter;

pub struct Daybook<S: EventStore = JsonFileStore> {
    config: DaybookConfig,
    store: S,
    converter: TimeZoneConverter,
}

impl Daybook<JsonFileStore> {
    /// Load the user's config and open the event file it points at.
    pub fn load() -> DaybookResult<Self> {
        let config = DaybookConfig::load()?;
        let store = JsonFileStore::new(config.events_path());
        Self::with_store(config, store)
    }
}

impl<S: EventStore> Daybook<S> {
    pub fn with_store(config: DaybookConfig, store: S) -> DaybookResult<Self> {
        let converter = config.converter()?;
        tracing::debug!(local_zone = %converter.local_zone(), "opened daybook");

        Ok(Daybook {
            config,
            store,
            converter,
        })
    }

    pub fn config(&self) -> &DaybookConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn converter(&self) -> &TimeZoneConverter {
        &self.converter
    }

    pub fn scheduler(&self) -> ReminderScheduler {
        ReminderScheduler::new(self.converter)
    }

    pub fn events(&self) -> DaybookResult<Vec<Event>> {
        self.store.load()
    }

    /// Create an event, filling in the configured default zone when the
    /// draft leaves it unset.
    pub fn add_event(&self, mut draft: EventDraft, now: DateTime<Utc>) -> DaybookResult<Event> {
        draft.timezone.get_or_insert(self.config.default_timezone);
        let event = Event::create(draft, now)?;

        let mut events = self.store.load()?;
        events.push(event.clone());
        self.store.save(&events)?;

        tracing::info!(event_id = %event.id, title = %event.title, "added event");
        Ok(event)
    }

    /// Returns false if no event has the given id. A patch that leaves the
    /// event invalid is rejected and nothing is saved.
    pub fn update_event(
        &self,
        event_id: &str,
        patch: EventPatch,
        now: DateTime<Utc>,
    ) -> DaybookResult<bool> {
        let mut events = self.store.load()?;
        if !event::update_event(&mut events, event_id, patch, now)? {
            return Ok(false);
        }
        self.store.save(&events)?;

        tracing::info!(event_id = %event_id, "updated event");
        Ok(true)
    }

    pub fn delete_event(&self, event_id: &str) -> DaybookResult<Option<Event>> {
        let mut events = self.store.load()?;
        let removed = event::delete_event(&mut events, event_id);
        if removed.is_some() {
            self.store.save(&events)?;
            tracing::info!(event_id = %event_id, "deleted event");
        }
        Ok(removed)
    }

    pub fn occurrences_on(&self, date: NaiveDate) -> DaybookResult<Vec<Occurrence>> {
        occurrence::occurrences_on(&self.store.load()?, date)
    }

    pub fn occurrences_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DaybookResult<Vec<Occurrence>> {
        occurrence::occurrences_between(&self.store.load()?, start, end)
    }

    /// Month grid starting on the configured first day of the week.
    pub fn month_grid(&self, month: NaiveDate) -> Vec<NaiveDate> {
        occurrence::month_grid_with(month, self.config.week_start.weekday())
    }

    pub fn week_days(&self, date: NaiveDate) -> Vec<NaiveDate> {
        occurrence::week_days(date, self.config.week_start.weekday())
    }

    pub fn export(&self, options: &ExportOptions, now: DateTime<Utc>) -> DaybookResult<String> {
        export::export(&self.store.load()?, options, now)
    }

    /// Parse a document and merge the accepted events into the store.
    pub fn import(&self, text: &str, format: ExportFormat) -> DaybookResult<ImportResult> {
        let result = import::import(text, format, &self.converter);
        if result.events.is_empty() {
            return Ok(result);
        }

        let mut events = self.store.load()?;
        let appended = store::merge_events(&mut events, result.events.clone());
        self.store.save(&events)?;

        tracing::debug!(
            appended,
            replaced = result.events.len() - appended,
            "merged imported events"
        );
        Ok(result)
    }

    /// Import a file, picking the format from its extension.
    pub fn import_file(&self, path: &Path) -> DaybookResult<ImportResult> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let format = ExportFormat::from_extension(ext).ok_or_else(|| {
            DaybookError::ImportParse(format!("Unsupported file type '{}'", path.display()))
        })?;

        let text = std::fs::read_to_string(path)?;
        self.import(&text, format)
    }
}
