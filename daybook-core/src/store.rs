//! Where events live between runs.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{DaybookError, DaybookResult};
use crate::event::Event;

/// Persistence seam for the event list.
///
/// Callers load everything, mutate in memory, and save the whole list back.
pub trait EventStore: Send + Sync {
    fn load(&self) -> DaybookResult<Vec<Event>>;

    fn save(&self, events: &[Event]) -> DaybookResult<()>;
}

/// Events stored as a pretty-printed JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventStore for JsonFileStore {
    fn load(&self) -> DaybookResult<Vec<Event>> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no event file yet");
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let events: Vec<Event> = serde_json::from_str(&content).map_err(|e| {
            DaybookError::Serialization(format!("{}: {}", self.path.display(), e))
        })?;

        tracing::debug!(path = %self.path.display(), count = events.len(), "loaded events");
        Ok(events)
    }

    fn save(&self, events: &[Event]) -> DaybookResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(events)
            .map_err(|e| DaybookError::Serialization(e.to_string()))?;
        // Write then rename so a crash never leaves a half-written file
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &self.path)?;

        tracing::debug!(path = %self.path.display(), count = events.len(), "saved events");
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    events: Mutex<Vec<Event>>,
}

impl InMemoryStore {
    pub fn new(events: Vec<Event>) -> Self {
        InMemoryStore {
            events: Mutex::new(events),
        }
    }
}

impl EventStore for InMemoryStore {
    fn load(&self) -> DaybookResult<Vec<Event>> {
        Ok(self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, events: &[Event]) -> DaybookResult<()> {
        *self.events.lock().unwrap_or_else(PoisonError::into_inner) = events.to_vec();
        Ok(())
    }
}

/// Merge imported events into `existing`. An imported event replaces the
/// stored one with the same id, otherwise it is appended. Returns how many
/// were appended.
pub fn merge_events(existing: &mut Vec<Event>, imported: Vec<Event>) -> usize {
    let mut appended = 0;
    for event in imported {
        match existing.iter_mut().find(|e| e.id == event.id) {
            Some(slot) => *slot = event,
            None => {
                existing.push(event);
                appended += 1;
            }
        }
    }
    appended
}
