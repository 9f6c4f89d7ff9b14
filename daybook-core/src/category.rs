//! Event categories and their display fallback.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CATEGORY_COLOR, UNCATEGORIZED_ID};
use crate::error::{DaybookError, DaybookResult};

/// Preset colors offered for events and categories.
pub const EVENT_COLORS: [(&str, &str); 8] = [
    ("Blue", "#3B82F6"),
    ("Green", "#10B981"),
    ("Purple", "#8B5CF6"),
    ("Red", "#EF4444"),
    ("Yellow", "#F59E0B"),
    ("Pink", "#EC4899"),
    ("Indigo", "#6366F1"),
    ("Gray", "#6B7280"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCategory {
    pub id: String,
    pub name: String,
    /// Hex color, e.g. `#3B82F6`
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

impl EventCategory {
    pub fn new(name: &str, color: &str, icon: Option<String>) -> DaybookResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DaybookError::InvalidEvent(
                "category name must not be empty".into(),
            ));
        }

        Ok(EventCategory {
            id: format!("category-{}", uuid::Uuid::new_v4()),
            name: name.to_string(),
            color: color.to_string(),
            icon,
        })
    }

    /// Display category for events whose category can't be resolved.
    pub fn uncategorized() -> Self {
        EventCategory {
            id: UNCATEGORIZED_ID.to_string(),
            name: "Uncategorized".to_string(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            icon: None,
        }
    }
}

/// How an event refers to its category: the full record, or only its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Category(EventCategory),
    Id(String),
}

impl CategoryRef {
    pub fn id(&self) -> &str {
        match self {
            CategoryRef::Category(c) => &c.id,
            CategoryRef::Id(id) => id,
        }
    }

    /// The category name if the full record is embedded.
    pub fn name(&self) -> Option<&str> {
        match self {
            CategoryRef::Category(c) => Some(&c.name),
            CategoryRef::Id(_) => None,
        }
    }
}

impl Default for CategoryRef {
    fn default() -> Self {
        CategoryRef::Id(UNCATEGORIZED_ID.to_string())
    }
}

impl From<EventCategory> for CategoryRef {
    fn from(category: EventCategory) -> Self {
        CategoryRef::Category(category)
    }
}

/// Resolves category references against the current category set.
///
/// Built once where events leave storage, so views never repeat the lookup
/// or the fallback logic. Deleted categories resolve to
/// [`EventCategory::uncategorized`].
#[derive(Debug, Clone)]
pub struct CategoryResolver {
    categories: HashMap<String, EventCategory>,
    fallback: EventCategory,
}

impl CategoryResolver {
    pub fn new<I>(categories: I) -> Self
    where
        I: IntoIterator<Item = EventCategory>,
    {
        CategoryResolver {
            categories: categories.into_iter().map(|c| (c.id.clone(), c)).collect(),
            fallback: EventCategory::uncategorized(),
        }
    }

    pub fn with_fallback(mut self, fallback: EventCategory) -> Self {
        self.fallback = fallback;
        self
    }

    /// Known categories win over embedded copies, so renames show up on
    /// events that still carry an old snapshot.
    pub fn resolve(&self, category: &CategoryRef) -> EventCategory {
        if let Some(known) = self.categories.get(category.id()) {
            return known.clone();
        }

        match category {
            CategoryRef::Category(embedded) => embedded.clone(),
            CategoryRef::Id(id) => {
                tracing::debug!(category_id = %id, "unresolved category, using fallback");
                self.fallback.clone()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&EventCategory> {
        self.categories.get(id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work() -> EventCategory {
        EventCategory {
            id: "work".into(),
            name: "Work".into(),
            color: "#3B82F6".into(),
            icon: Some("💼".into()),
        }
    }

    #[test]
    fn test_resolve_known_id() {
        let resolver = CategoryResolver::new([work()]);
        let resolved = resolver.resolve(&CategoryRef::Id("work".into()));
        assert_eq!(resolved, work());
    }

    #[test]
    fn test_resolve_deleted_id_falls_back_to_uncategorized() {
        let resolver = CategoryResolver::new([work()]);
        let resolved = resolver.resolve(&CategoryRef::Id("deleted".into()));
        assert_eq!(resolved.id, UNCATEGORIZED_ID);
        assert_eq!(resolved.color, DEFAULT_CATEGORY_COLOR);
    }

    #[test]
    fn test_resolve_prefers_current_record_over_embedded_snapshot() {
        let mut stale = work();
        stale.name = "Old name".into();
        let resolver = CategoryResolver::new([work()]);

        assert_eq!(resolver.resolve(&stale.into()).name, "Work");
    }

    #[test]
    fn test_resolve_embedded_unknown_category_is_kept() {
        let resolver = CategoryResolver::new([]);
        let embedded = EventCategory {
            id: "imported".into(),
            name: "Imported".into(),
            color: DEFAULT_CATEGORY_COLOR.into(),
            icon: None,
        };
        assert_eq!(resolver.resolve(&embedded.clone().into()), embedded);
    }

    #[test]
    fn test_category_ref_deserializes_object_or_id() {
        let full: CategoryRef =
            serde_json::from_str(r##"{"id":"work","name":"Work","color":"#3B82F6"}"##).unwrap();
        assert_eq!(full.id(), "work");
        assert_eq!(full.name(), Some("Work"));

        let bare: CategoryRef = serde_json::from_str(r#""work""#).unwrap();
        assert_eq!(bare, CategoryRef::Id("work".into()));
        assert_eq!(bare.name(), None);
    }

    #[test]
    fn test_new_category_trims_and_rejects_empty_name() {
        let category = EventCategory::new("  Family ", EVENT_COLORS[1].1, None).unwrap();
        assert_eq!(category.name, "Family");
        assert!(category.id.starts_with("category-"));
        assert!(EventCategory::new("  ", EVENT_COLORS[0].1, None).is_err());
    }
}
