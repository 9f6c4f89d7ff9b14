/// Upper bound on the occurrences a single recurring event may expand into.
pub const MAX_OCCURRENCES: usize = 10_000;

/// IANA zone backing the `JST` event timezone.
pub const JST_ZONE: chrono_tz::Tz = chrono_tz::Asia::Tokyo;

/// Version stamped into JSON exports.
pub const EXPORT_VERSION: &str = "1.0";

pub const ICS_PRODID: &str = "-//Daybook//EN";

pub const CSV_HEADERS: [&str; 7] = [
    "Title",
    "Date",
    "Time",
    "Location",
    "Description",
    "Category",
    "Timezone",
];

/// Color used for the fallback and imported categories.
pub const DEFAULT_CATEGORY_COLOR: &str = "#6B7280";

pub const UNCATEGORIZED_ID: &str = "uncategorized";
pub const IMPORTED_CATEGORY_ID: &str = "imported";
