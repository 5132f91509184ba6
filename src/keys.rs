//! Well-known persisted keys.
//!
//! The key-value store holds a small, fixed set of logical keys. Keeping the
//! names in one place lets the eviction policy, the export path, and the
//! cross-tab listener agree on what exists.

/// Ordered sequence of [`Website`](crate::model::Website) entries.
pub const WEBSITES: &str = "websites";

/// Mapping from site id to [`VisitHistoryEntry`](crate::model::VisitHistoryEntry).
pub const VISIT_HISTORY: &str = "visitHistory";

/// Ordered sequence of [`Note`](crate::model::Note) entries.
pub const QUICK_NOTES: &str = "quick-notes";

/// Cached [`WeatherSnapshot`](crate::model::WeatherSnapshot).
pub const WEATHER_DATA: &str = "weather-data";

/// Last weather location string.
pub const WEATHER_LOCATION: &str = "weather-location";

/// Wallpaper value: a URL, inline image data, or a blob sentinel reference.
pub const WALLPAPER: &str = "wallpaper";

/// Wallpaper overlay opacity (0.0 - 1.0).
pub const WALLPAPER_OPACITY: &str = "wallpaperOpacity";

/// Clock format preference ("12h" or "24h").
pub const CLOCK_FORMAT: &str = "clockFormat";

/// Primary/secondary theme colors.
pub const THEME_COLORS: &str = "themeColors";

/// Which page sections are shown.
pub const SECTION_VISIBILITY: &str = "sectionVisibility";

/// Keys sacrificed, in order, when the backend reports a full quota.
///
/// This is a static priority list, not an LRU: the key set is small and
/// known, and these three hold the bulkiest, most re-creatable data. The
/// write path skips whichever entry matches the key it is trying to save.
pub const EVICTION_PRIORITY: &[&str] = &[WALLPAPER, VISIT_HISTORY, QUICK_NOTES];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eviction_list_never_contains_primary_state() {
        assert!(!EVICTION_PRIORITY.contains(&WEBSITES));
        assert!(!EVICTION_PRIORITY.contains(&SECTION_VISIBILITY));
    }

    #[test]
    fn eviction_list_order_is_wallpaper_first() {
        assert_eq!(EVICTION_PRIORITY[0], WALLPAPER);
    }
}
