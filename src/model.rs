//! Persisted data models.
//!
//! These are the value shapes stored under the well-known keys in
//! [`keys`](crate::keys). Field names are camelCase on the wire so an
//! exported settings document matches the persisted layout byte for byte.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Epoch milliseconds for `lastVisited` / timestamp fields.
pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// A bookmarked site shown on the page grid.
///
/// Identity is the `id` field, stable across edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub theme_color: String,
    #[serde(default)]
    pub visit_count: u64,
    #[serde(default)]
    pub last_visited: i64,
}

impl Website {
    /// Create a site with a freshly generated id and zeroed visit stats.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.into(),
            url: url.into(),
            favicon: None,
            description: String::new(),
            theme_color: String::new(),
            visit_count: 0,
            last_visited: 0,
        }
    }
}

/// Per-site visit aggregate. Created on first visit, incremented after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitHistoryEntry {
    pub count: u64,
    pub last_visited: i64,
}

/// Site id -> visit aggregate. One KVS entry holds the whole mapping.
pub type VisitHistory = HashMap<String, VisitHistoryEntry>;

/// A quick note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Note {
    pub fn new(content: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            content: content.into(),
            created_at: now,
            updated_at: now,
            color: None,
        }
    }
}

/// Cached weather snapshot written by the (external) weather provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub location: String,
    pub temperature: f64,
    pub condition: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub wind_speed: f64,
    #[serde(default)]
    pub last_updated: i64,
}

/// Primary/secondary accent colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeColors {
    pub primary: String,
    pub secondary: String,
}

impl Default for ThemeColors {
    fn default() -> Self {
        Self {
            primary: "#3b82f6".into(),
            secondary: "#10b981".into(),
        }
    }
}

/// Which sections of the page are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionVisibility {
    pub your_websites: bool,
    pub frequently_visited: bool,
    pub recently_visited: bool,
    pub quick_notes: bool,
    pub weather: bool,
}

impl Default for SectionVisibility {
    fn default() -> Self {
        Self {
            your_websites: true,
            frequently_visited: true,
            recently_visited: true,
            quick_notes: true,
            weather: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn website_serializes_camel_case() {
        let site = Website::new("Example", "https://example.com");
        let json = serde_json::to_string(&site).unwrap();
        assert!(json.contains("visitCount"));
        assert!(json.contains("lastVisited"));
        assert!(json.contains("themeColor"));
        assert!(!json.contains("visit_count"));
    }

    #[test]
    fn website_ids_are_unique() {
        let a = Website::new("A", "https://a.example");
        let b = Website::new("A", "https://a.example");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn website_tolerates_missing_optional_fields() {
        let site: Website = serde_json::from_str(
            r#"{"id":"x","title":"X","url":"https://x.example"}"#,
        )
        .unwrap();
        assert_eq!(site.visit_count, 0);
        assert!(site.favicon.is_none());
    }

    #[test]
    fn note_skips_absent_color() {
        let note = Note::new("hi");
        let json = serde_json::to_string(&note).unwrap();
        assert!(!json.contains("color"));
    }

    #[test]
    fn visit_history_round_trips() {
        let mut history = VisitHistory::new();
        history.insert(
            "a".into(),
            VisitHistoryEntry {
                count: 3,
                last_visited: 1_700_000_000_000,
            },
        );
        let json = serde_json::to_string(&history).unwrap();
        let back: VisitHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(back["a"].count, 3);
    }

    #[test]
    fn section_visibility_defaults_all_on() {
        let vis = SectionVisibility::default();
        assert!(vis.your_websites && vis.weather && vis.quick_notes);
    }
}
