use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Task identifier: a creation-time millisecond timestamp, bumped to stay unique
pub type TaskId = i64;

/// Task category. The six named values are the ones offered for selection;
/// anything else is carried verbatim as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Work,
    Personal,
    Shopping,
    Health,
    Academic,
    Other,
    Custom(String),
}

impl Category {
    /// The selectable categories, in menu order
    pub const KNOWN: [Category; 6] = [
        Category::Work,
        Category::Personal,
        Category::Shopping,
        Category::Health,
        Category::Academic,
        Category::Other,
    ];

    /// The stored string value
    pub fn as_str(&self) -> &str {
        match self {
            Category::Work => "work",
            Category::Personal => "personal",
            Category::Shopping => "shopping",
            Category::Health => "health",
            Category::Academic => "academic",
            Category::Other => "other",
            Category::Custom(s) => s,
        }
    }

    /// Human-facing label: title-cased for known values, verbatim otherwise
    pub fn display_name(&self) -> &str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Shopping => "Shopping",
            Category::Health => "Health",
            Category::Academic => "Academic",
            Category::Other => "Other",
            Category::Custom(s) => s,
        }
    }

    /// Parse a stored value. Never fails; unknown values become `Custom`.
    pub fn parse_category(s: &str) -> Category {
        match s {
            "work" => Category::Work,
            "personal" => Category::Personal,
            "shopping" => Category::Shopping,
            "health" => Category::Health,
            "academic" => Category::Academic,
            "other" => Category::Other,
            _ => Category::Custom(s.to_string()),
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        match Category::parse_category(&s) {
            Category::Custom(_) => Category::Custom(s),
            known => known,
        }
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        match c {
            Category::Custom(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single to-do item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    /// Trimmed, non-empty; may span several lines
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    /// Absent only for imported records that never carried one
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_category")]
    pub category: Option<Category>,
    /// Display order key; ascending
    #[serde(default)]
    pub position: i64,
}

impl Task {
    /// Create a new incomplete task
    pub fn new(id: TaskId, text: String, created_at: DateTime<Utc>, position: i64) -> Self {
        Task {
            id,
            text,
            completed: false,
            created_at: Some(created_at),
            due_date: None,
            category: None,
            position,
        }
    }

    /// First line of the text, for single-line summaries
    pub fn headline(&self) -> &str {
        self.text.lines().next().unwrap_or("")
    }
}

/// `null`, a missing field, and `""` all decode as no due date.
fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid dueDate {:?}: {}", s, e))),
    }
}

/// `null`, a missing field, and `""` all decode as no category.
fn deserialize_category<'de, D>(deserializer: D) -> Result<Option<Category>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(Category::from))
}
