//! Item type: a course or lesson node in the prerequisite graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What kind of learning item a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Course,
    Lesson,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Course => "course",
            ItemKind::Lesson => "lesson",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "course" => Ok(ItemKind::Course),
            "lesson" | "module_content" | "module-content" => Ok(ItemKind::Lesson),
            other => Err(format!("unknown item kind `{other}` (expected course or lesson)")),
        }
    }
}

/// A course or lesson.
///
/// `id` is the stable identity. `title` may be changed by the authoring side
/// without touching any prerequisite edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub kind: ItemKind,

    #[serde(default = "default_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_timestamp")]
    pub updated_at: DateTime<Utc>,
}

fn default_timestamp() -> DateTime<Utc> {
    Utc::now()
}

impl Item {
    pub fn new(id: impl Into<String>, title: impl Into<String>, kind: ItemKind) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            kind,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn course(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(id, title, ItemKind::Course)
    }

    pub fn lesson(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(id, title, ItemKind::Lesson)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch_updated_at();
    }

    pub fn touch_updated_at(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Display form of an item reference.
///
/// `title` and `kind` are absent when the referenced ID is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ItemKind>,
}

impl ItemSummary {
    pub fn unresolved(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            kind: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.title.is_some()
    }
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            title: Some(item.title.clone()),
            kind: Some(item.kind),
        }
    }
}
