//! Domain models for calendar events, todos and profiles

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Who may see an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Friends,
    Private,
}

impl Visibility {
    /// Every level, in the order the resolver widens access
    pub const ALL: [Visibility; 3] = [Visibility::Public, Visibility::Friends, Visibility::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Friends => "friends",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Self::Public),
            "friends" => Ok(Self::Friends),
            "private" => Ok(Self::Private),
            other => Err(Error::validation(format!("unknown visibility: {}", other))),
        }
    }
}

/// Calendar event owned by a single user
///
/// `todos` is `None` when the event was loaded in the events-only shape
/// (month view, cache), and `Some` when its todos were hydrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub emoji: String,
    pub start_at: NaiveDate,
    pub end_at: NaiveDate,
    pub visibility: Visibility,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub todos: Option<Vec<Todo>>,
}

impl CalendarEvent {
    /// Todos of a hydrated event, empty for the events-only shape
    pub fn todos(&self) -> &[Todo] {
        self.todos.as_deref().unwrap_or_default()
    }
}

/// Todo item attached to a calendar event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: Uuid,
    pub calendar_event_id: Uuid,
    pub content: String,
    pub is_done: bool,
    pub due_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Todo supplied when creating an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTodo {
    pub content: String,
    #[serde(default)]
    pub is_done: bool,
    #[serde(default)]
    pub due_time: Option<DateTime<Utc>>,
}

impl NewTodo {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_done: false,
            due_time: None,
        }
    }
}

/// Event draft submitted by its future owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub emoji: String,
    pub start_at: NaiveDate,
    pub end_at: NaiveDate,
    pub visibility: Visibility,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub todos: Vec<NewTodo>,
}

impl NewEvent {
    pub fn new(title: impl Into<String>, start_at: NaiveDate, end_at: NaiveDate, visibility: Visibility) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            emoji: String::new(),
            start_at,
            end_at,
            visibility,
            image_url: None,
            todos: Vec::new(),
        }
    }

    pub fn with_todos(mut self, todos: Vec<NewTodo>) -> Self {
        self.todos = todos;
        self
    }
}

/// Entry of a full-replacement todo list
///
/// An entry without `id` becomes a new todo; an entry with `id` rewrites the
/// existing todo; existing todos missing from the list are deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub content: String,
    #[serde(default)]
    pub is_done: bool,
    #[serde(default)]
    pub due_time: Option<DateTime<Utc>>,
}

impl TodoInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            id: None,
            content: content.into(),
            is_done: false,
            due_time: None,
        }
    }

    pub fn existing(id: Uuid, content: impl Into<String>, is_done: bool) -> Self {
        Self {
            id: Some(id),
            content: content.into(),
            is_done,
            due_time: None,
        }
    }
}

impl From<&Todo> for TodoInput {
    fn from(todo: &Todo) -> Self {
        Self {
            id: Some(todo.id),
            content: todo.content.clone(),
            is_done: todo.is_done,
            due_time: todo.due_time,
        }
    }
}

/// Partial update of an event
///
/// Absent fields are left unchanged. `image_url` distinguishes absent
/// (`None`) from an explicit clear (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub start_at: Option<NaiveDate>,
    #[serde(default)]
    pub end_at: Option<NaiveDate>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub image_url: Option<Option<String>>,
    #[serde(default)]
    pub todos: Option<Vec<TodoInput>>,
}

impl EventPatch {
    /// Overwrite the scalar fields of `event` that are present in the patch
    pub fn apply_to(&self, event: &mut CalendarEvent) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(description) = &self.description {
            event.description = description.clone();
        }
        if let Some(emoji) = &self.emoji {
            event.emoji = emoji.clone();
        }
        if let Some(start_at) = self.start_at {
            event.start_at = start_at;
        }
        if let Some(end_at) = self.end_at {
            event.end_at = end_at;
        }
        if let Some(visibility) = self.visibility {
            event.visibility = visibility;
        }
        if let Some(image_url) = &self.image_url {
            event.image_url = image_url.clone();
        }
    }
}

/// User profile, consumed for nickname resolution and ownership
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub nickname: String,
    pub bio: String,
    pub profile_image: String,
    pub theme: String,
    pub follower_count: i64,
    pub following_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile seeded at sign-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub nickname: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
}

/// Month view payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthView {
    pub events: Vec<CalendarEvent>,
    #[serde(rename = "monthData")]
    pub month_data: [[u32; 7]; 6],
}

/// Day view payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView {
    #[serde(rename = "dailyPlans")]
    pub daily_plans: Vec<CalendarEvent>,
    #[serde(rename = "completionData")]
    pub completion_data: BTreeMap<u32, u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(todos: Option<Vec<Todo>>) -> CalendarEvent {
        let now = Utc::now();
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        CalendarEvent {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Gym".to_string(),
            description: String::new(),
            emoji: String::new(),
            start_at: day,
            end_at: day,
            visibility: Visibility::Public,
            image_url: Some("https://img.example/a.png".to_string()),
            created_at: now,
            updated_at: now,
            todos,
        }
    }

    fn todo(event_id: Uuid, done: bool) -> Todo {
        let now = Utc::now();
        Todo {
            id: Uuid::new_v4(),
            calendar_event_id: event_id,
            content: "stretch".to_string(),
            is_done: done,
            due_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_todos_accessor() {
        let mut ev = event(None);
        assert!(ev.todos().is_empty());

        let id = ev.id;
        ev.todos = Some(vec![todo(id, true), todo(id, false)]);
        assert_eq!(ev.todos().len(), 2);
    }

    #[test]
    fn test_visibility_parse() {
        assert_eq!("friends".parse::<Visibility>().unwrap(), Visibility::Friends);
        assert!("everyone".parse::<Visibility>().is_err());
        assert_eq!(Visibility::Private.to_string(), "private");
    }

    #[test]
    fn test_patch_keeps_absent_fields() {
        let mut ev = event(None);
        let patch = EventPatch {
            title: Some("Swim".to_string()),
            ..Default::default()
        };
        patch.apply_to(&mut ev);
        assert_eq!(ev.title, "Swim");
        assert_eq!(ev.image_url.as_deref(), Some("https://img.example/a.png"));
    }

    #[test]
    fn test_patch_image_url_absent_vs_null() {
        let absent: EventPatch = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(absent.image_url, None);

        let cleared: EventPatch = serde_json::from_str(r#"{"image_url":null}"#).unwrap();
        assert_eq!(cleared.image_url, Some(None));

        let mut ev = event(None);
        cleared.apply_to(&mut ev);
        assert!(ev.image_url.is_none());
    }

    #[test]
    fn test_events_only_shape_omits_todos() {
        let json = serde_json::to_value(event(None)).unwrap();
        assert!(json.get("todos").is_none());
        assert_eq!(json["visibility"], "public");
        assert_eq!(json["start_at"], "2025-03-10");
    }
}
