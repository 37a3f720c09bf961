//! Input validation for events, todos and profiles

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{CalendarEvent, NewEvent, NewTodo, TodoInput};
use crate::{Error, Result};

pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_DESCRIPTION_LENGTH: usize = 65_535;
pub const MAX_EMOJI_LENGTH: usize = 10;
pub const MAX_NICKNAME_LENGTH: usize = 50;
pub const DEFAULT_MAX_TODO_LENGTH: usize = 255;

/// Length limits applied to user input (in characters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub max_title_length: usize,
    pub max_description_length: usize,
    pub max_emoji_length: usize,
    pub max_todo_length: usize,
    pub max_nickname_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_title_length: MAX_TITLE_LENGTH,
            max_description_length: MAX_DESCRIPTION_LENGTH,
            max_emoji_length: MAX_EMOJI_LENGTH,
            max_todo_length: DEFAULT_MAX_TODO_LENGTH,
            max_nickname_length: MAX_NICKNAME_LENGTH,
        }
    }
}

impl Limits {
    pub fn with_max_todo_length(mut self, max: usize) -> Self {
        self.max_todo_length = max;
        self
    }

    /// Check a new event draft; empty todos must already be filtered out
    pub fn check_new_event(&self, draft: &NewEvent) -> Result<()> {
        self.check_fields(&draft.title, &draft.description, &draft.emoji, draft.start_at, draft.end_at)?;
        for todo in &draft.todos {
            self.check_todo_content(&todo.content)?;
        }
        Ok(())
    }

    /// Re-check an event after a patch was applied
    pub fn check_event(&self, event: &CalendarEvent) -> Result<()> {
        self.check_fields(&event.title, &event.description, &event.emoji, event.start_at, event.end_at)
    }

    pub fn check_todo_inputs(&self, todos: &[TodoInput]) -> Result<()> {
        for todo in todos {
            self.check_todo_content(&todo.content)?;
        }
        Ok(())
    }

    pub fn check_nickname(&self, nickname: &str) -> Result<()> {
        let len = nickname.trim().chars().count();
        if len == 0 {
            return Err(Error::validation("nickname is required"));
        }
        if nickname.chars().count() > self.max_nickname_length {
            return Err(Error::validation(format!(
                "nickname must be at most {} characters",
                self.max_nickname_length
            )));
        }
        Ok(())
    }

    fn check_fields(
        &self,
        title: &str,
        description: &str,
        emoji: &str,
        start_at: NaiveDate,
        end_at: NaiveDate,
    ) -> Result<()> {
        if title.trim().is_empty() {
            return Err(Error::validation("title is required"));
        }
        check_len("title", title, self.max_title_length)?;
        check_len("description", description, self.max_description_length)?;
        check_len("emoji", emoji, self.max_emoji_length)?;
        if end_at < start_at {
            return Err(Error::validation("end_at must not be before start_at"));
        }
        Ok(())
    }

    fn check_todo_content(&self, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(Error::validation("todo content is required"));
        }
        check_len("todo content", content.trim(), self.max_todo_length)
    }
}

fn check_len(field: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::validation(format!("{} must be at most {} characters", field, max)));
    }
    Ok(())
}

/// Whether a todo would be silently dropped
pub fn is_blank(content: &str) -> bool {
    content.trim().is_empty()
}

/// Drop blank todos and trim the content of the rest
pub fn drop_blank_new_todos(todos: Vec<NewTodo>) -> Vec<NewTodo> {
    todos
        .into_iter()
        .filter(|t| !is_blank(&t.content))
        .map(|t| NewTodo {
            content: t.content.trim().to_string(),
            ..t
        })
        .collect()
}

/// Drop blank todos and trim the content of the rest
pub fn drop_blank_todo_inputs(todos: Vec<TodoInput>) -> Vec<TodoInput> {
    todos
        .into_iter()
        .filter(|t| !is_blank(&t.content))
        .map(|t| TodoInput {
            content: t.content.trim().to_string(),
            ..t
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Visibility;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_same_day_event_accepted() {
        let draft = NewEvent::new("Lunch", day(10), day(10), Visibility::Public);
        assert!(Limits::default().check_new_event(&draft).is_ok());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let draft = NewEvent::new("Lunch", day(10), day(9), Visibility::Public);
        let err = Limits::default().check_new_event(&draft).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_title_bounds() {
        let limits = Limits::default();
        let blank = NewEvent::new("   ", day(1), day(1), Visibility::Public);
        assert!(limits.check_new_event(&blank).is_err());

        let long = NewEvent::new("a".repeat(256), day(1), day(1), Visibility::Public);
        assert!(limits.check_new_event(&long).is_err());

        let max = NewEvent::new("가".repeat(255), day(1), day(1), Visibility::Public);
        assert!(limits.check_new_event(&max).is_ok());
    }

    #[test]
    fn test_emoji_limit() {
        let mut draft = NewEvent::new("Party", day(1), day(1), Visibility::Friends);
        draft.emoji = "🎉".repeat(11);
        assert!(Limits::default().check_new_event(&draft).is_err());
    }

    #[test]
    fn test_configured_todo_length() {
        let limits = Limits::default().with_max_todo_length(5);
        let draft = NewEvent::new("Run", day(1), day(1), Visibility::Public)
            .with_todos(vec![NewTodo::new("123456")]);
        assert!(limits.check_new_event(&draft).is_err());

        let draft = NewEvent::new("Run", day(1), day(1), Visibility::Public)
            .with_todos(vec![NewTodo::new("  12345  ")]);
        assert!(limits.check_new_event(&draft).is_ok());
    }

    #[test]
    fn test_blank_todos_dropped() {
        let kept = drop_blank_new_todos(vec![NewTodo::new("a"), NewTodo::new("  "), NewTodo::new("")]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_kept_todos_are_trimmed() {
        let padded = format!("{}{}", " ".repeat(100), "x".repeat(255));
        let kept = drop_blank_new_todos(vec![NewTodo::new(padded.clone())]);
        assert_eq!(kept[0].content.chars().count(), 255);

        let kept = drop_blank_todo_inputs(vec![TodoInput::new(format!("{}  ", padded))]);
        assert_eq!(kept[0].content, "x".repeat(255));
    }

    #[test]
    fn test_nickname() {
        let limits = Limits::default();
        assert!(limits.check_nickname("planet").is_ok());
        assert!(limits.check_nickname(" ").is_err());
        assert!(limits.check_nickname(&"n".repeat(51)).is_err());
    }
}
