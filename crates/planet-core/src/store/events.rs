//! Calendar event persistence
//!
//! Events own their todos. Every write that touches both runs in one
//! transaction.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use uuid::Uuid;

use super::todos::{insert_todo, load_event_todos, load_todos_by_event};
use super::{Database, date_col, date_text, timestamp_col, timestamp_text, uuid_col};
use crate::models::{CalendarEvent, NewEvent, Todo, TodoInput, Visibility};
use crate::validation::is_blank;
use crate::{Error, Result};

const EVENT_COLUMNS: &str =
    "id, user_id, title, description, emoji, start_at, end_at, visibility, image_url, created_at, updated_at";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<CalendarEvent> {
    let visibility: String = row.get(7)?;
    let visibility = match visibility.as_str() {
        "public" => Visibility::Public,
        "friends" => Visibility::Friends,
        "private" => Visibility::Private,
        other => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                7,
                rusqlite::types::Type::Text,
                format!("unknown visibility: {}", other).into(),
            ));
        }
    };

    Ok(CalendarEvent {
        id: uuid_col(row, 0)?,
        user_id: uuid_col(row, 1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        emoji: row.get(4)?,
        start_at: date_col(row, 5)?,
        end_at: date_col(row, 6)?,
        visibility,
        image_url: row.get(8)?,
        created_at: timestamp_col(row, 9)?,
        updated_at: timestamp_col(row, 10)?,
        todos: None,
    })
}

/// Events of `owner` overlapping `[start, end)` with one of the given visibilities
fn query_range(
    conn: &Connection,
    owner: Uuid,
    visibilities: &[Visibility],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<CalendarEvent>> {
    let placeholders = (4..4 + visibilities.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM calendar_events
         WHERE user_id = ?1 AND start_at < ?2 AND end_at >= ?3 AND visibility IN ({})
         ORDER BY start_at ASC, created_at ASC, rowid ASC",
        EVENT_COLUMNS, placeholders
    );

    let mut values = vec![owner.to_string(), date_text(end), date_text(start)];
    values.extend(visibilities.iter().map(|v| v.as_str().to_string()));

    let mut stmt = conn.prepare(&sql)?;
    let events = stmt
        .query_map(params_from_iter(values), event_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(events)
}

fn find_event(conn: &Connection, event_id: Uuid) -> Result<Option<CalendarEvent>> {
    let event = conn
        .query_row(
            &format!("SELECT {} FROM calendar_events WHERE id = ?1", EVENT_COLUMNS),
            params![event_id.to_string()],
            event_from_row,
        )
        .optional()?;
    Ok(event)
}

fn insert_event(conn: &Connection, event: &CalendarEvent) -> Result<()> {
    conn.execute(
        "INSERT INTO calendar_events
            (id, user_id, title, description, emoji, start_at, end_at, visibility, image_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            event.id.to_string(),
            event.user_id.to_string(),
            event.title,
            event.description,
            event.emoji,
            date_text(event.start_at),
            date_text(event.end_at),
            event.visibility.as_str(),
            event.image_url,
            timestamp_text(event.created_at),
            timestamp_text(event.updated_at),
        ],
    )?;
    Ok(())
}

/// Rewrite the scalar fields of a stored event; returns false when no row
/// with that id and owner exists any more
fn update_event_row(conn: &Connection, event: &CalendarEvent) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE calendar_events SET
            title = ?1, description = ?2, emoji = ?3, start_at = ?4, end_at = ?5,
            visibility = ?6, image_url = ?7, updated_at = ?8
         WHERE id = ?9 AND user_id = ?10",
        params![
            event.title,
            event.description,
            event.emoji,
            date_text(event.start_at),
            date_text(event.end_at),
            event.visibility.as_str(),
            event.image_url,
            timestamp_text(event.updated_at),
            event.id.to_string(),
            event.user_id.to_string(),
        ],
    )?;
    Ok(changed > 0)
}

/// Apply a full-replacement todo list to the stored todos of `event_id`
fn reconcile_todos(conn: &Connection, event_id: Uuid, inputs: &[TodoInput], now: DateTime<Utc>) -> Result<()> {
    let existing: HashSet<Uuid> = load_event_todos(conn, event_id)?.into_iter().map(|t| t.id).collect();
    let mut kept = HashSet::new();

    for input in inputs.iter().filter(|t| !is_blank(&t.content)) {
        match input.id {
            None => {
                let todo = Todo {
                    id: Uuid::new_v4(),
                    calendar_event_id: event_id,
                    content: input.content.trim().to_string(),
                    is_done: input.is_done,
                    due_time: input.due_time,
                    created_at: now,
                    updated_at: now,
                };
                insert_todo(conn, &todo)?;
            }
            Some(id) if existing.contains(&id) => {
                conn.execute(
                    "UPDATE todos SET content = ?1, is_done = ?2, due_time = ?3, updated_at = ?4
                     WHERE id = ?5 AND calendar_event_id = ?6",
                    params![
                        input.content.trim(),
                        input.is_done,
                        input.due_time.map(timestamp_text),
                        timestamp_text(now),
                        id.to_string(),
                        event_id.to_string(),
                    ],
                )?;
                kept.insert(id);
            }
            Some(id) => {
                return Err(Error::validation(format!("todo {} does not belong to this event", id)));
            }
        }
    }

    for stale in existing.difference(&kept) {
        conn.execute(
            "DELETE FROM todos WHERE id = ?1 AND calendar_event_id = ?2",
            params![stale.to_string(), event_id.to_string()],
        )?;
    }

    Ok(())
}

/// Store for calendar events and their todos
#[derive(Clone)]
pub struct EventStore {
    db: Database,
}

impl EventStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new event for `owner` together with its non-blank todos
    pub async fn create(&self, owner: Uuid, draft: NewEvent, now: DateTime<Utc>) -> Result<CalendarEvent> {
        self.db
            .call(move |conn| {
                let now = now.trunc_subsecs(6);
                let event_id = Uuid::new_v4();
                let todos: Vec<Todo> = draft
                    .todos
                    .into_iter()
                    .filter(|t| !is_blank(&t.content))
                    .map(|t| Todo {
                        id: Uuid::new_v4(),
                        calendar_event_id: event_id,
                        content: t.content.trim().to_string(),
                        is_done: t.is_done,
                        due_time: t.due_time,
                        created_at: now,
                        updated_at: now,
                    })
                    .collect();

                let event = CalendarEvent {
                    id: event_id,
                    user_id: owner,
                    title: draft.title,
                    description: draft.description,
                    emoji: draft.emoji,
                    start_at: draft.start_at,
                    end_at: draft.end_at,
                    visibility: draft.visibility,
                    image_url: draft.image_url,
                    created_at: now,
                    updated_at: now,
                    todos: Some(todos),
                };

                let tx = conn.transaction()?;
                insert_event(&tx, &event)?;
                for todo in event.todos() {
                    insert_todo(&tx, todo)?;
                }
                tx.commit()?;

                Ok(event)
            })
            .await
    }

    /// Events without todos overlapping `[start, end)`
    pub async fn get_events_in_range(
        &self,
        owner: Uuid,
        visibilities: &[Visibility],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CalendarEvent>> {
        if visibilities.is_empty() {
            return Ok(Vec::new());
        }
        let visibilities = visibilities.to_vec();
        self.db
            .call(move |conn| query_range(conn, owner, &visibilities, start, end))
            .await
    }

    /// Events overlapping `[start, end)` with their todos hydrated
    pub async fn get_events_with_todos_in_range(
        &self,
        owner: Uuid,
        visibilities: &[Visibility],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<CalendarEvent>> {
        if visibilities.is_empty() {
            return Ok(Vec::new());
        }
        let visibilities = visibilities.to_vec();
        self.db
            .call(move |conn| {
                let mut events = query_range(conn, owner, &visibilities, start, end)?;
                let ids: Vec<Uuid> = events.iter().map(|e| e.id).collect();
                let mut todos: HashMap<Uuid, Vec<Todo>> = load_todos_by_event(conn, &ids)?;
                for event in &mut events {
                    event.todos = Some(todos.remove(&event.id).unwrap_or_default());
                }
                Ok(events)
            })
            .await
    }

    /// Load one event with its todos
    pub async fn get_event_with_todos(&self, event_id: Uuid) -> Result<CalendarEvent> {
        self.db
            .call(move |conn| {
                let mut event =
                    find_event(conn, event_id)?.ok_or_else(|| Error::not_found(format!("event {}", event_id)))?;
                event.todos = Some(load_event_todos(conn, event_id)?);
                Ok(event)
            })
            .await
    }

    /// Write back the scalar fields of `event` and, when given, reconcile its todos
    ///
    /// Fails with `NotFound` if the event was deleted, or changed owner, since
    /// it was loaded; nothing is written in that case.
    ///
    /// `todos` is the complete post-state: entries without an id are inserted,
    /// entries with a known id are rewritten and stored todos missing from the
    /// list are deleted. `None` leaves the todos untouched.
    pub async fn update(
        &self,
        mut event: CalendarEvent,
        todos: Option<Vec<TodoInput>>,
        now: DateTime<Utc>,
    ) -> Result<CalendarEvent> {
        self.db
            .call(move |conn| {
                let now = now.trunc_subsecs(6);
                event.updated_at = now;

                let tx = conn.transaction()?;
                if !update_event_row(&tx, &event)? {
                    return Err(Error::not_found(format!("event {}", event.id)));
                }
                if let Some(inputs) = &todos {
                    reconcile_todos(&tx, event.id, inputs, now)?;
                }
                event.todos = Some(load_event_todos(&tx, event.id)?);
                tx.commit()?;

                Ok(event)
            })
            .await
    }

    /// Delete an event and its todos; deleting a missing event succeeds
    pub async fn delete(&self, event_id: Uuid) -> Result<()> {
        self.db
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM todos WHERE calendar_event_id = ?1",
                    params![event_id.to_string()],
                )?;
                let removed = tx.execute("DELETE FROM calendar_events WHERE id = ?1", params![event_id.to_string()])?;
                tx.commit()?;

                if removed == 0 {
                    tracing::debug!("Event {} already deleted", event_id);
                }
                Ok(())
            })
            .await
    }
}
