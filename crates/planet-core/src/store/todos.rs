//! Todo persistence

use std::collections::HashMap;

use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use uuid::Uuid;

use super::{Database, opt_timestamp_col, timestamp_col, timestamp_text, uuid_col};
use crate::models::Todo;
use crate::{Error, Result};

pub(crate) const TODO_COLUMNS: &str =
    "id, calendar_event_id, content, is_done, due_time, created_at, updated_at";

pub(crate) fn todo_from_row(row: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: uuid_col(row, 0)?,
        calendar_event_id: uuid_col(row, 1)?,
        content: row.get(2)?,
        is_done: row.get(3)?,
        due_time: opt_timestamp_col(row, 4)?,
        created_at: timestamp_col(row, 5)?,
        updated_at: timestamp_col(row, 6)?,
    })
}

pub(crate) fn insert_todo(conn: &Connection, todo: &Todo) -> Result<()> {
    conn.execute(
        "INSERT INTO todos (id, calendar_event_id, content, is_done, due_time, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            todo.id.to_string(),
            todo.calendar_event_id.to_string(),
            todo.content,
            todo.is_done,
            todo.due_time.map(timestamp_text),
            timestamp_text(todo.created_at),
            timestamp_text(todo.updated_at),
        ],
    )?;
    Ok(())
}

/// Todos of one event in insertion order
pub(crate) fn load_event_todos(conn: &Connection, event_id: Uuid) -> Result<Vec<Todo>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM todos WHERE calendar_event_id = ?1 ORDER BY created_at, rowid",
        TODO_COLUMNS
    ))?;
    let todos = stmt
        .query_map(params![event_id.to_string()], todo_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(todos)
}

/// Todos of several events, grouped by parent id
pub(crate) fn load_todos_by_event(conn: &Connection, event_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Todo>>> {
    let mut grouped: HashMap<Uuid, Vec<Todo>> = HashMap::new();
    if event_ids.is_empty() {
        return Ok(grouped);
    }

    let placeholders = (1..=event_ids.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {} FROM todos WHERE calendar_event_id IN ({}) ORDER BY created_at, rowid",
        TODO_COLUMNS, placeholders
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(event_ids.iter().map(|id| id.to_string())), todo_from_row)?;
    for todo in rows {
        let todo = todo?;
        grouped.entry(todo.calendar_event_id).or_default().push(todo);
    }
    Ok(grouped)
}

/// Store for toggling todos under an ownership check
#[derive(Clone)]
pub struct TodoStore {
    db: Database,
}

impl TodoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Set `is_done` on a todo whose parent event belongs to `owner`
    ///
    /// A missing todo and a todo owned by someone else are reported the same
    /// way so the caller cannot test for existence.
    pub async fn set_done(&self, owner: Uuid, todo_id: Uuid, done: bool, now: DateTime<Utc>) -> Result<Todo> {
        self.db
            .call(move |conn| {
                let now = now.trunc_subsecs(6);
                let tx = conn.transaction()?;

                let found = tx
                    .query_row(
                        "SELECT t.id FROM todos t
                         JOIN calendar_events e ON e.id = t.calendar_event_id
                         WHERE t.id = ?1 AND e.user_id = ?2",
                        params![todo_id.to_string(), owner.to_string()],
                        |row| row.get::<_, String>(0),
                    )
                    .optional()?;
                if found.is_none() {
                    return Err(Error::not_found("unauthorized or todo not found"));
                }

                tx.execute(
                    "UPDATE todos SET is_done = ?1, updated_at = ?2 WHERE id = ?3",
                    params![done, timestamp_text(now), todo_id.to_string()],
                )?;

                let todo = tx.query_row(
                    &format!("SELECT {} FROM todos WHERE id = ?1", TODO_COLUMNS),
                    params![todo_id.to_string()],
                    todo_from_row,
                )?;

                tx.commit()?;
                Ok(todo)
            })
            .await
    }
}
