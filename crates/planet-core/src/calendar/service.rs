//! Calendar service
//!
//! Month and day views for any owner, plus owner-only mutations. Every
//! successful mutation drops the affected month cache entries after commit.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::layout::{completion_by_day, day_window, month_layout, month_window, months_spanned};
use crate::cache::MonthCache;
use crate::models::{CalendarEvent, DayView, EventPatch, MonthView, NewEvent, Visibility};
use crate::store::{EventStore, ProfileStore};
use crate::validation::{Limits, drop_blank_new_todos, drop_blank_todo_inputs};
use crate::visibility::VisibilityResolver;
use crate::{Error, Result};

#[derive(Clone)]
pub struct CalendarService {
    events: EventStore,
    profiles: ProfileStore,
    resolver: VisibilityResolver,
    cache: Arc<MonthCache>,
    limits: Limits,
}

impl CalendarService {
    pub fn new(
        events: EventStore,
        profiles: ProfileStore,
        resolver: VisibilityResolver,
        cache: Arc<MonthCache>,
        limits: Limits,
    ) -> Self {
        Self {
            events,
            profiles,
            resolver,
            cache,
            limits,
        }
    }

    pub fn cache(&self) -> &Arc<MonthCache> {
        &self.cache
    }

    /// Month view of `owner`'s events as seen by `viewer`
    pub async fn get_month(&self, viewer: Option<Uuid>, owner: Uuid, year: i32, month: u32) -> Result<MonthView> {
        let (start, end) = month_window(year, month)?;
        let visibilities = self.resolver.resolve(viewer, owner).await?;

        let mut by_visibility: HashMap<Visibility, Vec<CalendarEvent>> = HashMap::new();
        let mut missing = Vec::new();
        for &visibility in &visibilities {
            match self.cache.get(owner, year, month, visibility) {
                Some(events) => {
                    by_visibility.insert(visibility, events);
                }
                None => missing.push(visibility),
            }
        }

        if !missing.is_empty() {
            debug!("Loading {:?} for {} {:04}-{:02} from store", missing, owner, year, month);
            let fetched = self.events.get_events_in_range(owner, &missing, start, end).await?;

            let mut fresh: HashMap<Visibility, Vec<CalendarEvent>> =
                missing.iter().map(|&v| (v, Vec::new())).collect();
            for event in fetched {
                fresh.entry(event.visibility).or_default().push(event);
            }
            for (visibility, events) in fresh {
                self.cache.put(owner, year, month, visibility, events.clone());
                by_visibility.insert(visibility, events);
            }
        }

        let mut events: Vec<CalendarEvent> = visibilities
            .iter()
            .filter_map(|v| by_visibility.remove(v))
            .flatten()
            .collect();
        events.sort_by(|a, b| a.start_at.cmp(&b.start_at).then(a.created_at.cmp(&b.created_at)));

        Ok(MonthView {
            events,
            month_data: month_layout(year, month)?,
        })
    }

    pub async fn get_month_by_nickname(
        &self,
        viewer: Option<Uuid>,
        nickname: &str,
        year: i32,
        month: u32,
    ) -> Result<MonthView> {
        let owner = self.profiles.user_id_by_nickname(nickname).await?;
        self.get_month(viewer, owner, year, month).await
    }

    /// Day view with todos; never served from the month cache
    pub async fn get_day(&self, viewer: Option<Uuid>, owner: Uuid, date: NaiveDate) -> Result<DayView> {
        let (start, end) = day_window(date)?;
        let visibilities = self.resolver.resolve(viewer, owner).await?;
        let daily_plans = self
            .events
            .get_events_with_todos_in_range(owner, &visibilities, start, end)
            .await?;
        let completion_data = completion_by_day(&daily_plans);

        Ok(DayView {
            daily_plans,
            completion_data,
        })
    }

    pub async fn get_day_by_nickname(&self, viewer: Option<Uuid>, nickname: &str, date: NaiveDate) -> Result<DayView> {
        let owner = self.profiles.user_id_by_nickname(nickname).await?;
        self.get_day(viewer, owner, date).await
    }

    /// Single event with todos, owner only
    pub async fn get_event(&self, caller: Uuid, event_id: Uuid) -> Result<CalendarEvent> {
        self.load_owned(caller, event_id).await
    }

    pub async fn create_event(&self, caller: Uuid, mut draft: NewEvent) -> Result<CalendarEvent> {
        draft.todos = drop_blank_new_todos(draft.todos);
        self.limits.check_new_event(&draft)?;

        let event = self.events.create(caller, draft, Utc::now()).await?;
        self.invalidate_span(caller, event.start_at, event.end_at);

        info!("Created event {} for {} on {}", event.id, caller, event.start_at);
        Ok(event)
    }

    /// Apply `patch` to an owned event; a present todo list replaces the stored one
    pub async fn update_event(&self, caller: Uuid, event_id: Uuid, patch: EventPatch) -> Result<CalendarEvent> {
        let mut event = self.load_owned(caller, event_id).await?;
        let (old_start, old_end) = (event.start_at, event.end_at);

        patch.apply_to(&mut event);
        self.limits.check_event(&event)?;

        let todos = patch.todos.map(drop_blank_todo_inputs);
        if let Some(todos) = &todos {
            self.limits.check_todo_inputs(todos)?;
        }

        let updated = self.events.update(event, todos, Utc::now()).await?;

        self.invalidate_span(caller, old_start, old_end);
        if (updated.start_at, updated.end_at) != (old_start, old_end) {
            self.invalidate_span(caller, updated.start_at, updated.end_at);
        }

        info!("Updated event {} for {}", updated.id, caller);
        Ok(updated)
    }

    pub async fn delete_event(&self, caller: Uuid, event_id: Uuid) -> Result<()> {
        let event = self.load_owned(caller, event_id).await?;
        self.events.delete(event.id).await?;
        self.invalidate_span(caller, event.start_at, event.end_at);

        info!("Deleted event {} for {}", event.id, caller);
        Ok(())
    }

    async fn load_owned(&self, caller: Uuid, event_id: Uuid) -> Result<CalendarEvent> {
        let event = self.events.get_event_with_todos(event_id).await?;
        if event.user_id != caller {
            return Err(Error::forbidden(format!("event {} is not owned by caller", event_id)));
        }
        Ok(event)
    }

    /// Drop cached months from the start month through the end month
    fn invalidate_span(&self, owner: Uuid, start: NaiveDate, end: NaiveDate) {
        for (year, month) in months_spanned(start, end) {
            self.cache.invalidate_month(owner, year, month);
        }
        debug!("Invalidated cache for {} from {}-{:02}", owner, start.year(), start.month());
    }
}
