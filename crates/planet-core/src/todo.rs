//! Todo toggling with best-effort analytics

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::Result;
use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::models::Todo;
use crate::store::TodoStore;

pub const DEFAULT_ANALYTICS_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct TodoService {
    todos: TodoStore,
    analytics: Option<Arc<dyn AnalyticsSink>>,
    analytics_timeout: Duration,
}

impl TodoService {
    pub fn new(todos: TodoStore, analytics: Option<Arc<dyn AnalyticsSink>>) -> Self {
        Self {
            todos,
            analytics,
            analytics_timeout: DEFAULT_ANALYTICS_TIMEOUT,
        }
    }

    pub fn with_analytics_timeout(mut self, analytics_timeout: Duration) -> Self {
        self.analytics_timeout = analytics_timeout;
        self
    }

    /// Set the done flag of a todo owned by `caller`, then notify analytics
    ///
    /// Analytics failures and timeouts are logged and never fail the call.
    pub async fn set_done(&self, caller: Uuid, todo_id: Uuid, done: bool) -> Result<Todo> {
        let now = Utc::now();
        let todo = self.todos.set_done(caller, todo_id, done, now).await?;
        info!("Todo {} marked {} by {}", todo.id, if done { "done" } else { "not done" }, caller);

        if let Some(sink) = &self.analytics {
            let event = AnalyticsEvent::todo_toggled(caller, todo.id, done, now);
            match timeout(self.analytics_timeout, sink.publish_event(event)).await {
                Ok(Ok(())) => debug!("Analytics published for todo {}", todo.id),
                Ok(Err(e)) => warn!("Failed to publish analytics for todo {}: {}", todo.id, e),
                Err(_) => warn!(
                    "Analytics publish for todo {} timed out after {:?}",
                    todo.id, self.analytics_timeout
                ),
            }
        }

        Ok(todo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::{NewEvent, NewTodo, Visibility};
    use crate::store::{Database, EventStore};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<AnalyticsEvent>>,
    }

    #[async_trait]
    impl AnalyticsSink for RecordingSink {
        async fn publish_event(&self, event: AnalyticsEvent) -> Result<()> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    struct FailingSink;

    #[async_trait]
    impl AnalyticsSink for FailingSink {
        async fn publish_event(&self, _event: AnalyticsEvent) -> Result<()> {
            Err(Error::Internal("analytics down".to_string()))
        }
    }

    struct SlowSink;

    #[async_trait]
    impl AnalyticsSink for SlowSink {
        async fn publish_event(&self, _event: AnalyticsEvent) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    async fn seeded() -> (TodoStore, Uuid, Uuid) {
        let db = Database::in_memory().unwrap();
        let owner = Uuid::new_v4();
        let day = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let draft = NewEvent::new("Gym", day, day, Visibility::Public).with_todos(vec![NewTodo::new("stretch")]);
        let event = EventStore::new(db.clone()).create(owner, draft, Utc::now()).await.unwrap();
        (TodoStore::new(db), owner, event.todos()[0].id)
    }

    #[tokio::test]
    async fn test_toggle_publishes_analytics() {
        let (store, owner, todo_id) = seeded().await;
        let sink = Arc::new(RecordingSink::default());
        let service = TodoService::new(store, Some(sink.clone()));

        let todo = service.set_done(owner, todo_id, true).await.unwrap();
        assert!(todo.is_done);
        service.set_done(owner, todo_id, false).await.unwrap();

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "todo_completed");
        assert_eq!(events[0].user_id, owner);
        assert_eq!(events[0].properties["todo_id"], todo_id.to_string());
        assert_eq!(events[1].name, "todo_uncompleted");
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_fail_toggle() {
        let (store, owner, todo_id) = seeded().await;
        let service = TodoService::new(store, Some(Arc::new(FailingSink)));
        assert!(service.set_done(owner, todo_id, true).await.unwrap().is_done);
    }

    #[tokio::test]
    async fn test_slow_sink_is_cut_off() {
        let (store, owner, todo_id) = seeded().await;
        let service =
            TodoService::new(store, Some(Arc::new(SlowSink))).with_analytics_timeout(Duration::from_millis(50));

        let started = std::time::Instant::now();
        assert!(service.set_done(owner, todo_id, true).await.unwrap().is_done);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_no_sink_and_no_event_on_failure() {
        let (store, owner, todo_id) = seeded().await;
        let sink = Arc::new(RecordingSink::default());
        let service = TodoService::new(store.clone(), Some(sink.clone()));

        let err = service.set_done(Uuid::new_v4(), todo_id, true).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(sink.events.lock().unwrap().is_empty());

        let without = TodoService::new(store, None);
        assert!(without.set_done(owner, todo_id, true).await.is_ok());
    }
}
