//! planet-core: Planet user service core library
//!
//! Calendar events with attached todos, visibility resolution between
//! users, a short-lived month cache and analytics publishing.

pub mod analytics;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod error;
pub mod models;
pub mod profile;
pub mod store;
pub mod todo;
pub mod validation;
pub mod visibility;

pub use analytics::{AnalyticsEvent, AnalyticsSink, HttpAnalyticsSink};
pub use cache::{CacheStats, MonthCache};
pub use calendar::CalendarService;
pub use config::{AnalyticsConfig, AuthConfig, Config, DatabaseConfig, ServerConfig};
pub use error::{Error, ErrorKind, Result};
pub use models::{
    CalendarEvent, DayView, EventPatch, MonthView, NewEvent, NewProfile, NewTodo, Profile, Todo, TodoInput,
    Visibility,
};
pub use profile::ProfileService;
pub use store::{Database, EventStore, FollowStore, ProfileStore, TodoStore};
pub use todo::TodoService;
pub use validation::Limits;
pub use visibility::{FollowLookup, VisibilityResolver};
